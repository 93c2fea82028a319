use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::signal::unix::{signal as unix_signal, SignalKind};
use tracing::{error, info, warn};
mod config;
mod error;
mod events;
pub mod mappings;
mod services;
#[cfg(test)]
mod testing;
mod utils;

use config::Config;
use services::{
    create_clipboard, create_input_hook, create_paste_simulator, create_selection_ui,
    create_window_backend, ConfigExpansionStore, Coordinator, Injector, SelectionArbiter,
    TriggerDetector, TriggerSpec, WindowTracker,
};

#[derive(Parser, Debug)]
#[command(name = "chord-expander")]
#[command(about = "Раскрытие текстовых сокращений по удерживаемой комбинации клавиш")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "expander.toml")]
    config: String,

    /// Режим сухого запуска (без реальных действий)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (перекрывает [logging].level)
    #[arg(long)]
    log_level: Option<String>,

    /// Комбинация-триггер, например "ctrl+alt+e" (перекрывает [trigger].chord)
    #[arg(short, long)]
    trigger: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(trigger) = &args.trigger {
        config.trigger.chord = trigger.clone();
        config.validate()?;
    }

    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(level, &config.logging.format)?;

    info!("Запуск chord-expander v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - реальные действия отключены");
    } else {
        utils::permissions::check_permissions(config.injection.paste_backend == "uinput")?;
    }

    // Сборка подсистемы
    let hook = create_input_hook(&config, args.dry_run)?;
    let spec = TriggerSpec::parse(&config.trigger.chord)?;
    let (detector, trigger_rx) = TriggerDetector::new(hook, spec);

    let backend = create_window_backend(&config.window, args.dry_run);
    let tracker = Arc::new(WindowTracker::new(backend, &config.window));

    let store = Arc::new(ConfigExpansionStore::new(config.expansions.clone()));
    let arbiter = SelectionArbiter::new(
        tracker.clone(),
        store.clone(),
        create_selection_ui(&config.selection, args.dry_run),
        &config.selection,
        config.window.blocked_patterns.clone(),
    );

    let injector = Injector::new(
        create_clipboard(args.dry_run),
        create_paste_simulator(&config.injection, args.dry_run)?,
        tracker.clone(),
        &config.injection,
    );

    let coordinator = Coordinator::new(detector, trigger_rx, tracker, arbiter, injector);
    coordinator.start().context("Не удалось запустить перехват клавиатуры")?;

    info!(
        "Все компоненты запущены, сокращений в каталоге: {}",
        config.expansions.len()
    );

    let mut hangup = unix_signal(SignalKind::hangup())?;
    loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
                    Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
                }
                break;
            }
            _ = hangup.recv() => {
                info!("Получен SIGHUP, перечитываем конфигурацию");
                reload(&args, &coordinator, &store);
            }
        }
    }

    info!("Завершение работы...");

    let shutdown_timeout = tokio::time::Duration::from_secs(5);
    match tokio::time::timeout(shutdown_timeout, coordinator.stop()).await {
        Ok(()) => info!("Все сервисы завершили работу корректно"),
        Err(_) => warn!("Таймаут при завершении сервисов"),
    }

    info!("chord-expander завершил работу");
    Ok(())
}

/// Перечитать каталог и комбинацию; при ошибке остаётся прежняя конфигурация
fn reload(args: &Args, coordinator: &Coordinator, store: &ConfigExpansionStore) {
    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Конфигурация не перечитана: {:#}", e);
            return;
        }
    };

    let chord = args.trigger.as_deref().unwrap_or(&config.trigger.chord);
    if let Err(e) = coordinator.set_trigger(chord) {
        error!("Комбинация {:?} не применена: {}", chord, e);
    }

    store.replace(config.expansions.clone());
    info!("Каталог обновлён: {} сокращений", config.expansions.len());
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    let registry = tracing_subscriber::registry().with(filter);
    if format == "pretty" {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().compact()).init();
    }

    Ok(())
}
