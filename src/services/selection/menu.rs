use super::{CancelReason, Notice, SelectionSession, SelectionUi};
use crate::error::Result;
use crate::services::expansion_store::Expansion;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info, warn};
use zbus::zvariant::Value;
use zbus::Connection;

const PREVIEW_CHARS: usize = 60;

/// Выбор через внешнее dmenu-совместимое меню (rofi -dmenu, wofi --dmenu, dmenu).
///
/// Варианты передаются в stdin по одному на строку, выбранная строка читается
/// из stdout. Ненулевой код выхода означает отмену (Escape). Если результат
/// перестал быть нужен (таймаут, остановка), процесс меню завершается.
pub struct MenuSelector {
    command: Arc<[String]>,
    notify: bool,
}

impl MenuSelector {
    pub fn new(command: Vec<String>, notify: bool) -> Self {
        info!("Меню выбора: {}", command.join(" "));
        Self {
            command: command.into(),
            notify,
        }
    }
}

#[async_trait::async_trait]
impl SelectionUi for MenuSelector {
    fn present(&self, session: SelectionSession) {
        tokio::spawn(run_menu(self.command.clone(), session));
    }

    async fn notify(&self, notice: Notice) {
        info!("{}", notice);
        if !self.notify {
            return;
        }

        if let Err(e) = send_desktop_notification(notice.summary(), notice.body()).await {
            warn!("Не удалось показать уведомление через D-Bus: {}", e);
        }
    }
}

fn menu_label(expansion: &Expansion) -> String {
    let preview = expansion.preview(PREVIEW_CHARS);
    if expansion.description.is_empty() {
        format!("{}: {}", expansion.trigger, preview)
    } else {
        format!("{}: {} ({})", expansion.trigger, preview, expansion.description)
    }
}

/// Индекс выбранного варианта по строке из меню.
/// Допускается и вариант, где пользователь ввёл само сокращение.
fn resolve_choice(labels: &[String], candidates: &[Expansion], line: &str) -> Option<usize> {
    let line = line.trim_end_matches(['\n', '\r']);
    labels
        .iter()
        .position(|label| label == line)
        .or_else(|| candidates.iter().position(|e| e.trigger == line.trim()))
}

async fn run_menu(command: Arc<[String]>, mut session: SelectionSession) {
    let Some((program, args)) = command.split_first() else {
        error!("Команда меню выбора пуста");
        session.cancel(CancelReason::Dismissed);
        return;
    };

    let candidates = session.candidates();
    let labels: Vec<String> = candidates.iter().map(menu_label).collect();

    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            error!("Не удалось запустить меню выбора {}: {}", program, e);
            session.cancel(CancelReason::Dismissed);
            return;
        }
    };

    // Меню может не читать stdin; запись не должна держать задачу после отказа от результата
    if let Some(mut stdin) = child.stdin.take() {
        let input = labels.join("\n");
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                debug!("Меню закрыло stdin раньше времени: {}", e);
            }
        });
    }

    let output = tokio::select! {
        output = child.wait_with_output() => Some(output),
        _ = session.closed() => None,
    };

    let Some(output) = output else {
        debug!("Выбор больше не ожидается, меню закрыто");
        return;
    };

    match output {
        Err(e) => {
            warn!("Ошибка ожидания меню выбора: {}", e);
            session.cancel(CancelReason::Dismissed);
        }
        Ok(output) if !output.status.success() => {
            debug!("Меню завершилось с кодом {}", output.status);
            session.cancel(CancelReason::Escape);
        }
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let line = stdout.lines().next().unwrap_or_default();
            match resolve_choice(&labels, &candidates, line) {
                Some(index) => {
                    session.choose(index);
                }
                None => choose_by_typed_filter(session, line),
            }
        }
    }
}

/// Введённый в меню текст работает как фильтр: выбор, если остался один вариант
fn choose_by_typed_filter(mut session: SelectionSession, typed: &str) {
    if typed.is_empty() {
        session.cancel(CancelReason::Dismissed);
        return;
    }

    let visible = session.set_filter(typed);
    if visible.len() == 1 {
        session.choose(0);
    } else {
        debug!("Строка {:?} оставляет {} вариантов, выбор не сделан", typed, visible.len());
        session.cancel(CancelReason::Dismissed);
    }
}

/// org.freedesktop.Notifications.Notify (susssasa{sv}i)
async fn send_desktop_notification(summary: &str, body: &str) -> Result<()> {
    let connection = Connection::session().await?;
    let actions: Vec<&str> = Vec::new();
    let hints: HashMap<&str, Value<'_>> = HashMap::new();

    connection
        .call_method(
            Some("org.freedesktop.Notifications"),
            "/org/freedesktop/Notifications",
            Some("org.freedesktop.Notifications"),
            "Notify",
            &(
                env!("CARGO_PKG_NAME"),
                0u32,
                "dialog-information",
                summary,
                body,
                actions,
                hints,
                5000i32,
            ),
        )
        .await?;
    Ok(())
}
