use super::clipboard::ClipboardAccess;
use super::paste::PasteSimulator;
use super::restore::RestoreScheduler;
use crate::config::InjectionConfig;
use crate::error::{ExpanderError, Result};
use crate::events::FocusSnapshot;
use crate::services::window_tracker::WindowTracker;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const LOG_PREVIEW_CHARS: usize = 32;

/// Вставка текста через буфер обмена в окно из снимка фокуса.
///
/// Порядок: снимок буфера, запись текста, возврат фокуса, пауза,
/// сочетание вставки, отложенное восстановление буфера. Восстановление
/// планируется на любом пути после записи, в том числе при ошибке вставки.
pub struct Injector {
    clipboard: Arc<dyn ClipboardAccess>,
    paste: Arc<dyn PasteSimulator>,
    tracker: Arc<WindowTracker>,
    settle_delay: Duration,
    restore_delay: Duration,
    restores: RestoreScheduler,
}

impl Injector {
    pub fn new(
        clipboard: Arc<dyn ClipboardAccess>,
        paste: Arc<dyn PasteSimulator>,
        tracker: Arc<WindowTracker>,
        config: &InjectionConfig,
    ) -> Self {
        info!("Инициализация Injector (вставка: {})", paste.name());
        Self {
            clipboard,
            paste,
            tracker,
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            restore_delay: Duration::from_millis(config.restore_delay_ms),
            restores: RestoreScheduler::new(),
        }
    }

    pub async fn inject(&self, text: &str, target: &FocusSnapshot) -> Result<()> {
        debug!("Вставка {:?} в {}", preview(text), target);

        let snapshot = {
            let clipboard = self.clipboard.clone();
            match blocking(move || clipboard.snapshot()).await {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!("Не удалось сохранить буфер обмена, восстановления не будет: {}", e);
                    None
                }
            }
        };

        let written = {
            let clipboard = self.clipboard.clone();
            let text = text.to_string();
            blocking(move || clipboard.write_text(&text)).await
        };
        if let Err(e) = written {
            // Вставка сейчас вставила бы чужое содержимое буфера
            warn!("Не удалось записать текст в буфер обмена, вставка пропущена: {}", e);
            return Err(match e {
                ExpanderError::ClipboardAccessFailed(_) => e,
                other => ExpanderError::ClipboardAccessFailed(other.to_string()),
            });
        }

        self.focus_target(target).await;
        tokio::time::sleep(self.settle_delay).await;

        let pasted = {
            let paste = self.paste.clone();
            blocking(move || paste.simulate_paste()).await
        };

        if let Some(snapshot) = snapshot {
            self.restores.schedule(self.clipboard.clone(), snapshot, self.restore_delay);
        }

        match pasted {
            Ok(()) => {
                info!("Текст вставлен ({} символов)", text.chars().count());
                Ok(())
            }
            Err(e) => {
                warn!("Не удалось выполнить вставку: {}", e);
                Err(match e {
                    ExpanderError::InjectionFailed(_) => e,
                    other => ExpanderError::InjectionFailed(other.to_string()),
                })
            }
        }
    }

    /// Дождаться запланированных восстановлений буфера обмена
    pub async fn flush(&self) {
        self.restores.flush().await;
    }

    #[cfg(test)]
    pub fn pending_restores(&self) -> usize {
        self.restores.pending()
    }

    async fn focus_target(&self, target: &FocusSnapshot) {
        let Some(window) = target.window() else {
            warn!("Окно до срабатывания неизвестно, вставляем в текущее окно с фокусом");
            return;
        };

        if let Err(e) = self.tracker.activate(window).await {
            warn!(
                "Не удалось вернуть фокус окну {} ({}), вставляем в текущее окно с фокусом",
                window, e
            );
        }
    }
}

async fn blocking<T, F>(op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| ExpanderError::Internal(format!("блокирующая задача прервана: {}", e)))?
}

fn preview(text: &str) -> String {
    let cut: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
    if cut.len() < text.len() {
        format!("{}...", cut)
    } else {
        cut
    }
}
