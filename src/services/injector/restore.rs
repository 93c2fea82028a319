use super::clipboard::{ClipboardAccess, ClipboardSnapshot};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Отложенное восстановление буфера обмена.
///
/// Каждое восстановление выполняется ровно один раз, даже если подсистема
/// останавливается: `flush` только дожидается запланированных задач.
#[derive(Default)]
pub struct RestoreScheduler {
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl RestoreScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&self, clipboard: Arc<dyn ClipboardAccess>, snapshot: ClipboardSnapshot, delay: Duration) {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let restored = tokio::task::spawn_blocking(move || clipboard.restore(&snapshot)).await;
            match restored {
                Ok(Ok(())) => debug!("Буфер обмена восстановлен"),
                Ok(Err(e)) => warn!("Не удалось восстановить буфер обмена: {}", e),
                Err(e) => warn!("Задача восстановления буфера обмена прервана: {}", e),
            }
        });

        let mut pending = self.pending.lock();
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Сколько восстановлений ещё не завершено
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        let mut pending = self.pending.lock();
        pending.retain(|h| !h.is_finished());
        pending.len()
    }

    /// Дождаться всех запланированных восстановлений
    pub async fn flush(&self) {
        let handles: Vec<_> = std::mem::take(&mut *self.pending.lock());
        if handles.is_empty() {
            return;
        }

        debug!("Ожидание {} восстановлений буфера обмена", handles.len());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Задача восстановления буфера обмена завершилась с ошибкой: {}", e);
            }
        }
    }
}
