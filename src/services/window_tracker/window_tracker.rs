use crate::config::WindowConfig;
use crate::error::{ExpanderError, Result};
use crate::events::{WindowEvent, WindowInfo};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::WindowBackend;

/// Фоновый опрос активного окна.
///
/// Последнее известное окно публикуется как неизменяемый `Arc<WindowInfo>`
/// через `watch`-канал: единственный писатель (задача опроса) подменяет
/// значение целиком, читатели берут согласованную копию без ожидания опроса.
pub struct WindowTracker {
    backend: Arc<dyn WindowBackend>,
    interval: Duration,
    ignore_patterns: Arc<[String]>,
    snapshot: watch::Sender<Option<Arc<WindowInfo>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WindowTracker {
    pub fn new(backend: Arc<dyn WindowBackend>, config: &WindowConfig) -> Self {
        info!(
            "Инициализация WindowTracker (backend: {}, интервал {} мс)",
            backend.name(),
            config.polling_interval_ms
        );

        let (snapshot, _) = watch::channel(None);
        Self {
            backend,
            interval: Duration::from_millis(config.polling_interval_ms.max(1)),
            ignore_patterns: config.ignore_patterns.clone().into(),
            snapshot,
            task: Mutex::new(None),
        }
    }

    /// Последнее известное окно; не ждёт следующего опроса
    pub fn last_known(&self) -> Option<Arc<WindowInfo>> {
        self.snapshot.borrow().clone()
    }

    /// Подписка на смену окна
    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<WindowInfo>>> {
        self.snapshot.subscribe()
    }

    /// Прямой запрос окна с фокусом, минуя кэш
    #[cfg(test)]
    pub async fn current_window(&self) -> Result<WindowInfo> {
        let backend = self.backend.clone();
        tokio::task::spawn_blocking(move || backend.active_window())
            .await
            .map_err(|e| ExpanderError::Internal(format!("задача запроса окна прервана: {}", e)))?
    }

    pub async fn activate(&self, window: &WindowInfo) -> Result<()> {
        let backend = self.backend.clone();
        let window = window.clone();
        tokio::task::spawn_blocking(move || backend.activate(&window))
            .await
            .map_err(|e| ExpanderError::Internal(format!("задача активации окна прервана: {}", e)))?
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Запустить опрос. Повторный вызов ничего не делает.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            debug!("WindowTracker уже запущен");
            return;
        }

        let poller = Poller {
            backend: self.backend.clone(),
            ignore_patterns: self.ignore_patterns.clone(),
            snapshot: self.snapshot.clone(),
            failing: false,
        };
        *task = Some(tokio::spawn(poller.run(self.interval)));
        info!("WindowTracker запущен");
    }

    /// Остановить опрос; последнее известное окно сохраняется
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            info!("WindowTracker остановлен");
        }
    }
}

impl Drop for WindowTracker {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

struct Poller {
    backend: Arc<dyn WindowBackend>,
    ignore_patterns: Arc<[String]>,
    snapshot: watch::Sender<Option<Arc<WindowInfo>>>,
    failing: bool,
}

impl Poller {
    async fn run(mut self, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let backend = self.backend.clone();
            let sample = match tokio::task::spawn_blocking(move || backend.active_window()).await {
                Ok(result) => result,
                Err(e) => Err(ExpanderError::Internal(format!("задача опроса прервана: {}", e))),
            };
            if let Some(event) = self.apply(sample) {
                info!("{}", event);
            }
        }
    }

    /// Один шаг опроса. Ошибка не прерывает цикл и не затирает прежнее значение.
    fn apply(&mut self, sample: Result<WindowInfo>) -> Option<WindowEvent> {
        let window = match sample {
            Ok(window) => window,
            Err(e) => {
                if !self.failing {
                    warn!("Не удалось определить активное окно: {}. Используем последнее известное", e);
                    self.failing = true;
                } else {
                    debug!("Определение окна по-прежнему не работает: {}", e);
                }
                return None;
            }
        };

        if self.failing {
            info!("Определение активного окна восстановлено");
            self.failing = false;
        }

        if window.matches_any_pattern(&self.ignore_patterns) {
            debug!("Окно {} в списке игнорируемых, фокус не обновляем", window);
            return None;
        }

        let previous = self.snapshot.borrow().clone();
        if previous.as_deref().is_some_and(|p| p.same_window(&window)) {
            return None;
        }

        let window = Arc::new(window);
        let event = WindowEvent::focus_changed(window.clone(), previous);
        self.snapshot.send_replace(Some(window));
        Some(event)
    }
}
