use crate::debug_if_enabled;
use crate::error::{ExpanderError, Result};
use crate::events::{KeyEvent, TriggerEvent};
use crate::services::input_hook::{InputHook, KeyHandler, Subscription};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{ChordTracker, TriggerSpec};

/// Watches the global key stream and emits one [`TriggerEvent`] per
/// transition into "every chord key held".
///
/// The handler runs on the hook's input-delivery thread: it only touches the
/// in-memory tracker and pushes into an unbounded channel, so its cost is
/// proportional to the chord size.
pub struct TriggerDetector {
    hook: Arc<dyn InputHook>,
    tracker: Arc<Mutex<ChordTracker>>,
    subscription: Mutex<Option<Subscription>>,
    events_tx: mpsc::UnboundedSender<TriggerEvent>,
}

impl TriggerDetector {
    pub fn new(
        hook: Arc<dyn InputHook>,
        spec: TriggerSpec,
    ) -> (Self, mpsc::UnboundedReceiver<TriggerEvent>) {
        info!("Инициализация TriggerDetector для комбинации {}", spec);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let detector = Self {
            hook,
            tracker: Arc::new(Mutex::new(ChordTracker::new(spec))),
            subscription: Mutex::new(None),
            events_tx,
        };
        (detector, events_rx)
    }

    /// Разобрать и применить новую комбинацию; при ошибке остаётся прежняя
    pub fn configure_str(&self, raw: &str) -> Result<()> {
        let spec = TriggerSpec::parse(raw)?;
        self.configure(spec);
        Ok(())
    }

    /// Атомарная замена комбинации со сбросом состояния клавиш
    pub fn configure(&self, spec: TriggerSpec) {
        let mut tracker = self.tracker.lock();
        if *tracker.spec() != spec {
            info!("Комбинация-триггер изменена: {} -> {}", tracker.spec(), spec);
        }
        tracker.reconfigure(spec);
    }

    pub fn spec(&self) -> TriggerSpec {
        self.tracker.lock().spec().clone()
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Подписаться на глобальный поток клавиш. Повторный вызов ничего не делает.
    pub fn start(&self) -> Result<()> {
        let mut subscription = self.subscription.lock();
        if subscription.is_some() {
            debug!("TriggerDetector уже запущен");
            return Ok(());
        }

        self.tracker.lock().reset();
        let handle = self
            .hook
            .subscribe(self.handler())
            .map_err(ExpanderError::into_hook_unavailable)?;
        *subscription = Some(handle);

        info!("TriggerDetector запущен");
        Ok(())
    }

    /// Отписаться и забыть состояние клавиш. Повторный вызов ничего не делает.
    pub fn stop(&self) {
        let previous = self.subscription.lock().take();
        if previous.is_none() {
            return;
        }
        drop(previous);
        self.tracker.lock().reset();
        info!("TriggerDetector остановлен");
    }

    fn handler(&self) -> KeyHandler {
        let tracker = self.tracker.clone();
        let events_tx = self.events_tx.clone();

        Arc::new(move |event: &KeyEvent| {
            let Some(key) = event.key_name() else {
                return;
            };

            let fired = tracker.lock().process(event.key_code.value(), key, event.state);
            if fired {
                debug_if_enabled!("Комбинация нажата ({})", event.device_name);
                if events_tx.send(TriggerEvent::new()).is_err() {
                    debug_if_enabled!("Получатель TriggerEvent закрыт, событие отброшено");
                }
            }
        })
    }
}
