use crate::error::{ExpanderError, Result};
use crate::events::TriggerEvent;
use crate::services::injector::Injector;
use crate::services::selection::{Notice, SelectionArbiter, SelectionOutcome};
use crate::services::trigger_detector::TriggerDetector;
use crate::services::window_tracker::WindowTracker;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Состояние цикла "триггер -> выбор -> вставка"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CycleState {
    Idle = 0,
    Triggered = 1,
    Selecting = 2,
    Injecting = 3,
}

impl CycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => CycleState::Triggered,
            2 => CycleState::Selecting,
            3 => CycleState::Injecting,
            _ => CycleState::Idle,
        }
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Связывает TriggerDetector, SelectionArbiter и Injector.
///
/// Срабатывания принимаются только в `Idle`; пока цикл идёт, новые
/// срабатывания отбрасываются без очереди. Сам цикл выполняется в отдельной
/// задаче, поток ввода только кладёт событие в канал.
pub struct Coordinator {
    inner: Arc<Inner>,
    trigger_rx: Mutex<Option<mpsc::UnboundedReceiver<TriggerEvent>>>,
    loop_task: Mutex<Option<JoinHandle<mpsc::UnboundedReceiver<TriggerEvent>>>>,
}

struct Inner {
    detector: TriggerDetector,
    tracker: Arc<WindowTracker>,
    arbiter: SelectionArbiter,
    injector: Injector,
    state: AtomicU8,
    cycle: Mutex<Option<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
    cycles: AtomicUsize,
}

/// Возврат в `Idle` на любом выходе из цикла, включая отмену задачи
struct IdleGuard<'a>(&'a AtomicU8);

impl Drop for IdleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(CycleState::Idle as u8, Ordering::Release);
    }
}

impl Coordinator {
    pub fn new(
        detector: TriggerDetector,
        trigger_rx: mpsc::UnboundedReceiver<TriggerEvent>,
        tracker: Arc<WindowTracker>,
        arbiter: SelectionArbiter,
        injector: Injector,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                detector,
                tracker,
                arbiter,
                injector,
                state: AtomicU8::new(CycleState::Idle as u8),
                cycle: Mutex::new(None),
                shutdown,
                cycles: AtomicUsize::new(0),
            }),
            trigger_rx: Mutex::new(Some(trigger_rx)),
            loop_task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> CycleState {
        CycleState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.loop_task.lock().is_some()
    }

    /// Сколько циклов дошло до выбора с момента создания
    #[cfg(test)]
    pub fn cycles(&self) -> usize {
        self.inner.cycles.load(Ordering::Acquire)
    }

    /// Новая комбинация без перезапуска перехвата.
    /// При ошибке разбора остаётся прежняя.
    pub fn set_trigger(&self, raw: &str) -> Result<()> {
        self.inner.detector.configure_str(raw)
    }

    /// Запустить WindowTracker, TriggerDetector и цикл обработки.
    /// `HookUnavailable` оставляет подсистему остановленной.
    pub fn start(&self) -> Result<()> {
        let mut loop_task = self.loop_task.lock();
        if loop_task.is_some() {
            debug!("Coordinator уже запущен");
            return Ok(());
        }

        let Some(mut trigger_rx) = self.trigger_rx.lock().take() else {
            return Err(ExpanderError::Internal("канал срабатываний недоступен".to_string()));
        };
        // Срабатывания, оставшиеся от прошлого запуска
        while trigger_rx.try_recv().is_ok() {}

        self.inner.shutdown.send_replace(false);
        self.inner.tracker.start();

        if let Err(e) = self.inner.detector.start() {
            error!("Не удалось запустить TriggerDetector: {}", e);
            self.inner.tracker.stop();
            *self.trigger_rx.lock() = Some(trigger_rx);
            return Err(e);
        }

        let shutdown = self.inner.shutdown.subscribe();
        *loop_task = Some(tokio::spawn(run_loop(self.inner.clone(), trigger_rx, shutdown)));

        info!("Coordinator запущен, комбинация: {}", self.inner.detector.spec());
        Ok(())
    }

    /// Остановить подсистему.
    ///
    /// Цикл на этапе выбора отменяется (буфер обмена не тронут), цикл на этапе
    /// вставки дожидается завершения, затем дожидаются запланированные
    /// восстановления буфера обмена. Повторный вызов ничего не делает.
    pub async fn stop(&self) {
        let loop_task = self.loop_task.lock().take();
        let Some(loop_task) = loop_task else {
            return;
        };

        info!("Остановка Coordinator (состояние: {})", self.state());
        self.inner.detector.stop();
        self.inner.shutdown.send_replace(true);

        match loop_task.await {
            Ok(trigger_rx) => *self.trigger_rx.lock() = Some(trigger_rx),
            Err(e) => error!("Цикл обработки срабатываний завершился с ошибкой: {}", e),
        }

        let cycle = self.inner.cycle.lock().take();
        if let Some(cycle) = cycle {
            if let Err(e) = cycle.await {
                warn!("Текущий цикл завершился с ошибкой: {}", e);
            }
        }

        self.inner.tracker.stop();
        self.inner.injector.flush().await;
        info!("Coordinator остановлен");
    }
}

async fn run_loop(
    inner: Arc<Inner>,
    mut trigger_rx: mpsc::UnboundedReceiver<TriggerEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> mpsc::UnboundedReceiver<TriggerEvent> {
    loop {
        tokio::select! {
            event = trigger_rx.recv() => match event {
                Some(event) => inner.clone().accept(event),
                None => break,
            },
            _ = wait_shutdown(&mut shutdown) => break,
        }
    }
    trigger_rx
}

async fn wait_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

impl Inner {
    fn set_state(&self, state: CycleState) {
        debug!("Цикл: {}", state);
        self.state.store(state as u8, Ordering::Release);
    }

    fn accept(self: Arc<Self>, event: TriggerEvent) {
        let idle = CycleState::Idle as u8;
        let triggered = CycleState::Triggered as u8;
        if let Err(current) = self
            .state
            .compare_exchange(idle, triggered, Ordering::AcqRel, Ordering::Acquire)
        {
            debug!(
                "Срабатывание отброшено: цикл в состоянии {}",
                CycleState::from_u8(current)
            );
            return;
        }

        debug!(
            "Срабатывание принято ({} мс в очереди)",
            event.timestamp.elapsed().as_millis()
        );
        let inner = self.clone();
        *self.cycle.lock() = Some(tokio::spawn(async move { inner.run_cycle().await }));
    }

    async fn run_cycle(&self) {
        let _idle = IdleGuard(&self.state);
        self.cycles.fetch_add(1, Ordering::AcqRel);
        self.set_state(CycleState::Selecting);

        let mut shutdown = self.shutdown.subscribe();
        let outcome = tokio::select! {
            outcome = self.arbiter.on_trigger() => outcome,
            _ = wait_shutdown(&mut shutdown) => {
                info!("Выбор отменён из-за остановки");
                return;
            }
        };

        match outcome {
            SelectionOutcome::Chosen { expansion, focus } => {
                self.set_state(CycleState::Injecting);
                if let Err(e) = self.injector.inject(&expansion.body, &focus).await {
                    warn!("Сокращение {:?} не вставлено: {}", expansion.trigger, e);
                }
            }
            SelectionOutcome::NoCandidates => {
                info!("Нет доступных сокращений");
                self.arbiter.ui().notify(Notice::NoExpansions).await;
            }
            SelectionOutcome::Blocked(focus) => debug!("Срабатывание в заблокированном окне {}", focus),
            SelectionOutcome::Cancelled(reason) => debug!("Цикл завершён без вставки: {}", reason),
            SelectionOutcome::Busy => debug!("Выбор уже идёт"),
        }
    }
}
