use super::{CancelReason, SelectionResult, SelectionSession, SelectionUi};
use crate::config::SelectionConfig;
use crate::events::FocusSnapshot;
use crate::services::expansion_store::{Expansion, ExpansionStore};
use crate::services::window_tracker::WindowTracker;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Итог одного срабатывания триггера
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    Chosen {
        expansion: Expansion,
        focus: FocusSnapshot,
    },
    Cancelled(CancelReason),
    /// Каталог пуст: меню не показывается, вызывающая сторона сообщает пользователю
    NoCandidates,
    /// Окно с фокусом в списке `blocked_patterns`
    Blocked(FocusSnapshot),
    /// Предыдущий выбор ещё не завершён
    Busy,
}

/// Снимок фокуса, запрос каталога и ожидание решения пользователя.
/// Одновременно активен не более одного выбора.
pub struct SelectionArbiter {
    tracker: Arc<WindowTracker>,
    store: Arc<dyn ExpansionStore>,
    ui: Arc<dyn SelectionUi>,
    timeout: Duration,
    blocked_patterns: Vec<String>,
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SelectionArbiter {
    pub fn new(
        tracker: Arc<WindowTracker>,
        store: Arc<dyn ExpansionStore>,
        ui: Arc<dyn SelectionUi>,
        config: &SelectionConfig,
        blocked_patterns: Vec<String>,
    ) -> Self {
        Self {
            tracker,
            store,
            ui,
            timeout: Duration::from_millis(config.timeout_ms),
            blocked_patterns,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn ui(&self) -> &Arc<dyn SelectionUi> {
        &self.ui
    }

    #[cfg(test)]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Обработать срабатывание триггера.
    ///
    /// Если future уничтожена до завершения (остановка), меню закрывается:
    /// UI видит, что результат больше не ждут.
    pub async fn on_trigger(&self) -> SelectionOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!("Выбор уже идёт, срабатывание пропущено");
            return SelectionOutcome::Busy;
        };

        let focus = FocusSnapshot::new(self.tracker.last_known());
        debug!("Снимок фокуса: {}", focus);

        if let Some(window) = focus.window() {
            if window.matches_any_pattern(&self.blocked_patterns) {
                info!("Окно {} заблокировано для раскрытия сокращений", window);
                return SelectionOutcome::Blocked(focus);
            }
        }

        let catalog = match self.store.list_expansions() {
            Ok(catalog) => catalog,
            Err(e) => {
                error!("Не удалось получить каталог сокращений: {}", e);
                return SelectionOutcome::Cancelled(CancelReason::StoreUnavailable);
            }
        };

        let (session, reply) = SelectionSession::new(&catalog);
        if session.is_empty() {
            return SelectionOutcome::NoCandidates;
        }

        debug!("Показываем выбор из {} вариантов", session.candidates().len());
        self.ui.present(session);

        match tokio::time::timeout(self.timeout, reply).await {
            Ok(Ok(SelectionResult::Chosen(expansion))) => {
                info!("Выбрано сокращение {:?}", expansion.trigger);
                SelectionOutcome::Chosen { expansion, focus }
            }
            Ok(Ok(SelectionResult::Cancelled(reason))) => {
                debug!("Выбор отменён: {}", reason);
                SelectionOutcome::Cancelled(reason)
            }
            Ok(Err(_)) => SelectionOutcome::Cancelled(CancelReason::Dismissed),
            Err(_) => {
                info!("Выбор не сделан за {:?}, отказываемся", self.timeout);
                SelectionOutcome::Cancelled(CancelReason::Timeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowConfig;
    use crate::events::WindowInfo;
    use crate::services::expansion_store::ConfigExpansionStore;
    use crate::testing::{FakeWindowBackend, ScriptedSelector, SelectorScript};

    struct Fixture {
        arbiter: Arc<SelectionArbiter>,
        selector: Arc<ScriptedSelector>,
    }

    async fn fixture(catalog: Vec<Expansion>, timeout_ms: u64, blocked: &[&str]) -> Fixture {
        let backend = Arc::new(FakeWindowBackend::showing("fake", WindowInfo::new("Editor".to_string())));
        let tracker = Arc::new(WindowTracker::new(
            backend,
            &WindowConfig {
                polling_interval_ms: 5,
                ..WindowConfig::default()
            },
        ));
        let mut rx = tracker.subscribe();
        tracker.start();
        rx.changed().await.unwrap();

        let selector = Arc::new(ScriptedSelector::new());
        let config = SelectionConfig {
            timeout_ms,
            ..SelectionConfig::default()
        };
        let arbiter = Arc::new(SelectionArbiter::new(
            tracker,
            Arc::new(ConfigExpansionStore::new(catalog)),
            selector.clone(),
            &config,
            blocked.iter().map(|s| s.to_string()).collect(),
        ));
        Fixture { arbiter, selector }
    }

    fn catalog() -> Vec<Expansion> {
        vec![
            Expansion::new("omg", "Oh my gosh!"),
            Expansion::new("brb", "Be right back"),
        ]
    }

    #[tokio::test]
    async fn test_chosen_carries_focus_snapshot() {
        let f = fixture(catalog(), 1000, &[]).await;
        f.selector.push(SelectorScript::Choose {
            filter: Some("br".to_string()),
            index: 0,
        });

        match f.arbiter.on_trigger().await {
            SelectionOutcome::Chosen { expansion, focus } => {
                assert_eq!(expansion.trigger, "brb");
                assert_eq!(focus.window().unwrap().title, "Editor");
            }
            other => panic!("ожидался выбор, получено {:?}", other),
        }
        assert_eq!(f.selector.presented(), vec![2]);
        assert_eq!(f.selector.filtered(), vec![1]);
        assert!(!f.arbiter.is_in_flight());
    }

    #[tokio::test]
    async fn test_empty_catalog_short_circuits() {
        let f = fixture(Vec::new(), 1000, &[]).await;
        assert_eq!(f.arbiter.on_trigger().await, SelectionOutcome::NoCandidates);
        assert!(f.selector.presented().is_empty());
    }

    #[tokio::test]
    async fn test_all_disabled_is_no_candidates() {
        let mut catalog = catalog();
        for e in &mut catalog {
            e.enabled = false;
        }
        let f = fixture(catalog, 1000, &[]).await;
        assert_eq!(f.arbiter.on_trigger().await, SelectionOutcome::NoCandidates);
    }

    #[tokio::test]
    async fn test_cancel_and_timeout() {
        let f = fixture(catalog(), 50, &[]).await;

        f.selector.push(SelectorScript::Cancel);
        assert_eq!(
            f.arbiter.on_trigger().await,
            SelectionOutcome::Cancelled(CancelReason::Escape)
        );

        f.selector.push(SelectorScript::Hold);
        assert_eq!(
            f.arbiter.on_trigger().await,
            SelectionOutcome::Cancelled(CancelReason::Timeout)
        );
    }

    #[tokio::test]
    async fn test_second_trigger_while_in_flight_is_busy() {
        let f = fixture(catalog(), 1000, &[]).await;
        f.selector.push(SelectorScript::ChooseAfter {
            delay: Duration::from_millis(100),
            index: 0,
        });

        let arbiter = f.arbiter.clone();
        let first = tokio::spawn(async move { arbiter.on_trigger().await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(f.arbiter.on_trigger().await, SelectionOutcome::Busy);
        assert!(matches!(first.await.unwrap(), SelectionOutcome::Chosen { .. }));
        assert_eq!(f.selector.presented().len(), 1);
    }

    #[tokio::test]
    async fn test_blocked_window_refused_before_ui() {
        let f = fixture(catalog(), 1000, &["editor"]).await;
        assert!(matches!(f.arbiter.on_trigger().await, SelectionOutcome::Blocked(_)));
        assert!(f.selector.presented().is_empty());
    }
}
