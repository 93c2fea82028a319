use super::{Notice, SelectionSession, SelectionUi};
use tracing::info;

/// Автовыбор первого варианта для режима без рабочего стола
pub struct DryRunSelector;

impl DryRunSelector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl SelectionUi for DryRunSelector {
    fn present(&self, session: SelectionSession) {
        let candidates = session.candidates();
        info!("Dry-run: показ выбора из {} вариантов, выбираем первый", candidates.len());
        session.choose(0);
    }

    async fn notify(&self, notice: Notice) {
        info!("Dry-run уведомление: {}", notice);
    }
}
