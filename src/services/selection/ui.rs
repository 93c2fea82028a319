use super::SelectionSession;
use crate::config::SelectionConfig;
use std::fmt;
use std::sync::Arc;

/// Сообщения, которые пользователь видит вне меню выбора
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    NoExpansions,
}

impl Notice {
    pub fn summary(&self) -> &'static str {
        match self {
            Notice::NoExpansions => "Нет сокращений",
        }
    }

    pub fn body(&self) -> &'static str {
        match self {
            Notice::NoExpansions => "Добавьте записи [[expansions]] в конфигурацию",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.summary(), self.body())
    }
}

/// Внешний интерфейс выбора.
///
/// `present` не блокирует: UI забирает сессию и отвечает через неё позже,
/// когда пользователь выберет вариант, отменит выбор или закроет меню.
#[async_trait::async_trait]
pub trait SelectionUi: Send + Sync {
    fn present(&self, session: SelectionSession);

    async fn notify(&self, notice: Notice);
}

pub fn create_selection_ui(config: &SelectionConfig, dry_run: bool) -> Arc<dyn SelectionUi> {
    if dry_run {
        Arc::new(super::dry_run::DryRunSelector::new())
    } else {
        Arc::new(super::menu::MenuSelector::new(config.command.clone(), config.notify))
    }
}
