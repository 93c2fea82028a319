use crate::config::WindowConfig;
use crate::error::Result;
use crate::events::WindowInfo;
use std::sync::Arc;

/// Способ узнать активное окно и вернуть ему фокус.
///
/// Реализации синхронные: почти все они запускают внешнюю утилиту,
/// поэтому вызывающая сторона выполняет их через `spawn_blocking`.
pub trait WindowBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Текущее окно с фокусом ввода
    fn active_window(&self) -> Result<WindowInfo>;

    /// Вывести окно на передний план.
    /// `WindowLookupFailed`, если окно закрыто или не найдено.
    fn activate(&self, window: &WindowInfo) -> Result<()>;
}

/// Фабрика backend'а окон по настройке `[window].backend`
pub fn create_window_backend(config: &WindowConfig, dry_run: bool) -> Arc<dyn WindowBackend> {
    if dry_run {
        return Arc::new(super::dry_run::DryRunWindowBackend::new());
    }

    match config.backend.as_str() {
        "xdotool" => Arc::new(super::xdotool::XdotoolBackend::new()),
        "kdotool" => Arc::new(super::kdotool::KdotoolBackend::new()),
        "wmctrl" => Arc::new(super::wmctrl::WmctrlBackend::new()),
        "sway" => Arc::new(super::sway::SwayBackend::new()),
        _ => Arc::new(super::auto::AutoBackend::detect()),
    }
}
