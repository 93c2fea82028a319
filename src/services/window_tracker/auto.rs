use super::dry_run::DryRunWindowBackend;
use super::kdotool::KdotoolBackend;
use super::sway::SwayBackend;
use super::wmctrl::WmctrlBackend;
use super::xdotool::XdotoolBackend;
use super::WindowBackend;
use crate::error::{ExpanderError, Result};
use crate::events::WindowInfo;
use parking_lot::Mutex;
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DesktopEnvironment {
    Kde,
    Sway,
    X11Generic,
    Unknown,
}

/// Перебор утилит с запоминанием рабочей.
/// Когда рабочая утилита перестаёт отвечать, кандидаты опрашиваются заново.
pub struct AutoBackend {
    candidates: Vec<Arc<dyn WindowBackend>>,
    working: Mutex<Option<usize>>,
}

impl AutoBackend {
    pub fn detect() -> Self {
        let desktop_env = detect_desktop_environment();
        info!("Обнаружена среда рабочего стола: {:?}", desktop_env);

        let candidates: Vec<Arc<dyn WindowBackend>> = match desktop_env {
            DesktopEnvironment::Kde => vec![
                Arc::new(KdotoolBackend::new()),
                Arc::new(XdotoolBackend::new()),
                Arc::new(WmctrlBackend::new()),
            ],
            DesktopEnvironment::Sway => vec![Arc::new(SwayBackend::new())],
            DesktopEnvironment::X11Generic => vec![
                Arc::new(XdotoolBackend::new()),
                Arc::new(WmctrlBackend::new()),
            ],
            DesktopEnvironment::Unknown => vec![
                Arc::new(KdotoolBackend::new()),
                Arc::new(XdotoolBackend::new()),
                Arc::new(WmctrlBackend::new()),
                Arc::new(SwayBackend::new()),
            ],
        };

        Self::with_candidates(candidates)
    }

    pub fn with_candidates(candidates: Vec<Arc<dyn WindowBackend>>) -> Self {
        let candidates = if candidates.is_empty() {
            vec![Arc::new(DryRunWindowBackend::new()) as Arc<dyn WindowBackend>]
        } else {
            candidates
        };

        Self {
            candidates,
            working: Mutex::new(None),
        }
    }

    /// Имя утилиты, которая отвечала последней
    #[cfg(test)]
    pub fn working_name(&self) -> Option<&'static str> {
        self.working.lock().map(|i| self.candidates[i].name())
    }

    fn find_working(&self) -> Result<WindowInfo> {
        debug!("Определяем рабочий метод детекции окон...");

        for (index, candidate) in self.candidates.iter().enumerate() {
            match candidate.active_window() {
                Ok(window) => {
                    let mut working = self.working.lock();
                    if *working != Some(index) {
                        info!("Используем {} для определения окон", candidate.name());
                    }
                    *working = Some(index);
                    return Ok(window);
                }
                Err(e) => debug!("{} не работает: {}", candidate.name(), e),
            }
        }

        *self.working.lock() = None;
        Err(ExpanderError::WindowLookupFailed(
            "ни один метод детекции окон не работает".to_string(),
        ))
    }
}

impl WindowBackend for AutoBackend {
    fn name(&self) -> &'static str {
        "auto"
    }

    fn active_window(&self) -> Result<WindowInfo> {
        let working = *self.working.lock();
        if let Some(index) = working {
            let backend = &self.candidates[index];
            match backend.active_window() {
                Ok(window) => return Ok(window),
                Err(e) => warn!(
                    "Рабочий метод {} перестал работать: {}. Переопределяем...",
                    backend.name(),
                    e
                ),
            }
        }

        self.find_working()
    }

    fn activate(&self, window: &WindowInfo) -> Result<()> {
        let working = *self.working.lock();
        let index = match working {
            Some(index) => index,
            None => {
                self.find_working()?;
                self.working.lock().unwrap_or(0)
            }
        };

        self.candidates[index].activate(window)
    }
}

fn detect_desktop_environment() -> DesktopEnvironment {
    if std::env::var_os("SWAYSOCK").is_some() {
        return DesktopEnvironment::Sway;
    }

    if let Ok(desktop) = std::env::var("XDG_CURRENT_DESKTOP") {
        let desktop = desktop.to_lowercase();
        if desktop.contains("kde") {
            return DesktopEnvironment::Kde;
        }
        if desktop.contains("sway") {
            return DesktopEnvironment::Sway;
        }
    }

    if let Ok(session) = std::env::var("XDG_SESSION_TYPE") {
        if session == "x11" {
            return DesktopEnvironment::X11Generic;
        }
    }

    if let Ok(output) = Command::new("pgrep").arg("-f").arg("kwin").output() {
        if !output.stdout.is_empty() {
            return DesktopEnvironment::Kde;
        }
    }

    DesktopEnvironment::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeWindowBackend;

    #[test]
    fn test_first_answering_candidate_wins() {
        let broken = Arc::new(FakeWindowBackend::failing("broken"));
        let good = Arc::new(FakeWindowBackend::showing("good", WindowInfo::new("Editor".to_string())));
        let candidates: Vec<Arc<dyn WindowBackend>> = vec![broken, good];
        let auto = AutoBackend::with_candidates(candidates);

        assert_eq!(auto.active_window().unwrap().title, "Editor");
        assert_eq!(auto.working_name(), Some("good"));
    }

    #[test]
    fn test_redetects_when_working_backend_breaks() {
        let first = Arc::new(FakeWindowBackend::showing("first", WindowInfo::new("A".to_string())));
        let second = Arc::new(FakeWindowBackend::showing("second", WindowInfo::new("B".to_string())));
        let candidates: Vec<Arc<dyn WindowBackend>> = vec![first.clone(), second];
        let auto = AutoBackend::with_candidates(candidates);

        assert_eq!(auto.active_window().unwrap().title, "A");
        first.set_window(None);
        assert_eq!(auto.active_window().unwrap().title, "B");
        assert_eq!(auto.working_name(), Some("second"));
    }

    #[test]
    fn test_all_failing_is_lookup_error() {
        let candidates: Vec<Arc<dyn WindowBackend>> = vec![Arc::new(FakeWindowBackend::failing("x"))];
        let auto = AutoBackend::with_candidates(candidates);
        assert!(matches!(auto.active_window(), Err(ExpanderError::WindowLookupFailed(_))));
        assert_eq!(auto.working_name(), None);
    }

    #[test]
    fn test_activate_goes_to_working_backend() {
        let good = Arc::new(FakeWindowBackend::showing("good", WindowInfo::new("Editor".to_string())));
        let candidates: Vec<Arc<dyn WindowBackend>> = vec![good.clone()];
        let auto = AutoBackend::with_candidates(candidates);

        let target = WindowInfo::new("Editor".to_string());
        auto.activate(&target).unwrap();
        assert_eq!(good.activations(), vec![target]);
    }
}
