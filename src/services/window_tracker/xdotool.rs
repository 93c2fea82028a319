use super::WindowBackend;
use crate::error::{ExpanderError, Result};
use crate::events::WindowInfo;
use crate::utils::command::run_capture;
use parking_lot::Mutex;
use std::process::Command;
use tracing::debug;

pub struct XdotoolBackend {
    // Класс окна меняется только вместе с id, поэтому запрашиваем его один раз на окно
    class_cache: Mutex<Option<(String, String)>>,
}

impl XdotoolBackend {
    pub fn new() -> Self {
        Self {
            class_cache: Mutex::new(None),
        }
    }

    fn xdotool(args: &[&str]) -> Result<String> {
        run_capture(Command::new("xdotool").args(args))
    }

    fn class_of(&self, id: &str) -> String {
        if let Some((cached_id, class)) = self.class_cache.lock().as_ref() {
            if cached_id == id {
                return class.clone();
            }
        }

        let class = match Self::xdotool(&["getwindowclassname", id]) {
            Ok(class) => class,
            Err(e) => {
                debug!("Не удалось получить класс окна {}: {}", id, e);
                String::new()
            }
        };
        *self.class_cache.lock() = Some((id.to_string(), class.clone()));
        class
    }
}

impl WindowBackend for XdotoolBackend {
    fn name(&self) -> &'static str {
        "xdotool"
    }

    fn active_window(&self) -> Result<WindowInfo> {
        let id = Self::xdotool(&["getactivewindow"])?;
        if id.is_empty() {
            return Err(ExpanderError::WindowLookupFailed("xdotool не вернул id окна".to_string()));
        }

        let title = Self::xdotool(&["getwindowname", &id])?;
        let class = self.class_of(&id);

        Ok(WindowInfo::new(title).with_class(class).with_id(id))
    }

    fn activate(&self, window: &WindowInfo) -> Result<()> {
        match &window.id {
            Some(id) => Self::xdotool(&["windowactivate", "--sync", id]).map(|_| ()),
            None => {
                let pattern = format!("^{}$", escape_regex(&window.title));
                Self::xdotool(&["search", "--limit", "1", "--name", &pattern, "windowactivate", "--sync"])
                    .map(|_| ())
            }
        }
    }
}

/// Экранирование заголовка для `xdotool search --name` (POSIX extended regex)
pub(super) fn escape_regex(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
