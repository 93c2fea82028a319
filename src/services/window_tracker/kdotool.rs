use super::WindowBackend;
use crate::error::{ExpanderError, Result};
use crate::events::WindowInfo;
use crate::utils::command::run_capture;
use std::collections::HashMap;
use std::process::Command;
use tracing::debug;

pub struct KdotoolBackend;

/// Под sudo kdotool должен ходить в сессионную шину исходного пользователя
fn build_env_overrides() -> HashMap<String, String> {
    let mut env_vars = HashMap::new();

    if std::env::var("USER").unwrap_or_default() == "root" {
        if let Ok(sudo_user) = std::env::var("SUDO_USER") {
            if let Ok(uid) = run_capture(Command::new("id").args(["-u", &sudo_user])) {
                let user_runtime_dir = format!("/run/user/{}", uid);
                let dbus_address = format!("unix:path={}/bus", user_runtime_dir);

                debug!("Окружение kdotool для пользователя {}: uid={}", sudo_user, uid);
                env_vars.insert("DBUS_SESSION_BUS_ADDRESS".to_string(), dbus_address);
                env_vars.insert("XDG_RUNTIME_DIR".to_string(), user_runtime_dir);
                env_vars.insert("USER".to_string(), sudo_user);
            }
        }
    }

    if let Ok(display_var) = std::env::var("DISPLAY") {
        env_vars.insert("DISPLAY".to_string(), display_var);
    }

    env_vars
}

impl KdotoolBackend {
    pub fn new() -> Self {
        Self
    }

    fn kdotool(args: &[&str]) -> Result<String> {
        let mut cmd = if let Ok(sudo_user) = std::env::var("SUDO_USER") {
            let mut cmd = Command::new("sudo");
            cmd.args(["-E", "-u", &sudo_user, "kdotool"]);
            cmd
        } else {
            Command::new("kdotool")
        };
        cmd.args(args);

        for (key, value) in build_env_overrides() {
            cmd.env(key, value);
        }

        run_capture(&mut cmd)
    }
}

impl WindowBackend for KdotoolBackend {
    fn name(&self) -> &'static str {
        "kdotool"
    }

    fn active_window(&self) -> Result<WindowInfo> {
        let id = Self::kdotool(&["getactivewindow"])?;
        if id.is_empty() {
            return Err(ExpanderError::WindowLookupFailed("kdotool не вернул id окна".to_string()));
        }

        let title = Self::kdotool(&["getwindowname", &id])?;
        if title.is_empty() {
            return Err(ExpanderError::WindowLookupFailed("kdotool вернул пустое название".to_string()));
        }

        let class = Self::kdotool(&["getwindowclassname", &id]).unwrap_or_else(|_| "KDE".to_string());

        Ok(WindowInfo::new(title).with_class(class).with_id(id))
    }

    fn activate(&self, window: &WindowInfo) -> Result<()> {
        let id = match &window.id {
            Some(id) => id.clone(),
            None => {
                let pattern = format!("^{}$", super::xdotool::escape_regex(&window.title));
                let found = Self::kdotool(&["search", "--name", &pattern])?;
                found
                    .lines()
                    .next()
                    .map(str::to_string)
                    .ok_or_else(|| ExpanderError::WindowLookupFailed(format!("окно {} не найдено", window)))?
            }
        };

        Self::kdotool(&["windowactivate", &id]).map(|_| ())
    }
}
