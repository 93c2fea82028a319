use super::WindowBackend;
use crate::error::Result;
use crate::events::WindowInfo;
use std::time::{Duration, Instant};
use tracing::info;

const FAKE_WINDOWS: [&str; 4] = [
    "Terminal - dry_run",
    "Browser - dry_run",
    "Editor - dry_run",
    "Chat - dry_run",
];

/// Эмуляция смены окон: каждые 10 секунд фокус "переходит" к следующему окну
pub struct DryRunWindowBackend {
    started: Instant,
    period: Duration,
}

impl DryRunWindowBackend {
    pub fn new() -> Self {
        info!("Dry-run режим - окна эмулируются");
        Self {
            started: Instant::now(),
            period: Duration::from_secs(10),
        }
    }
}

impl WindowBackend for DryRunWindowBackend {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    fn active_window(&self) -> Result<WindowInfo> {
        let index = (self.started.elapsed().as_millis() / self.period.as_millis()) as usize % FAKE_WINDOWS.len();
        Ok(WindowInfo::new(FAKE_WINDOWS[index].to_string())
            .with_class("DryRun".to_string())
            .with_id(format!("dry-{}", index)))
    }

    fn activate(&self, window: &WindowInfo) -> Result<()> {
        info!("Dry-run: активируем окно {}", window);
        Ok(())
    }
}
