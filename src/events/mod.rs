pub mod keyboard;
pub mod window;

pub use keyboard::{KeyCode, KeyEvent, KeyState};
pub use window::{FocusSnapshot, WindowEvent, WindowInfo};

/// Момент, когда все клавиши комбинации оказались нажаты одновременно.
/// Полезной нагрузки нет, метка времени нужна только для логов.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    pub timestamp: std::time::Instant,
}

impl TriggerEvent {
    pub fn new() -> Self {
        Self {
            timestamp: std::time::Instant::now(),
        }
    }
}

impl Default for TriggerEvent {
    fn default() -> Self {
        Self::new()
    }
}

/// События для виртуальной клавиатуры
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualKeyEvent {
    pub key_code: KeyCode,
    pub state: KeyState,
}

impl VirtualKeyEvent {
    pub fn new(key_code: KeyCode, state: KeyState) -> Self {
        Self { key_code, state }
    }

    pub fn press(key_code: KeyCode) -> Self {
        Self::new(key_code, KeyState::Pressed)
    }

    pub fn release(key_code: KeyCode) -> Self {
        Self::new(key_code, KeyState::Released)
    }
}
