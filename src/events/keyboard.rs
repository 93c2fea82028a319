use crate::mappings::EvdevToKeyName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Состояние клавиши
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyState {
    Pressed,
    Released,
    Repeat,
}

impl KeyState {
    /// Значение поля `value` у evdev события
    pub fn from_evdev_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(KeyState::Released),
            1 => Some(KeyState::Pressed),
            2 => Some(KeyState::Repeat),
            _ => None,
        }
    }

    pub fn evdev_value(&self) -> i32 {
        match self {
            KeyState::Released => 0,
            KeyState::Pressed => 1,
            KeyState::Repeat => 2,
        }
    }

    /// Автоповтор считается удержанием клавиши
    pub fn is_down(&self) -> bool {
        !matches!(self, KeyState::Released)
    }
}

/// Код клавиши (evdev коды)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub fn new(code: u16) -> Self {
        Self(code)
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KEY_{}", self.0)
    }
}

/// Событие клавиатуры, полученное от глобального перехвата
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key_code: KeyCode,
    pub state: KeyState,
    pub timestamp: std::time::Instant,
    pub device_name: String,
}

impl KeyEvent {
    pub fn new(key_code: KeyCode, state: KeyState, device_name: String) -> Self {
        Self {
            key_code,
            state,
            timestamp: std::time::Instant::now(),
            device_name,
        }
    }

    /// Нормализованное имя клавиши; левый и правый модификаторы дают одно имя
    pub fn key_name(&self) -> Option<&'static str> {
        EvdevToKeyName::translate(self.key_code.value())
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] {:?} ({})",
            self.key_name().unwrap_or("?"),
            self.device_name,
            self.state,
            self.timestamp.elapsed().as_millis()
        )
    }
}
