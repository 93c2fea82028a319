use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExpanderError {
    #[error("Неверная комбинация-триггер: {0}")]
    InvalidTriggerSpec(String),

    #[error("Глобальный перехват клавиатуры недоступен: {0}")]
    HookUnavailable(String),

    #[error("Не удалось определить окно: {0}")]
    WindowLookupFailed(String),

    #[error("Ошибка доступа к буферу обмена: {0}")]
    ClipboardAccessFailed(String),

    #[error("Не удалось выполнить вставку: {0}")]
    InjectionFailed(String),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка uinput: {0}")]
    Uinput(#[from] uinput::Error),

    #[error("Ошибка D-Bus: {0}")]
    DBus(#[from] zbus::Error),

    #[error("Не удалось запустить {program}: {source}")]
    CommandSpawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} завершился с ошибкой ({status}): {stderr}")]
    CommandFailed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("{program} не ответил за {timeout:?}")]
    CommandTimeout {
        program: String,
        timeout: std::time::Duration,
    },

    #[error("Устройство не найдено: {0}")]
    DeviceNotFound(String),

    #[error("Недостаточно прав доступа: {0}")]
    Permission(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl ExpanderError {
    pub fn device_not_found<T>(msg: impl Into<String>) -> Result<T> {
        Err(ExpanderError::DeviceNotFound(msg.into()))
    }

    /// Ошибки, которые при старте означают отсутствие глобального перехвата
    pub fn into_hook_unavailable(self) -> Self {
        match self {
            ExpanderError::HookUnavailable(_) => self,
            other => ExpanderError::HookUnavailable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExpanderError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! expander_error {
    (invalid_trigger, $($arg:tt)*) => {
        $crate::error::ExpanderError::InvalidTriggerSpec(format!($($arg)*))
    };
    (hook_unavailable, $($arg:tt)*) => {
        $crate::error::ExpanderError::HookUnavailable(format!($($arg)*))
    };
    (window_lookup, $($arg:tt)*) => {
        $crate::error::ExpanderError::WindowLookupFailed(format!($($arg)*))
    };
    (clipboard, $($arg:tt)*) => {
        $crate::error::ExpanderError::ClipboardAccessFailed(format!($($arg)*))
    };
    (injection, $($arg:tt)*) => {
        $crate::error::ExpanderError::InjectionFailed(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::ExpanderError::Internal(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_hook_unavailable_wraps_other_kinds() {
        let err = ExpanderError::Permission("нет доступа к /dev/input".to_string());
        match err.into_hook_unavailable() {
            ExpanderError::HookUnavailable(msg) => assert!(msg.contains("/dev/input")),
            other => panic!("ожидался HookUnavailable, получено {:?}", other),
        }
    }

    #[test]
    fn test_macro_builds_expected_variant() {
        let err = expander_error!(window_lookup, "окно {} закрыто", "Terminal");
        assert!(matches!(err, ExpanderError::WindowLookupFailed(ref m) if m == "окно Terminal закрыто"));
    }
}
