use super::KeyNameToEvdevCode;
use evdev::KeyCode;

/// Преобразование evdev кодов в каноничные имена клавиш.
/// Левые и правые модификаторы дают одно имя, чтобы "ctrl" в комбинации
/// срабатывал от любой из двух клавиш.
pub struct EvdevToKeyName;

impl EvdevToKeyName {
    /// Получить имя клавиши из evdev::KeyCode
    pub fn translate_key(key: KeyCode) -> Option<&'static str> {
        match key {
            KeyCode::KEY_LEFTCTRL | KeyCode::KEY_RIGHTCTRL => Some("ctrl"),
            KeyCode::KEY_LEFTALT | KeyCode::KEY_RIGHTALT => Some("alt"),
            KeyCode::KEY_LEFTSHIFT | KeyCode::KEY_RIGHTSHIFT => Some("shift"),
            KeyCode::KEY_LEFTMETA | KeyCode::KEY_RIGHTMETA => Some("super"),
            other => KeyNameToEvdevCode::reverse_translate(other.code()),
        }
    }

    /// Получить имя клавиши по сырому коду события
    pub fn translate(code: u16) -> Option<&'static str> {
        Self::translate_key(KeyCode::new(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_keys() {
        assert_eq!(EvdevToKeyName::translate_key(KeyCode::KEY_A), Some("a"));
        assert_eq!(EvdevToKeyName::translate_key(KeyCode::KEY_Z), Some("z"));
    }

    #[test]
    fn test_modifier_sides_collapse() {
        assert_eq!(EvdevToKeyName::translate_key(KeyCode::KEY_RIGHTALT), Some("alt"));
        assert_eq!(EvdevToKeyName::translate_key(KeyCode::KEY_LEFTMETA), Some("super"));
        assert_eq!(EvdevToKeyName::translate(KeyCode::KEY_RIGHTSHIFT.code()), Some("shift"));
    }

    #[test]
    fn test_special_keys() {
        assert_eq!(EvdevToKeyName::translate_key(KeyCode::KEY_SPACE), Some("space"));
        assert_eq!(EvdevToKeyName::translate_key(KeyCode::KEY_ESC), Some("escape"));
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(EvdevToKeyName::translate_key(KeyCode::KEY_MUTE), None);
    }
}
