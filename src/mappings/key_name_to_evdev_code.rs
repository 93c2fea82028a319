use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Преобразование имён клавиш в evdev коды.
/// Имена в таблице каноничные: именно они попадают в TriggerSpec и KeyState.
pub struct KeyNameToEvdevCode;

static KEY_TABLE: &[(&str, u16)] = &[
    // Буквенные клавиши
    ("a", 30), ("b", 48), ("c", 46), ("d", 32), ("e", 18), ("f", 33), ("g", 34),
    ("h", 35), ("i", 23), ("j", 36), ("k", 37), ("l", 38), ("m", 50), ("n", 49),
    ("o", 24), ("p", 25), ("q", 16), ("r", 19), ("s", 31), ("t", 20), ("u", 22),
    ("v", 47), ("w", 17), ("x", 45), ("y", 21), ("z", 44),

    // Цифровые клавиши (верхний ряд)
    ("1", 2), ("2", 3), ("3", 4), ("4", 5), ("5", 6),
    ("6", 7), ("7", 8), ("8", 9), ("9", 10), ("0", 11),

    // Специальные клавиши
    ("space", 57), ("enter", 28), ("escape", 1), ("backspace", 14), ("tab", 15),
    ("capslock", 58),

    // Пунктуация
    ("minus", 12), ("equal", 13), ("leftbrace", 26), ("rightbrace", 27),
    ("backslash", 43), ("semicolon", 39), ("apostrophe", 40), ("grave", 41),
    ("comma", 51), ("dot", 52), ("slash", 53),

    // Навигация/редакция
    ("insert", 110), ("delete", 111), ("home", 102), ("end", 107),
    ("pageup", 104), ("pagedown", 109),
    ("up", 103), ("down", 108), ("left", 105), ("right", 106),

    // Системные
    ("printscreen", 99), ("scrolllock", 70), ("pause", 119),

    // Модификаторы (левые коды; правые сводятся к тем же именам)
    ("ctrl", 29), ("alt", 56), ("shift", 42), ("super", 125),

    // Функциональные клавиши
    ("f1", 59), ("f2", 60), ("f3", 61), ("f4", 62), ("f5", 63), ("f6", 64),
    ("f7", 65), ("f8", 66), ("f9", 67), ("f10", 68), ("f11", 87), ("f12", 88),

    // Numpad
    ("kp0", 82), ("kp1", 79), ("kp2", 80), ("kp3", 81), ("kp4", 75),
    ("kp5", 76), ("kp6", 77), ("kp7", 71), ("kp8", 72), ("kp9", 73),
    ("kpdecimal", 83), ("kpdivide", 98), ("kpmultiply", 55), ("kpadd", 78),
    ("kpsubtract", 74), ("kpenter", 96),
];

// Синонимы, которые люди пишут в конфиге
static ALIASES: &[(&str, &str)] = &[
    ("control", "ctrl"),
    ("leftctrl", "ctrl"),
    ("rightctrl", "ctrl"),
    ("option", "alt"),
    ("altgr", "alt"),
    ("leftalt", "alt"),
    ("rightalt", "alt"),
    ("leftshift", "shift"),
    ("rightshift", "shift"),
    ("meta", "super"),
    ("win", "super"),
    ("cmd", "super"),
    ("esc", "escape"),
    ("return", "enter"),
    ("spacebar", "space"),
    ("del", "delete"),
    ("ins", "insert"),
    ("pgup", "pageup"),
    ("pgdn", "pagedown"),
    ("period", "dot"),
];

static NAME_TO_CODE: Lazy<HashMap<&'static str, u16>> =
    Lazy::new(|| KEY_TABLE.iter().copied().collect());

static CODE_TO_NAME: Lazy<HashMap<u16, &'static str>> = Lazy::new(|| {
    let mut map: HashMap<u16, &'static str> =
        KEY_TABLE.iter().map(|&(name, code)| (code, name)).collect();

    // Правые модификаторы
    map.insert(97, "ctrl");   // KEY_RIGHTCTRL
    map.insert(100, "alt");   // KEY_RIGHTALT
    map.insert(54, "shift");  // KEY_RIGHTSHIFT
    map.insert(126, "super"); // KEY_RIGHTMETA
    map
});

static ALIAS_MAP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| ALIASES.iter().copied().collect());

impl KeyNameToEvdevCode {
    /// Каноничное имя клавиши для произвольного написания (регистр, синонимы)
    pub fn canonical_name(key_name: &str) -> Option<&'static str> {
        let normalized = key_name.trim().to_lowercase();
        let resolved = ALIAS_MAP
            .get(normalized.as_str())
            .copied()
            .unwrap_or(normalized.as_str());

        NAME_TO_CODE.get_key_value(resolved).map(|(&name, _)| name)
    }

    /// Получить evdev код клавиши по её имени
    pub fn translate(key_name: &str) -> Result<u16, String> {
        Self::canonical_name(key_name)
            .and_then(|name| NAME_TO_CODE.get(name).copied())
            .ok_or_else(|| format!("Unknown key: {}", key_name))
    }

    /// Получить каноничное имя клавиши по evdev коду
    pub fn reverse_translate(keycode: u16) -> Option<&'static str> {
        CODE_TO_NAME.get(&keycode).copied()
    }

    /// Проверить, является ли клавиша модификатором
    pub fn is_modifier(key_name: &str) -> bool {
        matches!(
            Self::canonical_name(key_name),
            Some("ctrl" | "alt" | "shift" | "super")
        )
    }
}
