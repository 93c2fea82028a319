use crate::error::{ExpanderError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Поиск клавиатур среди `/dev/input/event*`
pub struct DeviceFinder;

impl DeviceFinder {
    /// `"auto"` даёт все доступные клавиатуры (лучшие первыми),
    /// иначе ровно указанное устройство
    pub fn find_keyboard_devices(device_path: &str) -> Result<Vec<PathBuf>> {
        if device_path != "auto" {
            let path = PathBuf::from(device_path);
            return if path.exists() {
                info!("Используется указанное устройство: {:?}", path);
                Ok(vec![path])
            } else {
                ExpanderError::device_not_found(format!("Указанное устройство не найдено: {:?}", path))
            };
        }

        Self::auto_find_keyboards()
    }

    fn auto_find_keyboards() -> Result<Vec<PathBuf>> {
        info!("Автопоиск клавиатурных устройств...");

        let mut found: Vec<(PathBuf, u32)> = Self::scan_by_id().unwrap_or_else(|e| {
            debug!("Поиск в /dev/input/by-id не удался: {}", e);
            Vec::new()
        });

        // Клавиатуры без записи в by-id (встроенные, виртуальные)
        for path in Self::scan_event_devices()? {
            let canonical = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
            let known = found
                .iter()
                .any(|(p, _)| fs::canonicalize(p).map_or(false, |c| c == canonical));
            if !known {
                found.push((path, 1));
            }
        }

        found.sort_by(|a, b| b.1.cmp(&a.1));
        let devices: Vec<PathBuf> = found.into_iter().map(|(path, _)| path).collect();

        if devices.is_empty() {
            return ExpanderError::device_not_found(
                "Не удалось найти доступное клавиатурное устройство. \
                 Убедитесь, что пользователь добавлен в группу 'input'",
            );
        }

        info!("Найдено клавиатур: {}", devices.len());
        Ok(devices)
    }

    fn scan_by_id() -> Result<Vec<(PathBuf, u32)>> {
        let by_id_dir = Path::new("/dev/input/by-id");
        let entries = fs::read_dir(by_id_dir)
            .map_err(|e| ExpanderError::Permission(format!("Нет доступа к {:?}: {}", by_id_dir, e)))?;

        let mut keyboards = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("").to_string();

            let Some(priority) = keyboard_priority(&name) else {
                continue;
            };

            if !Self::is_device_accessible(&path) {
                warn!("Устройство {:?} недоступно", path);
                continue;
            }

            if Self::is_keyboard_device(&path) {
                debug!("Клавиатура {} (приоритет {})", name, priority);
                keyboards.push((path, priority));
            }
        }
        Ok(keyboards)
    }

    fn scan_event_devices() -> Result<Vec<PathBuf>> {
        let input_dir = Path::new("/dev/input");
        let entries = fs::read_dir(input_dir)
            .map_err(|e| ExpanderError::Permission(format!("Нет доступа к /dev/input: {}", e)))?;

        let mut event_devices: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("event"))
            })
            .collect();
        event_devices.sort();

        Ok(event_devices
            .into_iter()
            .filter(|path| Self::is_device_accessible(path) && Self::is_keyboard_device(path))
            .collect())
    }

    fn is_keyboard_device(device_path: &Path) -> bool {
        match evdev::Device::open(device_path) {
            Ok(device) => {
                let device_name = device.name().unwrap_or("Unknown").to_lowercase();
                if looks_like_pointer(&device_name) {
                    debug!("Исключаем устройство как мышь/тачпад: {:?} ({})", device_path, device_name);
                    return false;
                }

                // У настоящей клавиатуры есть буквы, пробел, Enter и модификаторы
                device.supported_keys().is_some_and(|keys| {
                    keys.contains(evdev::KeyCode::KEY_A)
                        && keys.contains(evdev::KeyCode::KEY_SPACE)
                        && keys.contains(evdev::KeyCode::KEY_ENTER)
                        && keys.contains(evdev::KeyCode::KEY_LEFTCTRL)
                        && keys.iter().count() > 20
                })
            }
            Err(e) => {
                debug!("Не удалось открыть устройство {:?}: {}", device_path, e);
                false
            }
        }
    }

    fn is_device_accessible(device_path: &Path) -> bool {
        match fs::File::open(device_path) {
            Ok(_) => true,
            Err(e) => {
                debug!("Устройство {:?} недоступно: {}", device_path, e);
                false
            }
        }
    }
}

/// Приоритет записи `/dev/input/by-id`; `None` для не-клавиатур
fn keyboard_priority(by_id_name: &str) -> Option<u32> {
    let lower = by_id_name.to_lowercase();
    if !lower.contains("event") || looks_like_pointer(&lower) {
        return None;
    }

    if lower.ends_with("event-kbd") {
        Some(100)
    } else if lower.contains("keyboard") {
        Some(50)
    } else if lower.contains("kbd") {
        Some(10)
    } else {
        None
    }
}

fn looks_like_pointer(name_lower: &str) -> bool {
    ["mouse", "deathadder", "touchpad", "trackpoint"]
        .iter()
        .any(|marker| name_lower.contains(marker))
}
