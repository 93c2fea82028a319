use crate::error::{ExpanderError, Result};
use crate::events::{KeyCode, KeyEvent, KeyState};
use crate::trace_if_enabled;
use crate::utils::DeviceFinder;
use evdev::{Device, EventType};
use std::io::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::r#trait::{InputHook, KeyHandler, Subscription};

// ENODEV: устройство отключено
const ENODEV: i32 = 19;

/// Наблюдение за клавиатурами через evdev.
/// Устройства НЕ захватываются эксклюзивно: события продолжают идти в систему,
/// мы их только читаем.
pub struct EvdevInputHook {
    device_paths: Vec<PathBuf>,
}

impl EvdevInputHook {
    pub fn new(device_path: &str) -> Result<Self> {
        info!("Инициализация EvdevInputHook");

        let device_paths = DeviceFinder::find_keyboard_devices(device_path)
            .map_err(ExpanderError::into_hook_unavailable)?;

        for path in &device_paths {
            info!("Клавиатура для наблюдения: {}", path.display());
        }

        Ok(Self { device_paths })
    }

    fn open_device(path: &PathBuf) -> Result<Device> {
        let device = Device::open(path).map_err(|e| {
            Self::log_open_error(path, &e);
            ExpanderError::HookUnavailable(format!(
                "Не удалось открыть устройство {:?}: {}",
                path, e
            ))
        })?;

        info!(
            "Устройство: {} ({:?})",
            device.name().unwrap_or("Unknown"),
            device.physical_path()
        );
        Ok(device)
    }

    /// Цикл чтения одного устройства; живёт в собственном потоке
    fn read_loop(mut device: Device, handler: KeyHandler, stopped: Arc<AtomicBool>) {
        let device_name = device.name().unwrap_or("Unknown").to_string();
        debug!("Поток чтения {} запущен", device_name);

        while !stopped.load(Ordering::Acquire) {
            let events: Vec<_> = match device.fetch_events() {
                Ok(events) => events.collect(),
                Err(e) if e.raw_os_error() == Some(ENODEV) => {
                    warn!("Устройство {} отключено, поток чтения завершается", device_name);
                    break;
                }
                Err(e) => {
                    error!("Ошибка чтения событий {}: {}", device_name, e);
                    thread::sleep(Duration::from_millis(100));
                    continue;
                }
            };

            for event in events {
                // После отписки обработчик больше не вызывается
                if stopped.load(Ordering::Acquire) {
                    break;
                }
                if event.event_type() != EventType::KEY {
                    continue;
                }
                let Some(state) = KeyState::from_evdev_value(event.value()) else {
                    trace_if_enabled!("Неизвестное значение события: {}", event.value());
                    continue;
                };

                let key_event = KeyEvent::new(KeyCode(event.code()), state, device_name.clone());
                if catch_unwind(AssertUnwindSafe(|| handler(&key_event))).is_err() {
                    error!("Обработчик клавиатуры завершился паникой на {}", key_event);
                }
            }
        }

        debug!("Поток чтения {} остановлен", device_name);
    }

    fn log_open_error(device_path: &PathBuf, e: &Error) {
        warn!(
            "Не удалось открыть устройство {}: {}",
            device_path.display(),
            e
        );
        warn!("Попробуйте:");
        warn!("1. Добавить пользователя в группу input: sudo usermod -a -G input $USER");
        warn!("2. Перезайти в систему после добавления в группу");
    }
}

impl InputHook for EvdevInputHook {
    fn subscribe(&self, handler: KeyHandler) -> Result<Subscription> {
        // Открываем все устройства заранее: ошибка любого из них фатальна для start()
        let devices = self
            .device_paths
            .iter()
            .map(Self::open_device)
            .collect::<Result<Vec<_>>>()?;

        let stopped = Arc::new(AtomicBool::new(false));

        for device in devices {
            let handler = handler.clone();
            let worker_stopped = stopped.clone();
            let spawned = thread::Builder::new()
                .name("expander-input".to_string())
                .spawn(move || Self::read_loop(device, handler, worker_stopped));

            if let Err(e) = spawned {
                // Уже запущенные потоки не должны пережить неудачный subscribe
                stopped.store(true, Ordering::Release);
                return Err(ExpanderError::HookUnavailable(format!(
                    "Не удалось запустить поток чтения: {}",
                    e
                )));
            }
        }

        info!("Подписка на {} клавиатур(ы) активна", self.device_paths.len());

        // Потоки блокируются в read(); они завершатся на следующем событии
        Ok(Subscription::new(move || {
            stopped.store(true, Ordering::Release);
            info!("Подписка на клавиатуру снята");
        }))
    }
}
