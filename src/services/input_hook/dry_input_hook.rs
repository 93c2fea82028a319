use crate::error::Result;
use crate::events::{KeyCode, KeyEvent, KeyState};
use crate::mappings::KeyNameToEvdevCode;
use crate::services::trigger_detector::TriggerSpec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use super::r#trait::{InputHook, KeyHandler, Subscription};

const EMULATION_PERIOD: Duration = Duration::from_secs(10);
const TICK: Duration = Duration::from_millis(100);

/// Эмуляция перехвата: раз в 10 секунд "нажимает" и отпускает комбинацию
pub struct DryRunInputHook {
    chord: Vec<KeyCode>,
}

impl DryRunInputHook {
    pub fn new(chord: &str) -> Result<Self> {
        info!("Инициализация DryRunInputHook");
        let spec = TriggerSpec::parse(chord)?;
        let chord = spec
            .keys()
            .iter()
            .filter_map(|name| KeyNameToEvdevCode::translate(name).ok())
            .map(KeyCode::new)
            .collect();

        Ok(Self { chord })
    }

    fn emulate(chord: Vec<KeyCode>, handler: KeyHandler, stopped: Arc<AtomicBool>) {
        info!("Dry-run режим - комбинация будет эмулироваться каждые {:?}", EMULATION_PERIOD);
        let mut elapsed = Duration::ZERO;

        while !stopped.load(Ordering::Acquire) {
            thread::sleep(TICK);
            elapsed += TICK;
            if elapsed < EMULATION_PERIOD {
                continue;
            }
            elapsed = Duration::ZERO;

            debug!("Dry-run: эмулируем нажатие комбинации");
            for &code in &chord {
                handler(&KeyEvent::new(code, KeyState::Pressed, "dry-run".to_string()));
            }
            for &code in chord.iter().rev() {
                handler(&KeyEvent::new(code, KeyState::Released, "dry-run".to_string()));
            }
        }
    }
}

impl InputHook for DryRunInputHook {
    fn subscribe(&self, handler: KeyHandler) -> Result<Subscription> {
        let stopped = Arc::new(AtomicBool::new(false));
        let chord = self.chord.clone();
        let worker_stopped = stopped.clone();

        thread::Builder::new()
            .name("expander-dry-input".to_string())
            .spawn(move || Self::emulate(chord, handler, worker_stopped))?;

        Ok(Subscription::new(move || {
            stopped.store(true, Ordering::Release);
        }))
    }
}
