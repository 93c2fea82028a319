use crate::config::InjectionConfig;
use crate::error::{ExpanderError, Result};
use crate::events::{KeyCode, KeyState, VirtualKeyEvent};
use crate::mappings::KeyNameToEvdevCode;
use crate::services::trigger_detector::TriggerSpec;
use crate::utils::command::run_capture;
use parking_lot::Mutex;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const VIRTUAL_DEVICE_NAME: &str = "chord-expander virtual keyboard";
const KEY_GAP: Duration = Duration::from_millis(8);

/// Сочетание вставки: модификаторы, затем остальные клавиши
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteShortcut {
    keys: Vec<&'static str>,
}

impl PasteShortcut {
    pub fn parse(raw: &str) -> Result<Self> {
        let spec = TriggerSpec::parse(raw)?;
        let (mut keys, rest): (Vec<&'static str>, Vec<&'static str>) = spec
            .keys()
            .iter()
            .copied()
            .partition(|k| KeyNameToEvdevCode::is_modifier(k));
        keys.extend(rest);
        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[&'static str] {
        &self.keys
    }

    /// Нажатия по порядку, отпускания в обратном порядке
    pub fn key_events(&self) -> Result<Vec<VirtualKeyEvent>> {
        let codes = self
            .keys
            .iter()
            .map(|k| KeyNameToEvdevCode::translate(k).map(KeyCode::new))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(ExpanderError::InvalidTriggerSpec)?;

        let presses = codes.iter().copied().map(VirtualKeyEvent::press);
        let releases = codes.iter().rev().copied().map(VirtualKeyEvent::release);
        Ok(presses.chain(releases).collect())
    }
}

/// Синтез сочетания вставки в окно с фокусом
pub trait PasteSimulator: Send + Sync {
    fn name(&self) -> &'static str;

    fn simulate_paste(&self) -> Result<()>;
}

pub fn create_paste_simulator(config: &InjectionConfig, dry_run: bool) -> Result<Arc<dyn PasteSimulator>> {
    let shortcut = PasteShortcut::parse(&config.paste_shortcut)?;

    if dry_run {
        return Ok(Arc::new(DryRunPaste { shortcut }));
    }

    match config.paste_backend.as_str() {
        "xdotool" => Ok(Arc::new(CommandPaste::xdotool(shortcut))),
        "wtype" => Ok(Arc::new(CommandPaste::wtype(shortcut))),
        _ => Ok(Arc::new(VirtualKeyboard::new(shortcut)?)),
    }
}

/// Виртуальная клавиатура uinput: работает и в X11, и в Wayland
pub struct VirtualKeyboard {
    device: Mutex<uinput::Device>,
    events: Vec<VirtualKeyEvent>,
}

impl VirtualKeyboard {
    pub fn new(shortcut: PasteShortcut) -> Result<Self> {
        info!("Создание виртуального устройства uinput '{}' для вставки", VIRTUAL_DEVICE_NAME);

        let device = uinput::default()?
            .name(VIRTUAL_DEVICE_NAME)?
            .event(uinput::event::Keyboard::All)?
            .create()
            .map_err(|e| {
                ExpanderError::InjectionFailed(format!(
                    "не удалось создать виртуальное устройство '{}': {}",
                    VIRTUAL_DEVICE_NAME, e
                ))
            })?;

        info!("Виртуальное устройство создано, сочетание вставки: {}", shortcut.keys().join("+"));
        Ok(Self {
            device: Mutex::new(device),
            events: shortcut.key_events()?,
        })
    }

    fn send(device: &mut uinput::Device, event: &VirtualKeyEvent) -> Result<()> {
        let keycode = event.key_code.value() as i32;

        device.write(1, keycode, event.state.evdev_value()).map_err(|e| {
            ExpanderError::InjectionFailed(format!("не удалось отправить событие клавиши {}: {}", keycode, e))
        })?;
        device
            .write(0, 0, 0)
            .map_err(|e| ExpanderError::InjectionFailed(format!("не удалось синхронизировать события: {}", e)))?;
        Ok(())
    }
}

impl PasteSimulator for VirtualKeyboard {
    fn name(&self) -> &'static str {
        "uinput"
    }

    fn simulate_paste(&self) -> Result<()> {
        let mut device = self.device.lock();
        let mut result = Ok(());

        for event in &self.events {
            if let Err(e) = Self::send(&mut device, event) {
                result = Err(e);
                break;
            }
            std::thread::sleep(KEY_GAP);
        }

        if result.is_err() {
            // Не оставляем модификаторы зажатыми
            for event in self.events.iter().filter(|e| e.state == KeyState::Released) {
                let _ = Self::send(&mut device, event);
            }
        } else {
            debug!("Сочетание вставки отправлено через uinput");
        }

        result
    }
}

/// Вставка внешней утилитой (`xdotool key` для X11, `wtype` для Wayland)
pub struct CommandPaste {
    name: &'static str,
    argv: Vec<String>,
}

impl CommandPaste {
    pub fn xdotool(shortcut: PasteShortcut) -> Self {
        let argv = vec![
            "xdotool".to_string(),
            "key".to_string(),
            "--clearmodifiers".to_string(),
            shortcut.keys().join("+"),
        ];
        Self { name: "xdotool", argv }
    }

    pub fn wtype(shortcut: PasteShortcut) -> Self {
        let mut argv = vec!["wtype".to_string()];
        let (modifiers, keys): (Vec<&str>, Vec<&str>) = shortcut
            .keys()
            .iter()
            .copied()
            .partition(|k| KeyNameToEvdevCode::is_modifier(k));

        for modifier in &modifiers {
            argv.push("-M".to_string());
            argv.push(wtype_modifier(modifier).to_string());
        }
        for key in &keys {
            argv.push("-k".to_string());
            argv.push(xkb_keysym(key));
        }
        for modifier in modifiers.iter().rev() {
            argv.push("-m".to_string());
            argv.push(wtype_modifier(modifier).to_string());
        }

        Self { name: "wtype", argv }
    }

    #[cfg(test)]
    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

impl PasteSimulator for CommandPaste {
    fn name(&self) -> &'static str {
        self.name
    }

    fn simulate_paste(&self) -> Result<()> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(ExpanderError::InjectionFailed("пустая команда вставки".to_string()));
        };

        run_capture(Command::new(program).args(args)).map(|_| ())
    }
}

fn wtype_modifier(key: &str) -> &str {
    match key {
        "super" => "logo",
        other => other,
    }
}

/// Имена xkb для wtype -k: одиночные символы как есть, остальные с заглавной
fn xkb_keysym(key: &str) -> String {
    match key {
        "enter" => "Return".to_string(),
        k if k.chars().count() == 1 => k.to_string(),
        k => {
            let mut chars = k.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

/// Вставка только в лог
pub struct DryRunPaste {
    shortcut: PasteShortcut,
}

impl PasteSimulator for DryRunPaste {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    fn simulate_paste(&self) -> Result<()> {
        info!("[DRY RUN] Вставка сочетанием {}", self.shortcut.keys().join("+"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcut_puts_modifiers_first() {
        let shortcut = PasteShortcut::parse("v+Shift+ctrl").unwrap();
        assert_eq!(shortcut.keys(), &["shift", "ctrl", "v"]);
    }

    #[test]
    fn test_key_events_release_in_reverse() {
        let events = PasteShortcut::parse("ctrl+v").unwrap().key_events().unwrap();
        let ctrl = KeyCode::new(29);
        let v = KeyCode::new(47);

        assert_eq!(
            events,
            vec![
                VirtualKeyEvent::press(ctrl),
                VirtualKeyEvent::press(v),
                VirtualKeyEvent::release(v),
                VirtualKeyEvent::release(ctrl),
            ]
        );
    }

    #[test]
    fn test_invalid_shortcut_rejected() {
        assert!(matches!(
            PasteShortcut::parse("ctrl+nonsense"),
            Err(ExpanderError::InvalidTriggerSpec(_))
        ));
    }

    #[test]
    fn test_xdotool_command() {
        let paste = CommandPaste::xdotool(PasteShortcut::parse("ctrl+shift+v").unwrap());
        assert_eq!(paste.argv(), &["xdotool", "key", "--clearmodifiers", "ctrl+shift+v"]);
    }

    #[test]
    fn test_wtype_command() {
        let paste = CommandPaste::wtype(PasteShortcut::parse("ctrl+shift+v").unwrap());
        assert_eq!(
            paste.argv(),
            &["wtype", "-M", "ctrl", "-M", "shift", "-k", "v", "-m", "shift", "-m", "ctrl"]
        );

        let paste = CommandPaste::wtype(PasteShortcut::parse("shift+insert").unwrap());
        assert_eq!(paste.argv(), &["wtype", "-M", "shift", "-k", "Insert", "-m", "shift"]);
    }

    #[test]
    fn test_failing_command_is_injection_failed() {
        let paste = CommandPaste {
            name: "false",
            argv: vec!["false".to_string()],
        };
        assert!(matches!(paste.simulate_paste(), Err(ExpanderError::InjectionFailed(_))));
    }
}
