use crate::error::{ExpanderError, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::{info, warn};

const SETUP_HINT: &str = "sudo usermod -a -G input,uinput $USER && sudo modprobe uinput (затем перезайдите в систему)";

/// Проверка прав до запуска перехвата.
/// Отсутствие доступа к `/dev/input` означает `HookUnavailable`.
pub fn check_permissions(needs_uinput: bool) -> Result<()> {
    info!("Проверка прав доступа...");

    check_input_devices_access()?;
    if needs_uinput {
        check_uinput_access()?;
    }
    check_not_root();

    info!("Проверка прав доступа завершена успешно");
    Ok(())
}

fn check_input_devices_access() -> Result<()> {
    let input_dir = Path::new("/dev/input");

    if !input_dir.exists() {
        return Err(ExpanderError::HookUnavailable(format!("{:?} не существует", input_dir)));
    }

    fs::read_dir(input_dir).map(|_| ()).map_err(|e| {
        ExpanderError::HookUnavailable(format!("нет доступа к {:?}: {}. {}", input_dir, e, SETUP_HINT))
    })
}

fn check_uinput_access() -> Result<()> {
    let uinput_device = Path::new("/dev/uinput");

    if !uinput_device.exists() {
        // Модуль может быть загружен позже
        warn!("{:?} не существует, возможно модуль uinput не загружен", uinput_device);
        return Ok(());
    }

    let metadata = fs::metadata(uinput_device).map_err(|e| {
        ExpanderError::Permission(format!("не удалось проверить права доступа к {:?}: {}", uinput_device, e))
    })?;

    if !mode_allows_group_or_other(metadata.permissions().mode()) {
        return Err(ExpanderError::Permission(format!(
            "нет прав доступа к {:?}. {}",
            uinput_device, SETUP_HINT
        )));
    }

    info!("Доступ к {:?} подтвержден", uinput_device);
    Ok(())
}

/// Права вида 660/666: группа или остальные могут читать и писать
fn mode_allows_group_or_other(mode: u32) -> bool {
    mode & 0o060 == 0o060 || mode & 0o006 == 0o006
}

fn check_not_root() {
    match std::env::var("USER") {
        Ok(user) if user == "root" => {
            warn!("Приложение запущено от имени root");
            warn!("Рекомендуется запускать от обычного пользователя: {}", SETUP_HINT);
        }
        Ok(user) => info!("Приложение запущено от имени пользователя: {}", user),
        Err(_) => warn!("Не удалось определить пользователя"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_allows_group_or_other() {
        assert!(mode_allows_group_or_other(0o660));
        assert!(mode_allows_group_or_other(0o666));
        assert!(!mode_allows_group_or_other(0o600));
        assert!(!mode_allows_group_or_other(0o640));
    }
}
