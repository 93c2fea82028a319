use crate::error::{ExpanderError, Result};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Внешние утилиты окон и вставки отвечают за десятки миллисекунд
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

const POLL_STEP: Duration = Duration::from_millis(5);

/// Запустить внешнюю утилиту и вернуть её stdout без крайних пробелов.
/// Ошибкой считается неудачный запуск, ненулевой код выхода и зависание
/// дольше [`COMMAND_TIMEOUT`].
pub fn run_capture(cmd: &mut Command) -> Result<String> {
    run_capture_within(cmd, COMMAND_TIMEOUT)
}

pub fn run_capture_within(cmd: &mut Command, timeout: Duration) -> Result<String> {
    let program = cmd.get_program().to_string_lossy().to_string();
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ExpanderError::CommandSpawn {
            program: program.clone(),
            source,
        })?;

    // Чтение в отдельных потоках: большой вывод (swaymsg get_tree) не должен
    // упереться в буфер канала, пока мы ждём завершения
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match wait_within(&mut child, timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            warn!("{} не ответил за {:?}, процесс завершается", program, timeout);
            if let Err(e) = child.kill() {
                debug!("Не удалось завершить {}: {}", program, e);
            }
            let _ = child.wait();
            return Err(ExpanderError::CommandTimeout { program, timeout });
        }
        Err(source) => return Err(ExpanderError::CommandSpawn { program, source }),
    };

    let stdout = collect(stdout);
    if !status.success() {
        let stderr = collect(stderr).trim().to_string();
        debug!("{} вернул ошибку: {}", program, stderr);
        return Err(ExpanderError::CommandFailed { program, status, stderr });
    }

    Ok(stdout.trim().to_string())
}

fn wait_within(child: &mut Child, timeout: Duration) -> std::io::Result<Option<std::process::ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_STEP);
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<thread::JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(reader: Option<thread::JoinHandle<Vec<u8>>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}
