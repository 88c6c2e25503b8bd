use crate::error::{KioskError, Result};
use std::fs;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;
use tracing::{info, warn};

/// Супервизору нужен root: сигналы чужим процессам, /dev/input, файл сигнала.
/// Без root процесс перезапускается через sudo с теми же аргументами;
/// при успехе функция не возвращается.
pub fn ensure_root() -> Result<()> {
    if is_root() {
        info!("Запущено от имени root");
        return Ok(());
    }

    warn!("Нужны права root, перезапуск через sudo...");
    let exe = std::env::current_exe()?;
    let args: Vec<String> = std::env::args().skip(1).collect();

    // exec возвращает управление только при ошибке
    let err = Command::new("sudo").arg("-E").arg(&exe).args(&args).exec();
    Err(KioskError::Permission(format!(
        "Не удалось перезапуститься через sudo ({:?}): {}",
        exe, err
    )))
}

pub fn is_root() -> bool {
    // SAFETY: geteuid не имеет побочных эффектов
    unsafe { libc::geteuid() == 0 }
}

/// Проверить доступ к устройствам ввода
pub fn check_input_devices_access() -> Result<()> {
    let input_dir = Path::new("/dev/input");

    if !input_dir.exists() {
        return Err(KioskError::Permission(format!(
            "Директория {:?} не существует",
            input_dir
        )));
    }

    match fs::read_dir(input_dir) {
        Ok(_) => {
            info!("Доступ к {:?} подтвержден", input_dir);
            Ok(())
        }
        Err(e) => Err(KioskError::Permission(format!(
            "Нет доступа к {:?}: {}. Запустите от root или добавьте пользователя в группу 'input'",
            input_dir, e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_root_matches_euid() {
        let euid = unsafe { libc::geteuid() };
        assert_eq!(is_root(), euid == 0);
    }
}
