use crate::error::{KioskError, Result};
use evdev::{Device, EventType};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct DeviceFinder;

impl DeviceFinder {
    /// Найти устройства ввода, по которым отслеживается активность пользователя.
    /// `"auto"` в списке путей включает автопоиск по /dev/input.
    pub fn find_activity_devices(device_paths: &[String]) -> Result<Vec<PathBuf>> {
        let mut devices = Vec::new();

        for device_path in device_paths {
            if device_path == "auto" {
                devices.extend(Self::auto_find_devices());
                continue;
            }

            let path = PathBuf::from(device_path);
            if path.exists() {
                info!("Используется указанное устройство: {:?}", path);
                devices.push(path);
            } else {
                warn!("Указанное устройство не найдено: {:?}", path);
            }
        }

        devices.sort();
        devices.dedup();

        if devices.is_empty() {
            return KioskError::device_not_found(
                "Не найдено ни одного устройства ввода (клавиатура, мышь, тачскрин). \
                 Проверьте права на /dev/input",
            );
        }
        Ok(devices)
    }

    fn auto_find_devices() -> Vec<PathBuf> {
        info!("Начинаем автопоиск устройств ввода...");

        let mut found: Vec<PathBuf> = evdev::enumerate()
            .filter(|(path, device)| Self::is_activity_device(path, device))
            .map(|(path, _)| path)
            .collect();

        if found.is_empty() {
            // enumerate молча пропускает устройства без доступа
            if let Err(e) = Self::check_input_dir() {
                warn!("{}", e);
            }
        }

        found.sort();
        info!("Найдено устройств ввода: {}", found.len());
        found
    }

    /// Клавиши, относительные оси (мышь) или абсолютные оси (тачскрин)
    fn is_activity_device(path: &Path, device: &Device) -> bool {
        let events = device.supported_events();
        let name = device.name().unwrap_or("Unknown");

        let has_keys = events.contains(EventType::KEY)
            && device.supported_keys().map_or(false, |keys| keys.iter().next().is_some());
        let has_axes = events.contains(EventType::RELATIVE) || events.contains(EventType::ABSOLUTE);

        if has_keys || has_axes {
            info!("Устройство ввода: {:?} ({})", path, name);
            true
        } else {
            debug!("Пропускаем устройство {:?} ({}): нет клавиш и осей", path, name);
            false
        }
    }

    fn check_input_dir() -> Result<()> {
        let input_dir = Path::new("/dev/input");
        fs::read_dir(input_dir).map(|_| ()).map_err(|e| {
            KioskError::Permission(format!("Нет доступа к {:?}: {}", input_dir, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_missing_path_is_error() {
        let result = DeviceFinder::find_activity_devices(&["/non/existent/path".to_string()]);
        assert!(matches!(result, Err(KioskError::DeviceNotFound(_))));
    }

    #[test]
    fn test_explicit_existing_path_is_used_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event7");
        fs::write(&path, b"").unwrap();
        let path_str = path.to_string_lossy().to_string();

        let devices =
            DeviceFinder::find_activity_devices(&[path_str.clone(), path_str]).unwrap();
        assert_eq!(devices, vec![path]);
    }
}
