use thiserror::Error;

#[derive(Error, Debug)]
pub enum KioskError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Не удалось запустить процесс: {0}")]
    Launch(String),

    #[error("Устройство не найдено: {0}")]
    DeviceNotFound(String),

    #[error("Недостаточно прав доступа: {0}")]
    Permission(String),

    #[error("Ошибка внешней утилиты: {0}")]
    Tool(String),
}

impl KioskError {
    pub fn device_not_found<T>(msg: impl Into<String>) -> Result<T> {
        Err(KioskError::DeviceNotFound(msg.into()))
    }
}

pub type Result<T> = std::result::Result<T, KioskError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! kiosk_error {
    (launch, $($arg:tt)*) => {
        $crate::error::KioskError::Launch(format!($($arg)*))
    };
    (device_not_found, $($arg:tt)*) => {
        $crate::error::KioskError::DeviceNotFound(format!($($arg)*))
    };
    (permission, $($arg:tt)*) => {
        $crate::error::KioskError::Permission(format!($($arg)*))
    };
    (tool, $($arg:tt)*) => {
        $crate::error::KioskError::Tool(format!($($arg)*))
    };
}
