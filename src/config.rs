use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::events::ScreenGeometry;
use crate::services::program::ProgramRole;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub display: DisplayConfig,
    pub primary: ProgramConfig,
    pub idle: ProgramConfig,
    pub switching: SwitchingConfig,
    pub watchdogs: WatchdogConfig,
    pub input: InputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

/// Параметры X-дисплея, передаются всем внешним утилитам и дочерним процессам
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    pub display: String,
    pub xauthority: Option<String>,
    pub fallback_width: u32,
    pub fallback_height: u32,
    pub fullscreen_tolerance_px: u32,
    /// Точка внутри окна для синтетического клика при "пробуждении"
    pub wake_point: (i32, i32),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProgramConfig {
    pub interpreter: PathBuf,
    pub script: PathBuf,
    pub window_class: String,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    pub window_timeout_ms: u64,
    /// `None` - без потолка перезапусков
    #[serde(default)]
    pub max_restarts: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SwitchingConfig {
    pub cooldown_ms: u64,
    pub startup_grace_ms: u64,
    pub idle_timeout_ms: u64,
    pub restart_backoff_ms: u64,
    pub settle_delay_ms: u64,
    pub wake_verify_delay_ms: u64,
    pub window_poll_ms: u64,
    pub graceful_stop_ms: u64,
    pub reap_strays: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchdogConfig {
    pub input_enabled: bool,
    pub input_deadzone: i32,
    pub signal_file: PathBuf,
    pub signal_poll_ms: u64,
    pub idle_poll_ms: u64,
    pub health_poll_ms: u64,
    #[serde(default)]
    pub helper_script: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    /// Пути к устройствам или `auto` для автопоиска
    pub device_paths: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            display: ":0".to_string(),
            xauthority: None,
            fallback_width: 1024,
            fallback_height: 600,
            fullscreen_tolerance_px: 10,
            wake_point: (100, 100),
        }
    }
}

impl Default for SwitchingConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 3_000,
            startup_grace_ms: 5_000,
            idle_timeout_ms: 30_000,
            restart_backoff_ms: 2_000,
            settle_delay_ms: 500,
            wake_verify_delay_ms: 1_000,
            window_poll_ms: 500,
            graceful_stop_ms: 2_000,
            reap_strays: true,
        }
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            input_enabled: true,
            input_deadzone: 5,
            signal_file: PathBuf::from("/tmp/gpio_low_signal"),
            signal_poll_ms: 100,
            idle_poll_ms: 1_000,
            health_poll_ms: 5_000,
            helper_script: None,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            device_paths: vec!["auto".to_string()],
        }
    }
}

impl ProgramConfig {
    pub fn default_for(role: ProgramRole) -> Self {
        match role {
            ProgramRole::Primary => Self {
                interpreter: PathBuf::from("/usr/bin/python3"),
                script: PathBuf::from("/opt/kiosk/chat/chat.py"),
                window_class: "chat.py".to_string(),
                log_file: Some(PathBuf::from("/var/log/kiosk-primary.log")),
                window_timeout_ms: 20_000,
                max_restarts: Some(5),
            },
            ProgramRole::Idle => Self {
                interpreter: PathBuf::from("/usr/bin/python3"),
                script: PathBuf::from("/opt/kiosk/slideshow/slideshow.py"),
                window_class: "slideshow.py".to_string(),
                log_file: None,
                window_timeout_ms: 5_000,
                max_restarts: None,
            },
        }
    }

    pub fn window_timeout(&self) -> Duration {
        Duration::from_millis(self.window_timeout_ms)
    }
}

impl DisplayConfig {
    /// Разрешение на случай, если ни одна утилита не ответила
    pub fn fallback_screen(&self) -> ScreenGeometry {
        ScreenGeometry::new(self.fallback_width, self.fallback_height)
    }
}

impl SwitchingConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn restart_backoff(&self) -> Duration {
        Duration::from_millis(self.restart_backoff_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn wake_verify_delay(&self) -> Duration {
        Duration::from_millis(self.wake_verify_delay_ms)
    }

    pub fn window_poll(&self) -> Duration {
        Duration::from_millis(self.window_poll_ms)
    }

    pub fn graceful_stop(&self) -> Duration {
        Duration::from_millis(self.graceful_stop_ms)
    }
}

impl WatchdogConfig {
    pub fn signal_poll(&self) -> Duration {
        Duration::from_millis(self.signal_poll_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn health_poll(&self) -> Duration {
        Duration::from_millis(self.health_poll_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            display: DisplayConfig::default(),
            primary: ProgramConfig::default_for(ProgramRole::Primary),
            idle: ProgramConfig::default_for(ProgramRole::Idle),
            switching: SwitchingConfig::default(),
            watchdogs: WatchdogConfig::default(),
            input: InputConfig::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("KIOSK_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn program(&self, role: ProgramRole) -> &ProgramConfig {
        match role {
            ProgramRole::Primary => &self.primary,
            ProgramRole::Idle => &self.idle,
        }
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        if self.display.display.is_empty() {
            anyhow::bail!("display.display не может быть пустым");
        }

        if self.display.fallback_width == 0 || self.display.fallback_height == 0 {
            anyhow::bail!("Разрешение по умолчанию должно быть больше 0");
        }

        for role in [ProgramRole::Primary, ProgramRole::Idle] {
            let program = self.program(role);
            if program.script.as_os_str().is_empty() || program.interpreter.as_os_str().is_empty() {
                anyhow::bail!("Пустой путь к программе {}", role);
            }
            if program.window_class.trim().is_empty() {
                anyhow::bail!("Пустой window_class у программы {}", role);
            }
            if program.window_timeout_ms == 0 {
                anyhow::bail!("window_timeout_ms у программы {} должно быть больше 0", role);
            }
            if program.max_restarts == Some(0) {
                anyhow::bail!("max_restarts у программы {} должно быть больше 0", role);
            }
        }

        let s = &self.switching;
        if s.window_poll_ms == 0 || s.graceful_stop_ms == 0 || s.idle_timeout_ms == 0 {
            anyhow::bail!("Интервалы переключения должны быть больше 0");
        }

        let w = &self.watchdogs;
        if w.signal_poll_ms == 0 || w.idle_poll_ms == 0 || w.health_poll_ms == 0 {
            anyhow::bail!("Интервалы опроса сторожей должны быть больше 0");
        }

        if w.input_deadzone < 0 {
            anyhow::bail!("input_deadzone не может быть отрицательным");
        }

        if self.input.device_paths.is_empty() {
            anyhow::bail!("input.device_paths не может быть пустым (используйте \"auto\")");
        }

        Ok(())
    }

    /// Классы окон сравниваются как подстроки без учёта регистра,
    /// поэтому вложенные друг в друга классы дают неоднозначный поиск.
    pub fn has_ambiguous_classes(&self) -> bool {
        let primary = self.primary.window_class.to_lowercase();
        let idle = self.idle.window_class.to_lowercase();
        primary.contains(&idle) || idle.contains(&primary)
    }

    pub fn warn_on_ambiguous_classes(&self) {
        if self.has_ambiguous_classes() {
            warn!(
                "Классы окон '{}' и '{}' пересекаются как подстроки - поиск окна может быть неоднозначным",
                self.primary.window_class, self.idle.window_class
            );
        }
    }
}
