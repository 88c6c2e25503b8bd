use crate::config::Config;
use crate::error::Result;
use crate::services::controller::ForegroundSwitch;
use crate::utils::{DeviceFinder, DisplayEnv, ShutdownListener};
use std::sync::Arc;
use tracing::{info, warn};

use super::dry_run::DryRunInputWatchdog;
use super::health::HealthWatchdog;
use super::helper_script::HelperScriptWatchdog;
use super::idle::IdleWatchdog;
use super::input::InputWatchdog;
use super::signal_file::SignalFileWatchdog;

/// Независимый цикл наблюдения за одним условием.
/// Сторож только запрашивает переход через контроллер и сам состояние не меняет.
#[async_trait::async_trait]
pub trait Watchdog: Send {
    fn name(&self) -> &'static str;

    /// Работает до сигнала остановки
    async fn run(self: Box<Self>, shutdown: ShutdownListener) -> Result<()>;
}

/// Factory function to create the watchdog set based on the config and the dry_run flag
pub fn create_watchdogs(
    config: &Config,
    switch: Arc<dyn ForegroundSwitch>,
    display: DisplayEnv,
    dry_run: bool,
) -> Vec<Box<dyn Watchdog>> {
    let mut watchdogs: Vec<Box<dyn Watchdog>> = Vec::new();

    if config.watchdogs.input_enabled {
        if dry_run {
            watchdogs.push(Box::new(DryRunInputWatchdog::new(config)));
        } else {
            match DeviceFinder::find_activity_devices(&config.input.device_paths) {
                Ok(devices) => {
                    watchdogs.push(Box::new(InputWatchdog::new(config, switch.clone(), devices)))
                }
                // Без устройств ввода киоск остаётся управляемым через файл сигнала и таймаут
                Err(e) => warn!("Сторож ввода отключён: {}", e),
            }
        }
    } else {
        info!("Сторож ввода отключён в конфигурации");
    }

    watchdogs.push(Box::new(SignalFileWatchdog::new(config, switch.clone(), dry_run)));
    watchdogs.push(Box::new(IdleWatchdog::new(config, switch.clone())));
    watchdogs.push(Box::new(HealthWatchdog::new(config, switch)));

    if let Some(script) = &config.watchdogs.helper_script {
        if dry_run {
            info!("[DRY RUN] вспомогательный скрипт {:?} не запускается", script);
        } else {
            watchdogs.push(Box::new(HelperScriptWatchdog::new(
                script.clone(),
                display,
                config.switching.graceful_stop(),
            )));
        }
    }

    watchdogs
}
