use crate::config::Config;
use crate::error::Result;
use crate::utils::ShutdownListener;
use tracing::{debug, info};

use super::r#trait::Watchdog;

/// Заглушка сторожа ввода: устройства не открываются
pub struct DryRunInputWatchdog {
    deadzone: i32,
    device_paths: Vec<String>,
}

impl DryRunInputWatchdog {
    pub fn new(config: &Config) -> Self {
        info!("Инициализация DryRunInputWatchdog");
        Self {
            deadzone: config.watchdogs.input_deadzone,
            device_paths: config.input.device_paths.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Watchdog for DryRunInputWatchdog {
    fn name(&self) -> &'static str {
        "input"
    }

    async fn run(self: Box<Self>, mut shutdown: ShutdownListener) -> Result<()> {
        info!("Dry-run режим - сторож ввода работает в режиме эмуляции");
        info!(
            "Устройства {:?} не открываются (мёртвая зона {})",
            self.device_paths, self.deadzone
        );

        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(5));
        while shutdown.is_running() {
            tokio::select! {
                _ = shutdown.stopped() => break,
                _ = interval.tick() => debug!("Сторож ввода работает в dry-run режиме"),
            }
        }
        Ok(())
    }
}
