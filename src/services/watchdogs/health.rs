use crate::config::Config;
use crate::error::Result;
use crate::services::controller::{ForegroundSwitch, HealthReport};
use crate::services::program::ProgramRole;
use crate::utils::ShutdownListener;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::r#trait::Watchdog;

/// Периодическая проверка primary, пока он на переднем плане
pub struct HealthWatchdog {
    switch: Arc<dyn ForegroundSwitch>,
    poll: Duration,
}

impl HealthWatchdog {
    pub fn new(config: &Config, switch: Arc<dyn ForegroundSwitch>) -> Self {
        Self {
            switch,
            poll: config.watchdogs.health_poll(),
        }
    }

    async fn poll_once(&self) -> Option<HealthReport> {
        if self.switch.snapshot().current != ProgramRole::Primary {
            return None;
        }

        let report = self.switch.check_health().await;
        match report {
            HealthReport::Recovered => info!("primary восстановлен"),
            HealthReport::Down => warn!("primary недоступен"),
            _ => crate::debug_if_enabled!("Проверка primary: {:?}", report),
        }
        Some(report)
    }
}

#[async_trait::async_trait]
impl Watchdog for HealthWatchdog {
    fn name(&self) -> &'static str {
        "health"
    }

    async fn run(self: Box<Self>, mut shutdown: ShutdownListener) -> Result<()> {
        info!("Сторож здоровья primary запущен (каждые {:?})", self.poll);
        let mut interval = tokio::time::interval(self.poll);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while shutdown.is_running() {
            tokio::select! {
                _ = shutdown.stopped() => break,
                _ = interval.tick() => {
                    self.poll_once().await;
                }
            }
        }
        Ok(())
    }
}
