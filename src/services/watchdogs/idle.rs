use crate::config::Config;
use crate::error::Result;
use crate::services::controller::ForegroundSwitch;
use crate::services::program::ProgramRole;
use crate::utils::ShutdownListener;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::info;

use super::r#trait::Watchdog;

/// Переключение в idle после периода бездействия на primary
pub struct IdleWatchdog {
    switch: Arc<dyn ForegroundSwitch>,
    poll: Duration,
    idle_timeout: Duration,
    startup_grace: Duration,
}

impl IdleWatchdog {
    pub fn new(config: &Config, switch: Arc<dyn ForegroundSwitch>) -> Self {
        Self {
            switch,
            poll: config.watchdogs.idle_poll(),
            idle_timeout: config.switching.idle_timeout(),
            startup_grace: config.switching.startup_grace(),
        }
    }

    /// Одна проверка; `true`, если был запрошен переход
    async fn poll_once(&self) -> bool {
        let now = Instant::now();
        let snapshot = self.switch.snapshot();

        if snapshot.current != ProgramRole::Primary
            || !snapshot.startup_grace_elapsed(self.startup_grace, now)
        {
            return false;
        }

        let inactive = snapshot.inactive_for(now);
        if inactive <= self.idle_timeout {
            return false;
        }

        info!("Нет активности {:?}, переключение в idle", inactive);
        self.switch.request_switch(ProgramRole::Idle).await;
        true
    }
}

#[async_trait::async_trait]
impl Watchdog for IdleWatchdog {
    fn name(&self) -> &'static str {
        "idle"
    }

    async fn run(self: Box<Self>, mut shutdown: ShutdownListener) -> Result<()> {
        info!("Сторож бездействия запущен (таймаут {:?})", self.idle_timeout);
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
