use crate::config::Config;
use crate::error::{KioskError, Result};
use crate::events::{ActivityFilter, ActivityKind};
use crate::services::controller::ForegroundSwitch;
use crate::services::program::ProgramRole;
use crate::utils::ShutdownListener;
use evdev::Device;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::r#trait::Watchdog;

/// Реакция на активность пользователя, общая для всех устройств
pub(super) struct ActivityHandler {
    switch: Arc<dyn ForegroundSwitch>,
    filter: ActivityFilter,
    startup_grace: Duration,
}

impl ActivityHandler {
    pub(super) fn new(config: &Config, switch: Arc<dyn ForegroundSwitch>) -> Self {
        Self {
            switch,
            filter: ActivityFilter::new(config.watchdogs.input_deadzone),
            startup_grace: config.switching.startup_grace(),
        }
    }

    async fn on_event(&self, event: &evdev::InputEvent) -> bool {
        match self.filter.classify_event(event) {
            Some(kind) => self.on_activity(kind).await,
            None => false,
        }
    }

    /// `true`, если был запрошен переход в primary
    async fn on_activity(&self, kind: ActivityKind) -> bool {
        let snapshot = self.switch.snapshot();

        // Устройства при инициализации шлют шум
        if !snapshot.startup_grace_elapsed(self.startup_grace, Instant::now()) {
            crate::trace_if_enabled!("Активность ({}) в период защиты после старта пропущена", kind);
            return false;
        }

        self.switch.record_activity();

        if snapshot.current != ProgramRole::Idle {
            return false;
        }

        info!("Активность пользователя ({}), переключение в primary", kind);
        self.switch.request_switch(ProgramRole::Primary).await;
        true
    }
}

/// Чтение событий со всех найденных устройств ввода, без захвата устройств
pub struct InputWatchdog {
    handler: Arc<ActivityHandler>,
    devices: Vec<PathBuf>,
}

impl InputWatchdog {
    pub fn new(config: &Config, switch: Arc<dyn ForegroundSwitch>, devices: Vec<PathBuf>) -> Self {
        Self {
            handler: Arc::new(ActivityHandler::new(config, switch)),
            devices,
        }
    }

    async fn listen_device(
        path: PathBuf,
        handler: Arc<ActivityHandler>,
        mut shutdown: ShutdownListener,
    ) -> Result<()> {
        let device = Device::open(&path).map_err(|e| {
            KioskError::DeviceNotFound(format!("Не удалось открыть устройство {:?}: {}", path, e))
        })?;
        info!("Слушаем устройство: {} ({:?})", device.name().unwrap_or("Unknown"), path);

        let mut events = device.into_event_stream()?;

        while shutdown.is_running() {
            tokio::select! {
                _ = shutdown.stopped() => break,
                event = events.next_event() => {
                    let event = event?;
                    handler.on_event(&event).await;
                }
            }
        }
        debug!("Чтение устройства {:?} остановлено", path);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Watchdog for InputWatchdog {
    fn name(&self) -> &'static str {
        "input"
    }

    async fn run(self: Box<Self>, shutdown: ShutdownListener) -> Result<()> {
        let Self { handler, devices } = *self;
        info!("Сторож ввода запущен, устройств: {}", devices.len());

        let mut tasks = JoinSet::new();
        for path in devices {
            let handler = handler.clone();
            let listener = shutdown.clone();
            tasks.spawn(async move {
                let result = Self::listen_device(path.clone(), handler, listener).await;
                (path, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((path, Ok(()))) => debug!("Устройство {:?} закрыто", path),
                // Отключённое устройство не останавливает остальные
                Ok((path, Err(e))) => warn!("Устройство {:?} больше не читается: {}", path, e),
                Err(e) => error!("Задача чтения устройства упала: {}", e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSwitch;
    use evdev::{EventType, InputEvent};

    fn handler(switch: Arc<RecordingSwitch>) -> ActivityHandler {
        ActivityHandler::new(&Config::default(), switch)
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_ignored_during_startup_grace() {
        let switch = Arc::new(RecordingSwitch::new(ProgramRole::Idle));
        let handler = handler(switch.clone());

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(!handler.on_activity(ActivityKind::KeyPress).await);
        assert!(switch.requests().is_empty());
        assert_eq!(switch.activity_records(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_press_while_idle_requests_primary() {
        let switch = Arc::new(RecordingSwitch::new(ProgramRole::Idle));
        let handler = handler(switch.clone());
        tokio::time::advance(Duration::from_secs(6)).await;

        let key_down = InputEvent::new(EventType::KEY.0, 30, 1);
        assert!(handler.on_event(&key_down).await);
        assert_eq!(switch.requests(), vec![ProgramRole::Primary]);

        // Уже primary: только обновление активности
        assert!(!handler.on_event(&key_down).await);
        assert_eq!(switch.requests().len(), 1);
        assert_eq!(switch.activity_records(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_and_key_release_are_not_activity() {
        let switch = Arc::new(RecordingSwitch::new(ProgramRole::Idle));
        let handler = handler(switch.clone());
        tokio::time::advance(Duration::from_secs(6)).await;

        let jitter = InputEvent::new(EventType::RELATIVE.0, 0, 3);
        let key_up = InputEvent::new(EventType::KEY.0, 30, 0);
        assert!(!handler.on_event(&jitter).await);
        assert!(!handler.on_event(&key_up).await);
        assert_eq!(switch.activity_records(), 0);

        let swipe = InputEvent::new(EventType::ABSOLUTE.0, 0, 120);
        assert!(handler.on_event(&swipe).await);
    }
}
