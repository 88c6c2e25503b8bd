use crate::config::Config;
use crate::error::Result;
use crate::services::controller::ForegroundSwitch;
use crate::services::program::ProgramRole;
use crate::utils::ShutdownListener;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use super::r#trait::Watchdog;

/// Пауза после неудачного удаления файла, чтобы не крутить ошибку каждые 100 мс
const REMOVE_FAILURE_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignalPoll {
    Absent,
    /// Файл удалён; `requested` - был ли запрошен переход в primary
    Consumed { requested: bool },
    RemoveFailed,
}

/// Внешний аппаратный триггер (GPIO) сообщает о себе появлением файла
pub struct SignalFileWatchdog {
    switch: Arc<dyn ForegroundSwitch>,
    path: PathBuf,
    poll: Duration,
    dry_run: bool,
}

impl SignalFileWatchdog {
    pub fn new(config: &Config, switch: Arc<dyn ForegroundSwitch>, dry_run: bool) -> Self {
        Self {
            switch,
            path: config.watchdogs.signal_file.clone(),
            poll: config.watchdogs.signal_poll(),
            dry_run,
        }
    }

    async fn poll_once(&self) -> SignalPoll {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return SignalPoll::Absent;
        }

        info!("Обнаружен файл сигнала {:?}", self.path);

        // Файл удаляется до запроса перехода: один файл - один запрос
        if let Err(e) = remove_signal_file(&self.path, self.dry_run).await {
            error!("Не удалось удалить файл сигнала {:?}: {}", self.path, e);
            return SignalPoll::RemoveFailed;
        }

        self.switch.record_activity();

        if self.switch.snapshot().current != ProgramRole::Idle {
            return SignalPoll::Consumed { requested: false };
        }

        info!("Сигнал GPIO, переключение в primary");
        self.switch.request_switch(ProgramRole::Primary).await;
        SignalPoll::Consumed { requested: true }
    }
}

/// Удалить файл; при отказе в доступе - через `sudo -n rm -f`.
/// Уже удалённый файл считается обработанным.
async fn remove_signal_file(path: &Path, dry_run: bool) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied && !dry_run => {
            warn!("Нет прав на удаление {:?}, пробуем через sudo", path);
            let status = Command::new("sudo")
                .arg("-n")
                .arg("rm")
                .arg("-f")
                .arg(path)
                .kill_on_drop(true)
                .status()
                .await?;
            if status.success() {
                Ok(())
            } else {
                Err(crate::kiosk_error!(permission, "sudo rm завершился с {}", status))
            }
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait::async_trait]
impl Watchdog for SignalFileWatchdog {
    fn name(&self) -> &'static str {
        "signal-file"
    }

    async fn run(self: Box<Self>, mut shutdown: ShutdownListener) -> Result<()> {
        info!("Сторож файла сигнала запущен ({:?}, каждые {:?})", self.path, self.poll);
        let mut interval = tokio::time::interval(self.poll);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while shutdown.is_running() {
            tokio::select! {
                _ = shutdown.stopped() => break,
                _ = interval.tick() => {
                    if self.poll_once().await == SignalPoll::RemoveFailed {
                        tokio::time::sleep(REMOVE_FAILURE_BACKOFF).await;
                    }
                }
            }
        }
        Ok(())
    }
}
