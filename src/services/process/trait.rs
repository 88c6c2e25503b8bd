use crate::config::Config;
use crate::services::program::ProgramSpec;
use crate::services::window_tool::DryRunDesktop;
use crate::utils::DisplayEnv;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// Дескриптор одного дочернего процесса
#[async_trait::async_trait]
pub trait ManagedProcess: Send + Sync {
    fn pid(&self) -> u32;

    /// Неблокирующая проверка; гонка "процесс завершился между проверкой и использованием" не является ошибкой
    fn is_alive(&mut self) -> bool;

    /// SIGTERM, ожидание до `graceful_timeout`, затем SIGKILL всей группе.
    /// Повторный вызов на завершённом процессе ничего не делает.
    async fn stop(&mut self, graceful_timeout: Duration);

    /// Немедленный SIGKILL всей группе процессов
    async fn kill(&mut self);
}

/// Запуск программ и уборка "осиротевших" экземпляров от прошлых запусков
#[async_trait::async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, spec: &ProgramSpec) -> Result<Box<dyn ManagedProcess>>;

    async fn reap_strays(&self, spec: &ProgramSpec);
}

/// Factory function to create an appropriate launcher based on the dry_run flag
pub fn create_launcher(
    config: &Config,
    desktop: Arc<DryRunDesktop>,
    dry_run: bool,
) -> Arc<dyn Launcher> {
    if dry_run {
        Arc::new(super::dry_run::DryRunLauncher::new(desktop))
    } else {
        Arc::new(super::child_process::SystemLauncher::new(
            DisplayEnv::from_config(&config.display),
            config.switching.reap_strays,
        ))
    }
}
