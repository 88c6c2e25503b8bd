use crate::error::Result;
use crate::events::WindowHandle;
use crate::services::program::ProgramSpec;
use crate::services::window_tool::DryRunDesktop;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::r#trait::{Launcher, ManagedProcess};

/// Эмулируемый процесс: "живёт", пока его не остановят, и держит окно на DryRunDesktop
pub struct DryRunProcess {
    pid: u32,
    label: String,
    window: Option<WindowHandle>,
    desktop: Arc<DryRunDesktop>,
}

impl DryRunProcess {
    fn terminate(&mut self) {
        if let Some(window) = self.window.take() {
            self.desktop.close_window(&window);
            info!("[DRY RUN] {} (PID: {}) остановлен", self.label, self.pid);
        }
    }
}

#[async_trait::async_trait]
impl ManagedProcess for DryRunProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn is_alive(&mut self) -> bool {
        self.window.is_some()
    }

    async fn stop(&mut self, _graceful_timeout: Duration) {
        self.terminate();
    }

    async fn kill(&mut self) {
        self.terminate();
    }
}

pub struct DryRunLauncher {
    desktop: Arc<DryRunDesktop>,
    next_pid: AtomicU32,
}

impl DryRunLauncher {
    pub fn new(desktop: Arc<DryRunDesktop>) -> Self {
        info!("Dry-run режим - программы не запускаются, окна эмулируются");
        Self {
            desktop,
            next_pid: AtomicU32::new(40_000),
        }
    }
}

#[async_trait::async_trait]
impl Launcher for DryRunLauncher {
    async fn launch(&self, spec: &ProgramSpec) -> Result<Box<dyn ManagedProcess>> {
        let pid = self.next_pid.fetch_add(1, Ordering::Relaxed);
        let window = self.desktop.open_window(&spec.window_class);
        info!(
            "[DRY RUN] {} {:?} {:?} (PID: {}, окно: {})",
            spec.role, spec.interpreter, spec.script, pid, window
        );
        Ok(Box::new(DryRunProcess {
            pid,
            label: spec.role.to_string(),
            window: Some(window),
            desktop: self.desktop.clone(),
        }))
    }

    async fn reap_strays(&self, spec: &ProgramSpec) {
        info!("[DRY RUN] уборка посторонних процессов '{:?}' пропущена", spec.script);
    }
}
