use crate::config::{Config, ProgramConfig};
use crate::events::WindowHandle;
use crate::services::process::ManagedProcess;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Роль супервизируемой программы. Других состояний у переднего плана нет.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgramRole {
    /// Интерактивное приложение-чат
    Primary,
    /// Пассивная "заставка"
    Idle,
}

impl fmt::Display for ProgramRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramRole::Primary => write!(f, "primary"),
            ProgramRole::Idle => write!(f, "idle"),
        }
    }
}

/// Неизменяемое описание запуска программы
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSpec {
    pub role: ProgramRole,
    pub interpreter: PathBuf,
    pub script: PathBuf,
    pub window_class: String,
    pub log_file: Option<PathBuf>,
    pub window_timeout: Duration,
}

impl ProgramSpec {
    pub fn from_config(role: ProgramRole, program: &ProgramConfig) -> Self {
        Self {
            role,
            interpreter: program.interpreter.clone(),
            script: program.script.clone(),
            window_class: program.window_class.clone(),
            log_file: program.log_file.clone(),
            window_timeout: program.window_timeout(),
        }
    }
}

/// Программа под надзором контроллера: описание + текущий процесс + счётчик перезапусков
pub struct SupervisedProgram {
    pub spec: ProgramSpec,
    pub process: Option<Box<dyn ManagedProcess>>,
    pub last_pid: Option<u32>,
    pub last_window: Option<WindowHandle>,
    pub restart_count: u32,
    pub max_restarts: Option<u32>,
}

impl SupervisedProgram {
    pub fn new(spec: ProgramSpec, max_restarts: Option<u32>) -> Self {
        Self {
            spec,
            process: None,
            last_pid: None,
            last_window: None,
            restart_count: 0,
            max_restarts,
        }
    }

    pub fn from_config(role: ProgramRole, config: &Config) -> Self {
        let program = config.program(role);
        Self::new(ProgramSpec::from_config(role, program), program.max_restarts)
    }

    pub fn role(&self) -> ProgramRole {
        self.spec.role
    }

    pub fn window_class(&self) -> &str {
        &self.spec.window_class
    }

    pub fn is_alive(&mut self) -> bool {
        self.process.as_mut().map_or(false, |process| process.is_alive())
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().map(|process| process.pid())
    }

    /// Потолок перезапусков достигнут - автоматический перезапуск запрещён
    pub fn restarts_exhausted(&self) -> bool {
        self.max_restarts
            .map_or(false, |max| self.restart_count >= max)
    }

    /// Зафиксировать неудачный цикл запуска. Возвращает `true`, если потолок достигнут.
    pub fn register_failure(&mut self) -> bool {
        self.restart_count += 1;
        self.restarts_exhausted()
    }

    pub fn register_success(&mut self, window: Option<WindowHandle>) {
        self.restart_count = 0;
        self.last_window = window;
    }
}

impl fmt::Debug for SupervisedProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisedProgram")
            .field("role", &self.spec.role)
            .field("pid", &self.pid())
            .field("last_window", &self.last_window)
            .field("restart_count", &self.restart_count)
            .field("max_restarts", &self.max_restarts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(ProgramRole::Primary.to_string(), "primary");
        assert_eq!(ProgramRole::Idle.to_string(), "idle");
    }

    #[test]
    fn test_restart_ceiling() {
        let config = Config::default();
        let mut primary = SupervisedProgram::from_config(ProgramRole::Primary, &config);

        for _ in 0..4 {
            assert!(!primary.register_failure());
        }
        assert!(primary.register_failure());
        assert_eq!(primary.restart_count, 5);
        assert!(primary.restarts_exhausted());

        primary.register_success(Some(WindowHandle::new("0x01")));
        assert_eq!(primary.restart_count, 0);
        assert!(!primary.restarts_exhausted());
    }

    #[test]
    fn test_idle_has_no_ceiling() {
        let config = Config::default();
        let mut idle = SupervisedProgram::from_config(ProgramRole::Idle, &config);

        for _ in 0..50 {
            assert!(!idle.register_failure());
        }
        assert!(!idle.is_alive());
        assert_eq!(idle.pid(), None);
    }
}
