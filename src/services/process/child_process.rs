use crate::error::Result;
use crate::kiosk_error;
use crate::services::program::ProgramSpec;
use crate::utils::DisplayEnv;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, info, warn};

use super::reaper;
use super::r#trait::{Launcher, ManagedProcess};

/// Сколько ждём завершения после SIGKILL, чтобы забрать статус процесса
const REAP_TIMEOUT: Duration = Duration::from_secs(1);

pub(crate) fn send_signal(pid: u32, signal: libc::c_int) -> std::io::Result<()> {
    let rc = unsafe { libc::kill(pid as libc::pid_t, signal) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

pub(crate) fn signal_group(pgid: u32, signal: libc::c_int) -> std::io::Result<()> {
    let rc = unsafe { libc::killpg(pgid as libc::pid_t, signal) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

/// Дочерний процесс в собственной группе процессов (pgid == pid)
pub struct ChildProcess {
    child: Child,
    pid: u32,
    label: String,
}

impl ChildProcess {
    pub fn spawn(spec: &ProgramSpec, display: &DisplayEnv) -> Result<Self> {
        if !spec.script.exists() {
            return Err(kiosk_error!(launch, "скрипт не найден: {:?}", spec.script));
        }

        let (stdout, stderr) = match &spec.log_file {
            Some(path) => Self::open_log_sink(path, &spec.role.to_string())?,
            None => (Stdio::null(), Stdio::null()),
        };

        let mut cmd = Command::new(&spec.interpreter);
        cmd.arg(&spec.script)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .process_group(0);
        display.apply(&mut cmd);

        let child = cmd.spawn().map_err(|e| {
            kiosk_error!(launch, "{:?} {:?}: {}", spec.interpreter, spec.script, e)
        })?;

        Self::adopt(child, spec.role.to_string())
    }

    /// Взять под управление уже запущенный процесс (лидер своей группы)
    pub(crate) fn adopt(child: Child, label: String) -> Result<Self> {
        let pid = child
            .id()
            .ok_or_else(|| kiosk_error!(launch, "процесс {} завершился сразу после запуска", label))?;

        Ok(Self { child, pid, label })
    }

    /// Забрать перенаправленные потоки вывода (если они `piped`)
    pub(crate) fn take_output(&mut self) -> (Option<ChildStdout>, Option<ChildStderr>) {
        (self.child.stdout.take(), self.child.stderr.take())
    }

    pub(crate) async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Дописать баннер запуска в лог и вернуть его как stdout/stderr процесса
    fn open_log_sink(path: &Path, label: &str) -> Result<(Stdio, Stdio)> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(
            file,
            "\n===== {} start {} =====",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            label
        )?;
        let stderr = file.try_clone()?;
        Ok((Stdio::from(file), Stdio::from(stderr)))
    }

    async fn reap(&mut self) {
        if tokio::time::timeout(REAP_TIMEOUT, self.child.wait()).await.is_err() {
            warn!("Процесс {} (PID: {}) не завершился после SIGKILL", self.label, self.pid);
        }
    }
}

#[async_trait::async_trait]
impl ManagedProcess for ChildProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn is_alive(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(None) => send_signal(self.pid, 0).is_ok(),
            Ok(Some(status)) => {
                debug!("Процесс {} (PID: {}) завершился: {}", self.label, self.pid, status);
                false
            }
            Err(e) => {
                debug!("Не удалось проверить процесс {} (PID: {}): {}", self.label, self.pid, e);
                false
            }
        }
    }

    async fn stop(&mut self, graceful_timeout: Duration) {
        if !self.is_alive() {
            return;
        }

        info!("Останавливаем {} (PID: {})", self.label, self.pid);
        if let Err(e) = send_signal(self.pid, libc::SIGTERM) {
            debug!("SIGTERM для PID {} не доставлен: {}", self.pid, e);
        }

        match tokio::time::timeout(graceful_timeout, self.child.wait()).await {
            Ok(_) => info!("{} (PID: {}) завершился штатно", self.label, self.pid),
            Err(_) => {
                warn!(
                    "{} (PID: {}) не завершился за {:?}, SIGKILL группе",
                    self.label, self.pid, graceful_timeout
                );
                self.kill().await;
            }
        }
    }

    async fn kill(&mut self) {
        // Группу добиваем даже если лидер уже мёртв - могли остаться потомки
        if let Err(e) = signal_group(self.pid, libc::SIGKILL) {
            debug!("killpg({}) : {}", self.pid, e);
        }
        let _ = self.child.start_kill();
        self.reap().await;
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            debug!("Дескриптор {} (PID: {}) освобождён, процесс продолжает работу", self.label, self.pid);
        }
    }
}

/// Реальный запуск через `interpreter script`
pub struct SystemLauncher {
    display: DisplayEnv,
    reap_strays: bool,
}

impl SystemLauncher {
    pub fn new(display: DisplayEnv, reap_strays: bool) -> Self {
        Self { display, reap_strays }
    }
}

#[async_trait::async_trait]
impl Launcher for SystemLauncher {
    async fn launch(&self, spec: &ProgramSpec) -> Result<Box<dyn ManagedProcess>> {
        let process = ChildProcess::spawn(spec, &self.display)?;
        info!("{} запущен (PID: {})", spec.role, process.pid());
        Ok(Box::new(process))
    }

    async fn reap_strays(&self, spec: &ProgramSpec) {
        if !self.reap_strays {
            return;
        }
        let pattern = spec.script.to_string_lossy().into_owned();
        let killed = reaper::terminate_matching(&pattern, reaper::STRAY_GRACE).await;
        if killed > 0 {
            info!("Завершено {} посторонних процессов '{}'", killed, pattern);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::program::ProgramRole;
    use std::path::PathBuf;

    fn shell_spec(dir: &tempfile::TempDir, body: &str, log_file: Option<PathBuf>) -> ProgramSpec {
        let script = dir.path().join("app.sh");
        std::fs::write(&script, body).unwrap();
        ProgramSpec {
            role: ProgramRole::Primary,
            interpreter: PathBuf::from("/bin/sh"),
            script,
            window_class: "app.sh".to_string(),
            log_file,
            window_timeout: Duration::from_secs(20),
        }
    }

    #[tokio::test]
    async fn test_spawn_stop_and_idempotent_stop() {
        let dir = tempfile::tempdir().unwrap();
        let spec = shell_spec(&dir, "sleep 30\n", None);

        let mut process = ChildProcess::spawn(&spec, &DisplayEnv::default()).unwrap();
        assert!(process.is_alive());

        process.stop(Duration::from_secs(2)).await;
        assert!(!process.is_alive());

        // Повторная остановка - no-op
        process.stop(Duration::from_secs(2)).await;
        assert!(!process.is_alive());
    }

    #[tokio::test]
    async fn test_stop_escalates_to_kill_when_term_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let spec = shell_spec(&dir, "trap '' TERM\nwhile true; do sleep 1; done\n", None);

        let mut process = ChildProcess::spawn(&spec, &DisplayEnv::default()).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        process.stop(Duration::from_millis(300)).await;
        assert!(!process.is_alive());
    }

    #[tokio::test]
    async fn test_detects_natural_exit() {
        let dir = tempfile::tempdir().unwrap();
        let spec = shell_spec(&dir, "exit 0\n", None);

        let mut process = ChildProcess::spawn(&spec, &DisplayEnv::default()).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!process.is_alive());
    }

    #[tokio::test]
    async fn test_missing_script_is_launch_error() {
        let spec = ProgramSpec {
            role: ProgramRole::Idle,
            interpreter: PathBuf::from("/bin/sh"),
            script: PathBuf::from("/definitely/not/here.py"),
            window_class: "here.py".to_string(),
            log_file: None,
            window_timeout: Duration::from_secs(5),
        };

        let result = ChildProcess::spawn(&spec, &DisplayEnv::default());
        assert!(matches!(result, Err(crate::error::KioskError::Launch(_))));
    }

    #[tokio::test]
    async fn test_log_sink_gets_banner_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("primary.log");
        let spec = shell_spec(&dir, "echo hello-from-app\n", Some(log.clone()));

        let mut process = ChildProcess::spawn(&spec, &DisplayEnv::default()).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        process.kill().await;

        let contents = std::fs::read_to_string(&log).unwrap();
        assert!(contents.contains("start primary"));
        assert!(contents.contains("hello-from-app"));
    }
}
