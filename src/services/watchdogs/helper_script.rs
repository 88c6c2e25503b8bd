use crate::error::Result;
use crate::kiosk_error;
use crate::services::process::{ChildProcess, ManagedProcess};
use crate::utils::{DisplayEnv, ShutdownListener};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{error, info};

use super::r#trait::Watchdog;

/// Пауза перед перезапуском завершившегося скрипта
const RELAUNCH_DELAY: Duration = Duration::from_secs(1);

enum ScriptExit {
    Exited,
    Shutdown,
}

/// Вспомогательный скрипт-источник сигнала (мониторинг GPIO).
/// Его вывод пишется в лог супервизора, упавший скрипт перезапускается.
pub struct HelperScriptWatchdog {
    script: PathBuf,
    display: DisplayEnv,
    graceful_stop: Duration,
}

impl HelperScriptWatchdog {
    pub fn new(script: PathBuf, display: DisplayEnv, graceful_stop: Duration) -> Self {
        Self {
            script,
            display,
            graceful_stop,
        }
    }

    fn spawn(&self) -> Result<ChildProcess> {
        if !self.script.exists() {
            return Err(kiosk_error!(launch, "скрипт не найден: {:?}", self.script));
        }

        let mut cmd = Command::new(&self.script);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);
        self.display.apply(&mut cmd);

        let child = cmd
            .spawn()
            .map_err(|e| kiosk_error!(launch, "{:?}: {}", self.script, e))?;
        ChildProcess::adopt(child, "helper-script".to_string())
    }

    /// Читать вывод до завершения скрипта или до остановки супервизора
    async fn supervise(&self, process: &mut ChildProcess, shutdown: &mut ShutdownListener) -> ScriptExit {
        let (stdout, stderr) = process.take_output();
        let mut stdout = stdout.map(|out| BufReader::new(out).lines());
        let mut stderr = stderr.map(|err| BufReader::new(err).lines());

        loop {
            tokio::select! {
                _ = shutdown.stopped() => return ScriptExit::Shutdown,
                status = process.wait() => {
                    match status {
                        Ok(status) => error!("Вспомогательный скрипт завершился ({}), перезапуск", status),
                        Err(e) => error!("Вспомогательный скрипт: ошибка ожидания: {}", e),
                    }
                    return ScriptExit::Exited;
                }
                line = next_line(&mut stdout) => match line {
                    Some(line) => info!("GPIO скрипт: {}", line),
                    None => stdout = None,
                },
                line = next_line(&mut stderr) => match line {
                    Some(line) => error!("GPIO скрипт (ошибка): {}", line),
                    None => stderr = None,
                },
            }
        }
    }
}

/// Следующая строка потока; закрытый поток никогда не готов
async fn next_line<R>(lines: &mut Option<tokio::io::Lines<R>>) -> Option<String>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    match lines {
        Some(reader) => reader.next_line().await.ok().flatten(),
        None => std::future::pending().await,
    }
}

#[async_trait::async_trait]
impl Watchdog for HelperScriptWatchdog {
    fn name(&self) -> &'static str {
        "helper-script"
    }

    async fn run(self: Box<Self>, mut shutdown: ShutdownListener) -> Result<()> {
        while shutdown.is_running() {
            match self.spawn() {
                Ok(mut process) => {
                    info!("Вспомогательный скрипт запущен: {:?} (PID: {})", self.script, process.pid());
                    if let ScriptExit::Shutdown = self.supervise(&mut process, &mut shutdown).await {
                        process.stop(self.graceful_stop).await;
                        info!("Вспомогательный скрипт остановлен");
                        break;
                    }
                }
                Err(e) => error!("Не удалось запустить вспомогательный скрипт: {}", e),
            }

            tokio::select! {
                _ = shutdown.stopped() => break,
                _ = tokio::time::sleep(RELAUNCH_DELAY) => {}
            }
        }
        Ok(())
    }
}
