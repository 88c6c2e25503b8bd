use crate::error::Result;
use crate::kiosk_error;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Внешняя утилита не должна подвешивать супервизор
const TOOL_TIMEOUT: Duration = Duration::from_secs(5);

/// Выполнить утилиту и вернуть stdout; ненулевой код возврата - ошибка
pub async fn run_tool(mut cmd: Command, name: &str) -> Result<String> {
    cmd.kill_on_drop(true);

    let output = match tokio::time::timeout(TOOL_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            debug!("{} не найден или не запустился: {}", name, e);
            return Err(kiosk_error!(tool, "{} не найден: {}", name, e));
        }
        Err(_) => return Err(kiosk_error!(tool, "{} не ответил за {:?}", name, TOOL_TIMEOUT)),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("{} вернул ошибку: {}", name, stderr.trim());
        return Err(kiosk_error!(tool, "{} вернул ошибку: {}", name, stderr.trim()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
