use std::fs;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use super::child_process::send_signal;

/// Сколько ждём штатного завершения постороннего процесса до SIGKILL
pub const STRAY_GRACE: Duration = Duration::from_secs(2);

/// Найти PID процессов, в командной строке которых есть `pattern` (кроме нашего собственного)
pub fn find_matching(proc_root: &Path, pattern: &str) -> Vec<u32> {
    let own_pid = std::process::id();
    let Ok(entries) = fs::read_dir(proc_root) else {
        debug!("Нет доступа к {:?}", proc_root);
        return Vec::new();
    };

    let mut pids = Vec::new();
    for entry in entries.flatten() {
        let Some(pid) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<u32>().ok())
        else {
            continue;
        };
        if pid == own_pid {
            continue;
        }

        // Процесс мог исчезнуть между read_dir и чтением cmdline
        let Ok(raw) = fs::read(entry.path().join("cmdline")) else {
            continue;
        };
        let matches = raw
            .split(|byte| *byte == 0)
            .filter(|arg| !arg.is_empty())
            .any(|arg| String::from_utf8_lossy(arg).contains(pattern));
        if matches {
            pids.push(pid);
        }
    }

    pids.sort_unstable();
    pids
}

/// SIGTERM всем совпавшим процессам, ожидание до `grace`, затем SIGKILL оставшимся.
/// Возвращает число процессов, которым был отправлен сигнал.
pub async fn terminate_matching(pattern: &str, grace: Duration) -> usize {
    let pids = find_matching(Path::new("/proc"), pattern);
    if pids.is_empty() {
        return 0;
    }

    for pid in &pids {
        info!("Завершаем посторонний процесс '{}' (PID: {})", pattern, pid);
        if let Err(e) = send_signal(*pid, libc::SIGTERM) {
            debug!("SIGTERM для PID {}: {}", pid, e);
        }
    }

    let deadline = Instant::now() + grace;
    let mut remaining = pids.clone();
    while !remaining.is_empty() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
        remaining.retain(|pid| send_signal(*pid, 0).is_ok() && !is_zombie(*pid));
    }

    for pid in remaining {
        debug!("PID {} не завершился за {:?}, SIGKILL", pid, grace);
        let _ = send_signal(pid, libc::SIGKILL);
    }

    pids.len()
}

fn is_zombie(pid: u32) -> bool {
    fs::read_to_string(format!("/proc/{}/stat", pid))
        .ok()
        .and_then(|stat| {
            // Формат: pid (comm) state ...; comm может содержать пробелы и скобки
            let after_comm = stat.rsplit_once(')')?.1;
            after_comm.split_whitespace().next().map(|state| state == "Z")
        })
        .unwrap_or(false)
}
