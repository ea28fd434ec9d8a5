//! Utilities to observe kernel process teardown

use std::time::Duration;

use tokio::time::{sleep, Instant};

/// Error type for wait operations
#[derive(Debug)]
pub enum WaitError {
    Timeout,
}

impl std::fmt::Display for WaitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitError::Timeout => write!(f, "Wait operation timed out"),
        }
    }
}

impl std::error::Error for WaitError {}

/// Check whether a process is alive (signal 0)
pub fn process_alive(pid: u32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

/// Wait for a process to exit
pub async fn wait_for_process_exit(pid: u32, timeout: Duration) -> Result<(), WaitError> {
    let start = Instant::now();

    while start.elapsed() < timeout {
        if !process_alive(pid) {
            return Ok(());
        }
        sleep(Duration::from_millis(50)).await;
    }

    Err(WaitError::Timeout)
}

/// Count live kernel processes whose parent is this process.
/// Reads /proc/<pid>/stat, matching on the comm field.
pub fn count_child_kernels() -> usize {
    let my_pid = std::process::id();
    let mut count = 0;

    let Ok(entries) = std::fs::read_dir("/proc") else {
        return 0;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(pid_str) = name.to_str() else {
            continue;
        };
        if pid_str.parse::<u32>().is_err() {
            continue;
        }
        let Ok(stat) = std::fs::read_to_string(entry.path().join("stat")) else {
            continue;
        };
        if let Some((comm, state, ppid)) = parse_stat(&stat) {
            // A zombie has been killed already, it just awaits reaping
            if comm == "lectern-kernel" && ppid == my_pid && state != "Z" {
                count += 1;
            }
        }
    }
    count
}

/// Parse comm, state, and ppid from /proc/<pid>/stat content.
/// comm is parenthesized and may itself contain spaces or parens.
fn parse_stat(stat: &str) -> Option<(String, String, u32)> {
    let open = stat.find('(')?;
    let close = stat.rfind(')')?;
    let comm = stat[open + 1..close].to_string();
    let rest: Vec<&str> = stat[close + 1..].split_whitespace().collect();
    let state = rest.first()?.to_string();
    let ppid = rest.get(1)?.parse().ok()?;
    Some((comm, state, ppid))
}
