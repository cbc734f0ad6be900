//! OS-level process queries: liveness, scheduler state and signals.

#[cfg(target_os = "linux")]
use super::metrics::parse_proc_status;

/// Status reported for a process that can no longer be found.
pub const STATUS_DEAD: &str = "dead";

/// Whether `pid` names a running, non-zombie process.
#[cfg(unix)]
pub fn process_alive(pid: i32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    if pid <= 0 {
        return false;
    }
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => process_status(pid) != "zombie",
        // Exists but belongs to someone else
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
pub fn process_alive(pid: i32) -> bool {
    use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

    let Ok(raw) = u32::try_from(pid) else {
        return false;
    };
    let pid = Pid::from_u32(raw);
    let mut sys = System::new();
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing(),
    );
    sys.process(pid).is_some()
}

/// Scheduler state of `pid` (`running`, `sleeping`, ...), [`STATUS_DEAD`] on failure.
#[cfg(target_os = "linux")]
pub fn process_status(pid: i32) -> String {
    if pid <= 0 {
        return STATUS_DEAD.to_string();
    }
    std::fs::read_to_string(format!("/proc/{pid}/status"))
        .ok()
        .and_then(|content| parse_proc_status(&content).state)
        .map(|state| state_name(state).to_string())
        .unwrap_or_else(|| STATUS_DEAD.to_string())
}

#[cfg(not(target_os = "linux"))]
pub fn process_status(pid: i32) -> String {
    use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

    let Ok(raw) = u32::try_from(pid) else {
        return STATUS_DEAD.to_string();
    };
    let pid = Pid::from_u32(raw);
    let mut sys = System::new();
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing(),
    );
    sys.process(pid)
        .map(|p| p.status().to_string().to_lowercase())
        .unwrap_or_else(|| STATUS_DEAD.to_string())
}

/// Map a `/proc/<pid>/status` state letter to its name.
pub fn state_name(state: char) -> &'static str {
    match state {
        'R' => "running",
        'S' => "sleeping",
        'D' => "disk-sleep",
        'T' => "stopped",
        't' => "tracing-stop",
        'Z' => "zombie",
        'X' | 'x' => "dead",
        'I' => "idle",
        'W' => "waking",
        'P' => "parked",
        'K' => "wake-kill",
        _ => "unknown",
    }
}

/// Send `signum` to `pid`.
#[cfg(unix)]
pub fn send_signal(pid: i32, signum: i32) -> bool {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    if pid <= 0 {
        return false;
    }
    let signal = if signum == 0 {
        None
    } else {
        match Signal::try_from(signum) {
            Ok(signal) => Some(signal),
            Err(e) => {
                tracing::debug!("[process] invalid signal {signum}: {e}");
                return false;
            }
        }
    };
    match kill(Pid::from_raw(pid), signal) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("[process] signal {signum} to {pid} failed: {e}");
            false
        }
    }
}

#[cfg(not(unix))]
pub fn send_signal(pid: i32, signum: i32) -> bool {
    tracing::debug!("[process] signal {signum} to {pid} unsupported on this platform");
    false
}
