//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use kraken::config::{MonitorConfig, Settings, TrackingConfig};
use kraken::process::{Control, LinkError, ProcessHandle, ProcessLinker};

/// Counters shared between a [`MockLinker`] and the handles it creates.
#[derive(Default)]
pub struct MockStats {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub signals: Mutex<Vec<(PathBuf, i32)>>,
}

pub struct MockHandle {
    path: PathBuf,
    pid: i32,
    control: AtomicI32,
    released: AtomicBool,
    stats: Arc<MockStats>,
}

impl ProcessHandle for MockHandle {
    fn pid(&self) -> i32 {
        self.pid
    }
    fn name(&self) -> String {
        "mock".to_string()
    }
    fn loop_count(&self) -> u64 {
        7
    }
    fn control(&self) -> i32 {
        self.control.load(Ordering::SeqCst)
    }
    fn set_control(&self, value: Control) {
        self.control.store(value.code(), Ordering::SeqCst);
    }
    fn tmux_session(&self) -> String {
        "mock-session".to_string()
    }
    fn loop_stat(&self) -> i32 {
        1
    }
    fn status_code(&self) -> i32 {
        0
    }
    fn message(&self) -> String {
        String::new()
    }
    fn description(&self) -> String {
        "mock process".to_string()
    }
    fn creation_time_nanos(&self) -> u64 {
        1_700_000_000_000_000_000
    }
    fn release(&self) -> bool {
        if self.released.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.stats.released.fetch_add(1, Ordering::SeqCst);
        true
    }
    fn signal(&self, signum: i32) -> bool {
        self.stats.signals.lock().push((self.path.clone(), signum));
        true
    }
}

/// Linker that never touches the OS.
///
/// Every handle reports `pid`; names listed in `reject` fail to link.
pub struct MockLinker {
    pub pid: i32,
    pub reject: Vec<String>,
    pub stats: Arc<MockStats>,
}

impl MockLinker {
    /// Handles with a pid that is never alive, so no monitor runs.
    pub fn unmonitored() -> Self {
        Self::with_pid(-1)
    }

    pub fn with_pid(pid: i32) -> Self {
        Self {
            pid,
            reject: Vec::new(),
            stats: Arc::new(MockStats::default()),
        }
    }

    pub fn rejecting(mut self, name: &str) -> Self {
        self.reject.push(name.to_string());
        self
    }
}

impl ProcessLinker for MockLinker {
    fn acquire(&self, path: &Path) -> Result<Box<dyn ProcessHandle>, LinkError> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if self.reject.iter().any(|r| r == name) || !path.is_file() {
            return Err(LinkError::InvalidFile {
                path: path.to_path_buf(),
            });
        }
        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockHandle {
            path: path.to_path_buf(),
            pid: self.pid,
            control: AtomicI32::new(Control::Running.code()),
            released: AtomicBool::new(false),
            stats: Arc::clone(&self.stats),
        }))
    }
}

/// Tracking settings rooted in `proc_dir` and `share_dir`, no periodic rescans.
pub fn tracking(proc_dir: &Path, share_dir: &Path) -> TrackingConfig {
    TrackingConfig {
        proc_dir: proc_dir.to_path_buf(),
        share_dir: share_dir.to_path_buf(),
        rescan_interval_secs: 0,
        ..TrackingConfig::default()
    }
}

pub fn fast_monitor() -> MonitorConfig {
    MonitorConfig {
        sample_interval_ms: 20,
        reap_interval_ms: 20,
    }
}

pub fn settings(proc_dir: &Path, share_dir: &Path) -> Settings {
    Settings {
        tracking: tracking(proc_dir, share_dir),
        monitor: fast_monitor(),
        ..Settings::default()
    }
}

/// Canonical form of a path, matching what trackers report.
pub fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap()
}

/// Poll `condition` until it holds or `timeout` passes.
pub async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
