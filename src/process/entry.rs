//! Registry entry: a linked handle plus its cached metrics.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::code::Control;
use super::digest::ProcessRow;
use super::handle::ProcessHandle;
use super::metrics::ProcessMetrics;
use super::os;

/// One tracked process.
pub struct ProcessEntry {
    path: PathBuf,
    handle: Box<dyn ProcessHandle>,
    metrics: RwLock<ProcessMetrics>,
    released: AtomicBool,
    cancel: CancellationToken,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl ProcessEntry {
    pub(crate) fn new(path: PathBuf, handle: Box<dyn ProcessHandle>) -> Self {
        Self {
            path,
            handle,
            metrics: RwLock::new(ProcessMetrics::default()),
            released: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            monitor: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn handle(&self) -> &dyn ProcessHandle {
        self.handle.as_ref()
    }

    pub fn pid(&self) -> i32 {
        self.handle.pid()
    }

    pub fn metrics(&self) -> ProcessMetrics {
        self.metrics.read().clone()
    }

    pub(crate) fn store_metrics(&self, metrics: ProcessMetrics) {
        *self.metrics.write() = metrics;
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub fn is_monitored(&self) -> bool {
        self.monitor.lock().as_ref().is_some_and(|task| !task.is_finished())
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn attach_monitor(&self, task: JoinHandle<()>) {
        *self.monitor.lock() = Some(task);
    }

    pub(crate) fn take_monitor(&self) -> Option<JoinHandle<()>> {
        self.monitor.lock().take()
    }

    pub fn set_control(&self, value: Control) {
        self.handle.set_control(value);
    }

    pub fn signal(&self, signum: i32) -> bool {
        if self.is_released() {
            return false;
        }
        self.handle.signal(signum)
    }

    /// Stop monitoring and release the handle, once.
    ///
    /// Returns `false` when the entry was already released.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.cancel.cancel();
        self.handle.release();
        true
    }

    /// Digest row from cached metrics and live handle fields.
    pub fn row(&self) -> ProcessRow {
        let metrics = self.metrics();
        let pid = self.handle.pid();
        ProcessRow {
            pid,
            name: self.handle.name(),
            cpu: metrics.cpu_percent,
            memory: metrics.rss_bytes,
            cpu_affinity: metrics.cpu_affinity,
            cpu_context_switches: metrics.context_switches,
            thread_count: metrics.thread_count,
            loop_count: self.handle.loop_count(),
            control: self.handle.control(),
            tmux_session: self.handle.tmux_session(),
            loop_stat: self.handle.loop_stat(),
            status_code: self.handle.status_code(),
            message: self.handle.message(),
            description: self.handle.description(),
            creation_time: self.handle.creation_time_nanos(),
            status: if self.is_released() {
                os::STATUS_DEAD.to_string()
            } else {
                os::process_status(pid)
            },
        }
    }
}

impl std::fmt::Debug for ProcessEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessEntry")
            .field("path", &self.path)
            .field("pid", &self.handle.pid())
            .field("released", &self.is_released())
            .finish()
    }
}
