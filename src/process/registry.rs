//! Process registry.
//!
//! Mirrors the descriptor files tracked under the process directory as linked
//! [`ProcessEntry`] values. A single consumer task applies tracker events, so
//! handle acquisition never runs under the registry lock.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{MonitorConfig, TrackingConfig};
use crate::watcher::{Change, Classifier, FileTracker, ScanOutcome, TrackerMessage};

use super::code::Control;
use super::digest::ProcessDigest;
use super::entry::ProcessEntry;
use super::error::ProcessError;
use super::handle::ProcessLinker;
use super::monitor;
use super::os;

#[derive(Default)]
struct RegistryState {
    entries: HashMap<PathBuf, Arc<ProcessEntry>>,
    /// Sorted; always equal to the key set of `entries`.
    index: Vec<PathBuf>,
}

impl RegistryState {
    fn insert(&mut self, path: PathBuf, entry: Arc<ProcessEntry>) {
        if let Err(pos) = self.index.binary_search(&path) {
            self.index.insert(pos, path.clone());
        }
        self.entries.insert(path, entry);
    }

    fn remove(&mut self, path: &Path) -> Option<Arc<ProcessEntry>> {
        let entry = self.entries.remove(path)?;
        if let Ok(pos) = self.index.binary_search_by(|p| p.as_path().cmp(path)) {
            self.index.remove(pos);
        }
        Some(entry)
    }
}

pub(crate) struct RegistryCore {
    linker: Arc<dyn ProcessLinker>,
    monitor: MonitorConfig,
    state: RwLock<RegistryState>,
}

impl RegistryCore {
    async fn link(self: &Arc<Self>, path: PathBuf) {
        if self.state.read().entries.contains_key(&path) {
            return;
        }

        let linker = Arc::clone(&self.linker);
        let target = path.clone();
        let handle = match tokio::task::spawn_blocking(move || linker.acquire(&target)).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                tracing::warn!("[process] {e}");
                return;
            }
            Err(e) => {
                tracing::error!("[process] link task failed for {}: {e}", path.display());
                return;
            }
        };

        let entry = Arc::new(ProcessEntry::new(path.clone(), handle));
        let pid = entry.pid();
        self.state.write().insert(path.clone(), Arc::clone(&entry));

        if os::process_alive(pid) {
            let task = monitor::spawn(Arc::clone(&entry), Arc::downgrade(self), &self.monitor);
            entry.attach_monitor(task);
        } else {
            crate::debug_event!("process", "not monitored", "pid {pid} is not running");
        }
        crate::log_event!("process", "added", "{} (pid {pid})", path.display());
    }

    fn unlink(&self, path: &Path) {
        let entry = self.state.write().remove(path);
        if let Some(entry) = entry {
            entry.release();
            crate::log_event!("process", "removed", "{}", path.display());
        }
    }

    /// Remove `entry` if it is still the one registered under its path, then release it.
    pub(crate) fn detach(&self, entry: &Arc<ProcessEntry>) {
        {
            let mut state = self.state.write();
            let current = state
                .entries
                .get(entry.path())
                .is_some_and(|e| Arc::ptr_eq(e, entry));
            if current {
                state.remove(entry.path());
            }
        }
        entry.release();
    }

    fn get(&self, path: &Path) -> Option<Arc<ProcessEntry>> {
        self.state.read().entries.get(path).cloned()
    }
}

async fn consume(core: Arc<RegistryCore>, mut events: mpsc::Receiver<TrackerMessage>) {
    while let Some(message) = events.recv().await {
        match message {
            TrackerMessage::Event(event) => match event.change {
                Change::Added => core.link(event.path).await,
                Change::Removed => core.unlink(&event.path),
            },
            TrackerMessage::Barrier(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

/// Registry of linked processes under the process directory.
///
/// Must be created inside a tokio runtime; the event consumer starts at once.
pub struct ProcessRegistry {
    core: Arc<RegistryCore>,
    tracker: FileTracker,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl ProcessRegistry {
    pub fn new(
        tracking: &TrackingConfig,
        monitor: &MonitorConfig,
        linker: Arc<dyn ProcessLinker>,
    ) -> Self {
        let (tracker, events) = FileTracker::new(
            "process",
            &tracking.proc_dir,
            false,
            Classifier::process(tracking.process.clone()),
            tracking.event_capacity,
        );
        let tracker = tracker.with_rescan_interval(tracking.rescan_interval());

        let core = Arc::new(RegistryCore {
            linker,
            monitor: monitor.clone(),
            state: RwLock::new(RegistryState::default()),
        });
        let consumer = tokio::spawn(consume(Arc::clone(&core), events));

        Self {
            core,
            tracker,
            consumer: Mutex::new(Some(consumer)),
        }
    }

    pub fn root(&self) -> &Path {
        self.tracker.root()
    }

    pub async fn start_tracking(&self) -> Result<bool, ProcessError> {
        Ok(self.tracker.start().await?)
    }

    pub fn stop_tracking(&self) -> bool {
        self.tracker.stop()
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker.is_started()
    }

    /// Full scan followed by a barrier, so the registry reflects the disk on return.
    pub async fn rescan(&self) -> Result<ScanOutcome, ProcessError> {
        let outcome = self.tracker.scan(true).await?;
        self.tracker.barrier().await?;
        Ok(outcome)
    }

    /// Wait until every event emitted so far has been applied.
    pub async fn barrier(&self) -> Result<(), ProcessError> {
        Ok(self.tracker.barrier().await?)
    }

    /// Point-in-time copy of the tracked descriptor set.
    pub async fn list_tracked_paths(&self) -> HashSet<PathBuf> {
        self.tracker.tracked().await
    }

    pub fn len(&self) -> usize {
        self.core.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.core.state.read().entries.contains_key(path)
    }

    pub fn entry(&self, path: &Path) -> Option<Arc<ProcessEntry>> {
        self.core.get(path)
    }

    /// Sorted paths of linked entries.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.core.state.read().index.clone()
    }

    /// Release the entry for `path` and delete its descriptor.
    ///
    /// The entry is released even when deletion fails; `Ok(false)` reports
    /// the failed deletion.
    pub async fn remove_tracked_file(&self, path: &Path) -> Result<bool, ProcessError> {
        let entry = self.core.state.write().remove(path);
        let Some(entry) = entry else {
            return Err(ProcessError::NotTracked {
                path: path.to_path_buf(),
            });
        };
        entry.release();

        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                crate::log_event!("process", "deleted", "{}", path.display());
                Ok(true)
            }
            Err(e) => {
                tracing::warn!("[process] cannot delete {}: {e}", path.display());
                Ok(false)
            }
        }
    }

    /// Set the control word of every listed process that is present.
    ///
    /// Always returns `true`: missing paths are logged and skipped.
    pub fn control(&self, paths: &[PathBuf], value: Control) -> bool {
        for path in paths {
            match self.core.get(path) {
                Some(entry) => {
                    entry.set_control(value);
                    crate::debug_event!("process", "control", "{} -> {value}", path.display());
                }
                None => tracing::warn!("[process] control {value}: not tracked {}", path.display()),
            }
        }
        true
    }

    pub fn run(&self, paths: &[PathBuf]) -> bool {
        self.control(paths, Control::Running)
    }

    pub fn step(&self, paths: &[PathBuf]) -> bool {
        self.control(paths, Control::Step)
    }

    pub fn pause(&self, paths: &[PathBuf]) -> bool {
        self.control(paths, Control::Paused)
    }

    pub fn no_compute(&self, paths: &[PathBuf]) -> bool {
        self.control(paths, Control::NoCompute)
    }

    pub fn exit(&self, paths: &[PathBuf]) -> bool {
        self.control(paths, Control::Exit)
    }

    /// Deliver `signum` to each listed process; one result per path.
    pub fn signal(&self, signum: i32, paths: &[PathBuf]) -> Vec<bool> {
        paths
            .iter()
            .map(|path| match self.core.get(path) {
                Some(entry) => {
                    crate::debug_event!("process", "signal", "{signum} -> {}", path.display());
                    entry.signal(signum)
                }
                None => false,
            })
            .collect()
    }

    /// Snapshot of every linked process.
    ///
    /// Entries removed while the snapshot is built are left out of both the
    /// index and the data.
    pub fn generate_digest(&self) -> ProcessDigest {
        let started = std::time::Instant::now();
        let index = self.paths();
        let rows = index
            .into_iter()
            .filter_map(|path| self.core.get(&path).map(|entry| (path, entry.row())));
        let digest = ProcessDigest::from_rows(rows);

        crate::debug_event!(
            "process",
            "digest",
            "{} rows in {:?}",
            digest.len(),
            started.elapsed()
        );
        digest
    }

    pub fn move_to_other_cpuset(&self, _paths: &[PathBuf]) -> Result<bool, ProcessError> {
        Err(ProcessError::Unsupported {
            operation: "move_to_other_cpuset",
        })
    }

    pub fn move_to_same_cpuset(&self, _paths: &[PathBuf]) -> Result<bool, ProcessError> {
        Err(ProcessError::Unsupported {
            operation: "move_to_same_cpuset",
        })
    }

    pub fn set_iteration_time_limit(&self, _paths: &[PathBuf]) -> Result<bool, ProcessError> {
        Err(ProcessError::Unsupported {
            operation: "set_iteration_time_limit",
        })
    }

    pub fn set_execution_time_limit(&self, _paths: &[PathBuf]) -> Result<bool, ProcessError> {
        Err(ProcessError::Unsupported {
            operation: "set_execution_time_limit",
        })
    }

    pub fn read_message(&self, _paths: &[PathBuf]) -> Result<String, ProcessError> {
        Err(ProcessError::Unsupported {
            operation: "read_message",
        })
    }

    /// Ordered shutdown: stop tracking, drain pending events, release every
    /// handle, then wait for all monitor tasks.
    pub async fn dispose(&self) {
        self.tracker.stop();

        let consumer = self.consumer.lock().take();
        if let Some(consumer) = consumer {
            if let Err(e) = self.tracker.barrier().await {
                crate::debug_event!("process", "dispose", "{e}");
            }
            consumer.abort();
            let _ = consumer.await;
        }

        let entries: Vec<Arc<ProcessEntry>> = {
            let mut state = self.core.state.write();
            state.index.clear();
            state.entries.drain().map(|(_, entry)| entry).collect()
        };

        let mut monitors = Vec::new();
        for entry in &entries {
            entry.release();
            if let Some(task) = entry.take_monitor() {
                monitors.push(task);
            }
        }
        for task in monitors {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::warn!("[process] monitor task failed: {e}");
                }
            }
        }

        crate::log_event!("process", "disposed", "{} handles released", entries.len());
    }
}

impl Drop for ProcessRegistry {
    fn drop(&mut self) {
        if let Some(consumer) = self.consumer.get_mut().take() {
            consumer.abort();
        }
    }
}
