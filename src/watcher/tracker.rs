//! Reconciling file tracker.
//!
//! Two sources feed the tracked set: the OS push stream from `notify`, which is
//! continuous but may drop events, and full scans of the root, which are
//! authoritative. Both go through the same membership map so an event is only
//! emitted for a path that actually changes state.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use walkdir::WalkDir;

use super::classify::{Classifier, FileKind};
use super::error::WatchError;
use super::event::{Notification, TrackerEvent, TrackerMessage, notifications};

/// Paths that changed membership during one scan, sorted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

impl ScanOutcome {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

struct TrackerInner {
    name: &'static str,
    root: PathBuf,
    recursive: bool,
    classifier: Classifier,
    files: tokio::sync::Mutex<HashMap<PathBuf, FileKind>>,
    events: mpsc::Sender<TrackerMessage>,
}

/// Tracks classified files under one root and reports membership changes.
///
/// Events go out over a bounded channel handed back by [`FileTracker::new`];
/// a single consumer is expected to own whatever state mirrors the set.
pub struct FileTracker {
    inner: Arc<TrackerInner>,
    watcher: Mutex<Option<RecommendedWatcher>>,
    rescan_task: Mutex<Option<JoinHandle<()>>>,
    rescan_interval: Option<Duration>,
}

impl FileTracker {
    /// Create a stopped tracker and the receiving end of its event channel.
    pub fn new(
        name: &'static str,
        root: impl AsRef<Path>,
        recursive: bool,
        classifier: Classifier,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<TrackerMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let inner = TrackerInner {
            name,
            root: resolve_root(root.as_ref()),
            recursive,
            classifier,
            files: tokio::sync::Mutex::new(HashMap::new()),
            events: tx,
        };
        let tracker = Self {
            inner: Arc::new(inner),
            watcher: Mutex::new(None),
            rescan_task: Mutex::new(None),
            rescan_interval: None,
        };
        (tracker, rx)
    }

    /// Re-scan the root on this period while started.
    pub fn with_rescan_interval(mut self, interval: Option<Duration>) -> Self {
        self.rescan_interval = interval.filter(|d| !d.is_zero());
        self
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn is_started(&self) -> bool {
        self.watcher.lock().is_some()
    }

    /// Attach the OS listener and run an initial scan.
    ///
    /// Returns `Ok(false)` when already started.
    pub async fn start(&self) -> Result<bool, WatchError> {
        if self.is_started() {
            return Ok(false);
        }

        let inner = Arc::clone(&self.inner);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            inner.on_notify(res);
        })?;

        let mode = if self.inner.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        if let Err(e) = watcher.watch(&self.inner.root, mode) {
            // Periodic scans still pick up files once the root appears
            tracing::warn!(
                "[{}] cannot watch {}: {e}",
                self.inner.name,
                self.inner.root.display()
            );
        }

        {
            let mut slot = self.watcher.lock();
            if slot.is_some() {
                return Ok(false);
            }
            *slot = Some(watcher);
        }

        let outcome = self.inner.scan(true).await?;
        crate::log_event!(
            self.inner.name,
            "tracking",
            "{} ({} files)",
            self.inner.root.display(),
            outcome.added.len()
        );

        if let Some(period) = self.rescan_interval {
            let inner = Arc::clone(&self.inner);
            let task = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    match inner.scan(true).await {
                        Ok(outcome) if !outcome.is_empty() => {
                            crate::debug_event!(
                                inner.name,
                                "rescan",
                                "{} added, {} removed",
                                outcome.added.len(),
                                outcome.removed.len()
                            );
                        }
                        Ok(_) => {}
                        Err(WatchError::ChannelClosed) => break,
                        Err(e) => tracing::warn!("[{}] rescan failed: {e}", inner.name),
                    }
                }
            });
            if let Some(old) = self.rescan_task.lock().replace(task) {
                old.abort();
            }
        }

        Ok(true)
    }

    /// Detach the OS listener and stop periodic scans.
    ///
    /// The tracked set is left as is. Returns `false` when not started.
    pub fn stop(&self) -> bool {
        let watcher = self.watcher.lock().take();
        if let Some(task) = self.rescan_task.lock().take() {
            task.abort();
        }
        match watcher {
            Some(watcher) => {
                drop(watcher);
                crate::log_event!(self.inner.name, "stopped");
                true
            }
            None => false,
        }
    }

    /// Full reconciliation scan of the root.
    ///
    /// With `trigger` unset the tracked set is updated silently.
    pub async fn scan(&self, trigger: bool) -> Result<ScanOutcome, WatchError> {
        self.inner.scan(trigger).await
    }

    /// Resolve once every message sent before this call has been consumed.
    pub async fn barrier(&self) -> Result<(), WatchError> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .events
            .send(TrackerMessage::Barrier(tx))
            .await
            .map_err(|_| WatchError::ChannelClosed)?;
        rx.await.map_err(|_| WatchError::ChannelClosed)
    }

    /// Point-in-time copy of the tracked set.
    pub async fn tracked(&self) -> HashSet<PathBuf> {
        self.inner.files.lock().await.keys().cloned().collect()
    }

    pub async fn is_tracked(&self, path: &Path) -> bool {
        self.inner.files.lock().await.contains_key(path)
    }
}

impl Drop for FileTracker {
    fn drop(&mut self) {
        if let Some(task) = self.rescan_task.get_mut().take() {
            task.abort();
        }
    }
}

impl TrackerInner {
    /// Callback for the notify thread; blocking calls are fine here.
    fn on_notify(&self, res: notify::Result<Event>) {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("[{}] watch error: {e}", self.name);
                return;
            }
        };

        for (notification, path) in notifications(&event) {
            self.apply(notification, path);
        }
    }

    fn apply(&self, notification: Notification, path: &Path) {
        if !self.recursive && path.parent() != Some(self.root.as_path()) {
            return;
        }
        let Some(kind) = self.classifier.classify(path) else {
            return;
        };

        let mut files = self.files.blocking_lock();
        let event = match notification {
            Notification::Created => {
                if files.contains_key(path) || !is_present_file(path) {
                    return;
                }
                files.insert(path.to_path_buf(), kind);
                TrackerEvent::added(path.to_path_buf(), kind)
            }
            Notification::Deleted => match files.remove(path) {
                Some(kind) => TrackerEvent::removed(path.to_path_buf(), kind),
                None => return,
            },
        };

        crate::debug_event!(self.name, "notify", "{:?} {}", event.change, path.display());
        if self.events.blocking_send(TrackerMessage::Event(event)).is_err() {
            crate::debug_event!(self.name, "channel closed");
        }
    }

    async fn scan(self: &Arc<Self>, trigger: bool) -> Result<ScanOutcome, WatchError> {
        // Held across the walk so push notifications cannot interleave with it
        let mut files = self.files.lock().await;

        let inner = Arc::clone(self);
        let present = tokio::task::spawn_blocking(move || inner.walk())
            .await
            .map_err(|e| WatchError::ScanFailed {
                path: self.root.clone(),
                reason: e.to_string(),
            })??;

        self.reconcile(&mut files, present, trigger).await
    }

    /// Classified, non-directory entries currently under the root.
    fn walk(&self) -> Result<HashMap<PathBuf, FileKind>, WatchError> {
        let mut present = HashMap::new();
        let max_depth = if self.recursive { usize::MAX } else { 1 };

        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(max_depth) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    let missing = e
                        .io_error()
                        .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound);
                    if missing {
                        return Ok(present);
                    }
                    return Err(WatchError::ScanFailed {
                        path: self.root.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    // Entries vanishing mid-walk are ordinary churn
                    crate::debug_event!(self.name, "walk", "{e}");
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }
            if let Some(kind) = self.classifier.classify(entry.path()) {
                present.insert(entry.into_path(), kind);
            }
        }

        Ok(present)
    }

    /// Diff `present` against the tracked set and emit the transitions.
    ///
    /// Each candidate is checked against the disk once more, so a path that
    /// changed after the listing was taken keeps its current membership.
    async fn reconcile(
        &self,
        files: &mut HashMap<PathBuf, FileKind>,
        present: HashMap<PathBuf, FileKind>,
        trigger: bool,
    ) -> Result<ScanOutcome, WatchError> {
        let mut removed: Vec<(PathBuf, FileKind)> = files
            .iter()
            .filter(|(path, _)| !present.contains_key(*path) && !is_present_file(path))
            .map(|(path, kind)| (path.clone(), *kind))
            .collect();
        let mut added: Vec<(PathBuf, FileKind)> = present
            .into_iter()
            .filter(|(path, _)| !files.contains_key(path) && is_present_file(path))
            .collect();
        removed.sort();
        added.sort();

        for (path, _) in &removed {
            files.remove(path);
        }
        for (path, kind) in &added {
            files.insert(path.clone(), *kind);
        }

        if trigger {
            let events = removed
                .iter()
                .map(|(path, kind)| TrackerEvent::removed(path.clone(), *kind))
                .chain(
                    added
                        .iter()
                        .map(|(path, kind)| TrackerEvent::added(path.clone(), *kind)),
                );
            for event in events {
                self.events
                    .send(TrackerMessage::Event(event))
                    .await
                    .map_err(|_| WatchError::ChannelClosed)?;
            }
        }

        Ok(ScanOutcome {
            added: added.into_iter().map(|(path, _)| path).collect(),
            removed: removed.into_iter().map(|(path, _)| path).collect(),
        })
    }
}

fn resolve_root(root: &Path) -> PathBuf {
    std::fs::canonicalize(root)
        .or_else(|_| std::path::absolute(root))
        .unwrap_or_else(|_| root.to_path_buf())
}

fn is_present_file(path: &Path) -> bool {
    path.metadata().is_ok_and(|meta| !meta.is_dir())
}
