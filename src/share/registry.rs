//! Share registry: sorted lists of the log and kernel files under the share tree.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::TrackingConfig;
use crate::watcher::{
    Change, Classifier, FileKind, FileTracker, ScanOutcome, TrackerEvent, TrackerMessage,
};

use super::error::ShareError;
use super::reader::read_range;

/// Snapshot of the share tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareDigest {
    pub log_files: Vec<PathBuf>,
    pub kernel_files: Vec<PathBuf>,
}

#[derive(Default)]
struct ShareState {
    log_files: Vec<PathBuf>,
    kernel_files: Vec<PathBuf>,
}

impl ShareState {
    fn list_mut(&mut self, kind: FileKind) -> Option<&mut Vec<PathBuf>> {
        match kind {
            FileKind::Log => Some(&mut self.log_files),
            FileKind::Kernel => Some(&mut self.kernel_files),
            FileKind::ProcessDescriptor => None,
        }
    }

    fn list(&self, kind: FileKind) -> &[PathBuf] {
        match kind {
            FileKind::Log => &self.log_files,
            FileKind::Kernel => &self.kernel_files,
            FileKind::ProcessDescriptor => &[],
        }
    }

    fn apply(&mut self, event: TrackerEvent) {
        let Some(list) = self.list_mut(event.kind) else {
            return;
        };
        match (event.change, list.binary_search(&event.path)) {
            (Change::Added, Err(pos)) => list.insert(pos, event.path),
            (Change::Removed, Ok(pos)) => {
                list.remove(pos);
            }
            _ => {}
        }
    }
}

async fn consume(state: Arc<RwLock<ShareState>>, mut events: mpsc::Receiver<TrackerMessage>) {
    while let Some(message) = events.recv().await {
        match message {
            TrackerMessage::Event(event) => {
                crate::debug_event!(
                    "share",
                    "event",
                    "{:?} {} {}",
                    event.change,
                    event.kind,
                    event.path.display()
                );
                state.write().apply(event);
            }
            TrackerMessage::Barrier(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

/// Registry of the files under the share directory.
///
/// Must be created inside a tokio runtime; the event consumer starts at once.
pub struct ShareRegistry {
    state: Arc<RwLock<ShareState>>,
    tracker: FileTracker,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl ShareRegistry {
    pub fn new(tracking: &TrackingConfig) -> Self {
        let (tracker, events) = FileTracker::new(
            "share",
            &tracking.share_dir,
            true,
            Classifier::share(tracking.log.clone(), tracking.kernel.clone()),
            tracking.event_capacity,
        );
        let tracker = tracker.with_rescan_interval(tracking.rescan_interval());

        let state = Arc::new(RwLock::new(ShareState::default()));
        let consumer = tokio::spawn(consume(Arc::clone(&state), events));

        Self {
            state,
            tracker,
            consumer: Mutex::new(Some(consumer)),
        }
    }

    pub fn root(&self) -> &Path {
        self.tracker.root()
    }

    pub async fn start_tracking(&self) -> Result<bool, ShareError> {
        Ok(self.tracker.start().await?)
    }

    pub fn stop_tracking(&self) -> bool {
        self.tracker.stop()
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker.is_started()
    }

    /// Full scan followed by a barrier.
    pub async fn rescan(&self) -> Result<ScanOutcome, ShareError> {
        let outcome = self.tracker.scan(true).await?;
        self.tracker.barrier().await?;
        Ok(outcome)
    }

    pub async fn barrier(&self) -> Result<(), ShareError> {
        Ok(self.tracker.barrier().await?)
    }

    pub async fn list_tracked_paths(&self) -> HashSet<PathBuf> {
        self.tracker.tracked().await
    }

    pub fn generate_digest(&self) -> ShareDigest {
        let state = self.state.read();
        ShareDigest {
            log_files: state.log_files.clone(),
            kernel_files: state.kernel_files.clone(),
        }
    }

    fn ensure_tracked(&self, path: &Path, kind: FileKind) -> Result<(), ShareError> {
        let state = self.state.read();
        if state.list(kind).binary_search_by(|p| p.as_path().cmp(path)).is_ok() {
            Ok(())
        } else {
            Err(ShareError::NotTracked {
                path: path.to_path_buf(),
                kind: match kind {
                    FileKind::Log => "log",
                    FileKind::Kernel => "kernel",
                    FileKind::ProcessDescriptor => "process",
                },
            })
        }
    }

    /// Bytes `[from, to)` of a tracked log file; see [`read_range`] for clamping.
    pub async fn read_log(
        &self,
        path: &Path,
        from: u64,
        to: Option<u64>,
    ) -> Result<Vec<u8>, ShareError> {
        self.ensure_tracked(path, FileKind::Log)?;
        read_range(path, from, to)
            .await
            .map_err(|source| ShareError::Read {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Full contents of a tracked kernel connection file.
    pub async fn read_kernel_info(&self, path: &Path) -> Result<Vec<u8>, ShareError> {
        self.ensure_tracked(path, FileKind::Kernel)?;
        tokio::fs::read(path)
            .await
            .map_err(|source| ShareError::Read {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Stop tracking, drain pending events and stop the consumer.
    pub async fn dispose(&self) {
        self.tracker.stop();
        let consumer = self.consumer.lock().take();
        if let Some(consumer) = consumer {
            if let Err(e) = self.tracker.barrier().await {
                crate::debug_event!("share", "dispose", "{e}");
            }
            consumer.abort();
            let _ = consumer.await;
        }
        crate::log_event!("share", "disposed");
    }
}

impl Drop for ShareRegistry {
    fn drop(&mut self) {
        if let Some(consumer) = self.consumer.get_mut().take() {
            consumer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_keeps_lists_sorted() {
        let mut state = ShareState::default();
        state.apply(TrackerEvent::added(PathBuf::from("/s/log.b.txt"), FileKind::Log));
        state.apply(TrackerEvent::added(PathBuf::from("/s/log.a.txt"), FileKind::Log));
        state.apply(TrackerEvent::added(
            PathBuf::from("/s/kernel.a.json"),
            FileKind::Kernel,
        ));
        // duplicate add is ignored
        state.apply(TrackerEvent::added(PathBuf::from("/s/log.a.txt"), FileKind::Log));

        assert_eq!(
            state.log_files,
            vec![PathBuf::from("/s/log.a.txt"), PathBuf::from("/s/log.b.txt")]
        );
        assert_eq!(state.kernel_files, vec![PathBuf::from("/s/kernel.a.json")]);

        state.apply(TrackerEvent::removed(PathBuf::from("/s/log.a.txt"), FileKind::Log));
        state.apply(TrackerEvent::removed(PathBuf::from("/s/log.zz.txt"), FileKind::Log));
        assert_eq!(state.log_files, vec![PathBuf::from("/s/log.b.txt")]);
    }
}
