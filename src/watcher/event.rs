//! Events flowing from a tracker to its registry.

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};
use tokio::sync::oneshot;

use super::FileKind;

/// Membership transition of a tracked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Added,
    Removed,
}

/// A path entering or leaving the tracked set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerEvent {
    pub change: Change,
    pub path: PathBuf,
    pub kind: FileKind,
}

impl TrackerEvent {
    pub fn added(path: PathBuf, kind: FileKind) -> Self {
        Self {
            change: Change::Added,
            path,
            kind,
        }
    }

    pub fn removed(path: PathBuf, kind: FileKind) -> Self {
        Self {
            change: Change::Removed,
            path,
            kind,
        }
    }
}

/// Message delivered over the tracker channel.
#[derive(Debug)]
pub enum TrackerMessage {
    Event(TrackerEvent),
    /// Acknowledged by the consumer once every earlier message was applied.
    Barrier(oneshot::Sender<()>),
}

/// Raw notification reduced to create/delete semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Notification {
    Created,
    Deleted,
}

/// Map a notify event onto create/delete notifications.
///
/// Renames count as a delete of the old name and a create of the new one.
/// Backends that cannot tell which side of a rename they saw report
/// `RenameMode::Any`; existence on disk decides those.
pub(crate) fn notifications(event: &Event) -> Vec<(Notification, &Path)> {
    let all = |n: Notification| event.paths.iter().map(move |p| (n, p.as_path()));

    match event.kind {
        EventKind::Create(_) => all(Notification::Created).collect(),
        EventKind::Remove(_) => all(Notification::Deleted).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            all(Notification::Deleted).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => all(Notification::Created).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::with_capacity(2);
            if let Some(from) = event.paths.first() {
                out.push((Notification::Deleted, from.as_path()));
            }
            if let Some(to) = event.paths.get(1) {
                out.push((Notification::Created, to.as_path()));
            }
            out
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                let n = if p.exists() {
                    Notification::Created
                } else {
                    Notification::Deleted
                };
                (n, p.as_path())
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for p in paths {
            event = event.add_path(PathBuf::from(p));
        }
        event
    }

    #[test]
    fn test_create_and_remove() {
        let created = event(EventKind::Create(CreateKind::File), &["/p/proc.1.shm"]);
        assert_eq!(
            notifications(&created),
            vec![(Notification::Created, Path::new("/p/proc.1.shm"))]
        );

        let removed = event(EventKind::Remove(RemoveKind::File), &["/p/proc.1.shm"]);
        assert_eq!(
            notifications(&removed),
            vec![(Notification::Deleted, Path::new("/p/proc.1.shm"))]
        );
    }

    #[test]
    fn test_rename_both_sides() {
        let renamed = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/p/proc.1.tmp", "/p/proc.1.shm"],
        );
        assert_eq!(
            notifications(&renamed),
            vec![
                (Notification::Deleted, Path::new("/p/proc.1.tmp")),
                (Notification::Created, Path::new("/p/proc.1.shm")),
            ]
        );
    }

    #[test]
    fn test_content_changes_ignored() {
        let modified = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/p/proc.1.shm"],
        );
        assert!(notifications(&modified).is_empty());
    }
}
