//! Descriptor-file linker.
//!
//! Descriptor names follow `proc.<name>.<pid>.shm` or `proc.<pid>.shm`. The
//! handle keeps the control word in process memory; the descriptor itself is
//! never written.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::watcher::FilePattern;

use super::code::Control;
use super::error::LinkError;
use super::handle::{ProcessHandle, ProcessLinker};

/// Links descriptors found by name in a flat directory.
#[derive(Debug, Clone)]
pub struct ProcFileLinker {
    pattern: FilePattern,
}

impl ProcFileLinker {
    pub fn new(pattern: FilePattern) -> Self {
        Self { pattern }
    }
}

impl ProcessLinker for ProcFileLinker {
    fn acquire(&self, path: &Path) -> Result<Box<dyn ProcessHandle>, LinkError> {
        let invalid = || LinkError::InvalidFile {
            path: path.to_path_buf(),
        };

        let rest = self.pattern.strip(path).ok_or_else(invalid)?;
        let metadata = std::fs::metadata(path).map_err(|_| invalid())?;
        if !metadata.is_file() {
            return Err(invalid());
        }

        let (name, pid) = match rest.rsplit_once('.') {
            Some((name, pid)) => (name, pid),
            None => ("", rest),
        };
        let pid: i32 = pid.parse().map_err(|_| LinkError::Link {
            path: path.to_path_buf(),
            reason: format!("no pid in descriptor name '{rest}'"),
        })?;
        let name = if name.is_empty() { rest } else { name };

        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or(SystemTime::now());
        let creation_time_nanos = created
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0);

        crate::debug_event!("process", "linked", "{} (pid {pid})", path.display());
        Ok(Box::new(ProcFileHandle {
            path: path.to_path_buf(),
            pid,
            name: name.to_string(),
            creation_time_nanos,
            control: AtomicI32::new(Control::Running.code()),
            released: AtomicBool::new(false),
        }))
    }
}

/// Handle produced by [`ProcFileLinker`].
#[derive(Debug)]
pub struct ProcFileHandle {
    path: PathBuf,
    pid: i32,
    name: String,
    creation_time_nanos: u64,
    control: AtomicI32,
    released: AtomicBool,
}

impl ProcessHandle for ProcFileHandle {
    fn pid(&self) -> i32 {
        self.pid
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn loop_count(&self) -> u64 {
        0
    }

    fn control(&self) -> i32 {
        self.control.load(Ordering::Acquire)
    }

    fn set_control(&self, value: Control) {
        self.control.store(value.code(), Ordering::Release);
    }

    fn tmux_session(&self) -> String {
        self.name.clone()
    }

    fn loop_stat(&self) -> i32 {
        0
    }

    fn status_code(&self) -> i32 {
        0
    }

    fn message(&self) -> String {
        String::new()
    }

    fn description(&self) -> String {
        String::new()
    }

    fn creation_time_nanos(&self) -> u64 {
        self.creation_time_nanos
    }

    fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        crate::debug_event!("process", "unlinked", "{}", self.path.display());
        true
    }
}
