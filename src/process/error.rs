//! Error types for process tracking.

use std::path::PathBuf;
use thiserror::Error;

use crate::watcher::WatchError;

/// Failure to link a descriptor file to a handle.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Not a process descriptor: {path}")]
    InvalidFile { path: PathBuf },

    #[error("Cannot link {path}: {reason}")]
    Link { path: PathBuf, reason: String },
}

/// Errors surfaced by registry operations.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Not tracked: {path}")]
    NotTracked { path: PathBuf },

    #[error("Operation not supported: {operation}")]
    Unsupported { operation: &'static str },

    #[error(transparent)]
    Watch(#[from] WatchError),
}
