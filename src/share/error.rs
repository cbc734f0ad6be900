//! Error types for the share directory.

use std::path::PathBuf;
use thiserror::Error;

use crate::watcher::WatchError;

#[derive(Error, Debug)]
pub enum ShareError {
    #[error("Not a tracked {kind} file: {path}")]
    NotTracked { path: PathBuf, kind: &'static str },

    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Watch(#[from] WatchError),
}
