//! Reconciling file tracking.
//!
//! A [`FileTracker`] keeps the set of recognised files under one root in sync
//! with the disk and reports every membership change over a channel.
//!
//! # Architecture
//!
//! ```text
//! notify thread ----push----+
//!                           v
//!                  tracked set (one lock) ---> mpsc ---> registry consumer
//!                           ^
//! periodic / manual scan ---+
//! ```

mod classify;
mod error;
mod event;
mod tracker;

pub use classify::{Classifier, FileKind, FilePattern};
pub use error::WatchError;
pub use event::{Change, TrackerEvent, TrackerMessage};
pub use tracker::{FileTracker, ScanOutcome};
