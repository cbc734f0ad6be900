//! Tracks real-time control processes and their shared artifacts.
//!
//! Two roots are watched: a flat directory of process descriptor files and a
//! share tree of logs and kernel connection files. Each root is mirrored into
//! a registry by a reconciling [`watcher::FileTracker`], and both registries
//! are exposed through rate-limited agents.

pub mod cli;
pub mod config;
pub mod logging;
pub mod process;
pub mod server;
pub mod share;
pub mod watcher;

pub use config::Settings;
pub use process::{Control, ProcessDigest, ProcessRegistry};
pub use server::KrakenServer;
pub use share::{ShareDigest, ShareRegistry};
