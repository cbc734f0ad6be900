//! Process tracking.
//!
//! Descriptor files under the process directory are linked to
//! [`ProcessHandle`]s and kept in a [`ProcessRegistry`]. Every live process is
//! sampled for OS metrics until its descriptor disappears or it exits,
//! whichever comes first.

pub mod code;
mod digest;
mod entry;
mod error;
mod handle;
mod linker;
pub mod metrics;
mod monitor;
pub mod os;
mod registry;

pub use code::Control;
pub use digest::{PROCESS_COLUMNS, ProcessDigest, ProcessRow};
pub use entry::ProcessEntry;
pub use error::{LinkError, ProcessError};
pub use handle::{ProcessHandle, ProcessLinker};
pub use linker::{ProcFileHandle, ProcFileLinker};
pub use metrics::{MetricsSampler, ProcessMetrics};
pub use registry::ProcessRegistry;
