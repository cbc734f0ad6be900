//! Seam between the registry and the process-linking primitive.

use std::path::Path;

use super::code::Control;
use super::error::LinkError;
use super::os;

/// Live view onto a linked process.
///
/// Implementations use interior mutability: the registry shares handles across
/// the consumer, monitor tasks and remote calls.
pub trait ProcessHandle: Send + Sync {
    fn pid(&self) -> i32;
    fn name(&self) -> String;
    fn loop_count(&self) -> u64;
    /// Raw control word.
    fn control(&self) -> i32;
    fn set_control(&self, value: Control);
    fn tmux_session(&self) -> String;
    fn loop_stat(&self) -> i32;
    fn status_code(&self) -> i32;
    fn message(&self) -> String;
    fn description(&self) -> String;
    /// Creation time of the descriptor, nanoseconds since the Unix epoch.
    fn creation_time_nanos(&self) -> u64;

    /// Unlink from the descriptor. Returns `false` if already released.
    fn release(&self) -> bool;

    /// Deliver `signum` to the process. `false` when it could not be delivered.
    fn signal(&self, signum: i32) -> bool {
        os::send_signal(self.pid(), signum)
    }
}

/// Links descriptor files to handles.
pub trait ProcessLinker: Send + Sync {
    fn acquire(&self, path: &Path) -> Result<Box<dyn ProcessHandle>, LinkError>;
}
