//! Share directory tracking: process logs and kernel connection files.

mod error;
mod reader;
mod registry;

pub use error::ShareError;
pub use reader::read_range;
pub use registry::{ShareDigest, ShareRegistry};
