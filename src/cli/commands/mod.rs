//! Command implementations for the CLI.

pub mod digest;
pub mod init;
pub mod serve;
