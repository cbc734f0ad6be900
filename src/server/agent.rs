//! Rate-limited façades over the registries.
//!
//! Every operation of an agent competes for the same [`RateLimiter`]; a
//! rejected call returns `None` without touching the registry.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::process::{ProcessDigest, ProcessRegistry};
use crate::share::{ShareDigest, ShareError, ShareRegistry};

use super::rate_limit::RateLimiter;

fn admit(limiter: &RateLimiter, agent: &str, operation: &str) -> bool {
    if limiter.check() {
        return true;
    }
    tracing::warn!(
        "[{agent}] {operation} rejected: less than {:?} since the last call",
        limiter.interval()
    );
    false
}

/// Remote surface of the process registry.
pub struct ProcessAgent {
    registry: Arc<ProcessRegistry>,
    limiter: RateLimiter,
}

impl ProcessAgent {
    pub fn new(registry: Arc<ProcessRegistry>, interval: Duration) -> Self {
        Self {
            registry,
            limiter: RateLimiter::new(interval),
        }
    }

    pub fn registry(&self) -> &Arc<ProcessRegistry> {
        &self.registry
    }

    fn limited<T>(&self, operation: &str, f: impl FnOnce(&ProcessRegistry) -> T) -> Option<T> {
        admit(&self.limiter, "process", operation).then(|| f(&self.registry))
    }

    pub fn generate_digest(&self) -> Option<ProcessDigest> {
        self.limited("generate_digest", |r| r.generate_digest())
    }

    pub fn run(&self, paths: &[PathBuf]) -> Option<bool> {
        self.limited("run", |r| r.run(paths))
    }

    pub fn step(&self, paths: &[PathBuf]) -> Option<bool> {
        self.limited("step", |r| r.step(paths))
    }

    pub fn pause(&self, paths: &[PathBuf]) -> Option<bool> {
        self.limited("pause", |r| r.pause(paths))
    }

    pub fn no_compute(&self, paths: &[PathBuf]) -> Option<bool> {
        self.limited("no_compute", |r| r.no_compute(paths))
    }

    pub fn exit(&self, paths: &[PathBuf]) -> Option<bool> {
        self.limited("exit", |r| r.exit(paths))
    }

    pub fn signal(&self, signum: i32, paths: &[PathBuf]) -> Option<Vec<bool>> {
        self.limited("signal", |r| r.signal(signum, paths))
    }
}

/// Remote surface of the share registry.
pub struct ShareAgent {
    registry: Arc<ShareRegistry>,
    limiter: RateLimiter,
}

impl ShareAgent {
    pub fn new(registry: Arc<ShareRegistry>, interval: Duration) -> Self {
        Self {
            registry,
            limiter: RateLimiter::new(interval),
        }
    }

    pub fn registry(&self) -> &Arc<ShareRegistry> {
        &self.registry
    }

    pub fn generate_digest(&self) -> Option<ShareDigest> {
        admit(&self.limiter, "share", "generate_digest").then(|| self.registry.generate_digest())
    }

    pub async fn read_log(
        &self,
        path: &Path,
        from: u64,
        to: Option<u64>,
    ) -> Option<Result<Vec<u8>, ShareError>> {
        if !admit(&self.limiter, "share", "read_log") {
            return None;
        }
        Some(self.registry.read_log(path, from, to).await)
    }

    pub async fn read_kernel_info(&self, path: &Path) -> Option<Result<Vec<u8>, ShareError>> {
        if !admit(&self.limiter, "share", "read_kernel_info") {
            return None;
        }
        Some(self.registry.read_kernel_info(path).await)
    }
}
