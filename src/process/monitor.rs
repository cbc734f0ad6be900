//! Per-entry sampler and reaper.
//!
//! Each monitored entry gets one lightweight task that samples OS metrics on
//! one period and polls for process exit on another. Both run on the same
//! task, so a tick never overlaps the previous one. The `/proc` reads and
//! sysinfo refreshes themselves run on the blocking pool.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::config::MonitorConfig;

use super::entry::ProcessEntry;
use super::metrics::MetricsSampler;
use super::os;
use super::registry::RegistryCore;

pub(crate) fn spawn(
    entry: Arc<ProcessEntry>,
    core: Weak<RegistryCore>,
    config: &MonitorConfig,
) -> JoinHandle<()> {
    let sample_period = config.sample_interval();
    let reap_period = config.reap_interval();
    let cancel = entry.cancel_token();

    tokio::spawn(async move {
        let pid = entry.pid();
        let sampler = Arc::new(Mutex::new(MetricsSampler::new()));
        let mut sample = interval_at(Instant::now() + sample_period, sample_period);
        sample.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut reap = interval_at(Instant::now() + reap_period, reap_period);
        reap.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sample.tick() => {
                    let sampler = Arc::clone(&sampler);
                    match tokio::task::spawn_blocking(move || sampler.lock().sample(pid)).await {
                        Ok(Some(metrics)) => entry.store_metrics(metrics),
                        // Vanished processes keep their last sample
                        Ok(None) => {}
                        Err(e) => tracing::warn!("[process] sampling pid {pid} failed: {e}"),
                    }
                }
                _ = reap.tick() => {
                    let alive = tokio::task::spawn_blocking(move || os::process_alive(pid))
                        .await
                        .unwrap_or(true);
                    if !alive {
                        crate::log_event!(
                            "process",
                            "exited",
                            "{} (pid {pid})",
                            entry.path().display()
                        );
                        match core.upgrade() {
                            Some(core) => core.detach(&entry),
                            None => {
                                entry.release();
                            }
                        }
                        break;
                    }
                }
            }
        }
    })
}
