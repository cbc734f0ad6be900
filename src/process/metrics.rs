//! Per-process OS metrics.

use serde::{Deserialize, Serialize};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Last sampled OS metrics of a tracked process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessMetrics {
    /// CPU usage normalised by the machine's core count.
    pub cpu_percent: f32,
    pub rss_bytes: u64,
    pub cpu_affinity: Vec<usize>,
    pub thread_count: u64,
    /// Voluntary plus involuntary context switches.
    pub context_switches: u64,
}

/// Fields read from `/proc/<pid>/status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcStatus {
    pub state: Option<char>,
    pub threads: u64,
    pub voluntary_ctxt_switches: u64,
    pub nonvoluntary_ctxt_switches: u64,
    pub cpus_allowed: Vec<usize>,
}

/// Parse the content of `/proc/<pid>/status`.
pub fn parse_proc_status(content: &str) -> ProcStatus {
    let mut status = ProcStatus::default();

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            // "S (sleeping)"
            "State" => status.state = value.chars().next(),
            "Threads" => status.threads = value.parse().unwrap_or(0),
            "voluntary_ctxt_switches" => status.voluntary_ctxt_switches = value.parse().unwrap_or(0),
            "nonvoluntary_ctxt_switches" => {
                status.nonvoluntary_ctxt_switches = value.parse().unwrap_or(0)
            }
            "Cpus_allowed_list" => status.cpus_allowed = parse_cpu_list(value),
            _ => {}
        }
    }

    status
}

/// Parse a kernel CPU list such as `0-3,6,8-9`. Malformed items are skipped.
pub fn parse_cpu_list(list: &str) -> Vec<usize> {
    let mut cpus = Vec::new();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match item.split_once('-') {
            Some((start, end)) => {
                if let (Ok(start), Ok(end)) = (start.parse::<usize>(), end.parse::<usize>()) {
                    cpus.extend(start..=end);
                }
            }
            None => {
                if let Ok(cpu) = item.parse() {
                    cpus.push(cpu);
                }
            }
        }
    }
    cpus.sort_unstable();
    cpus.dedup();
    cpus
}

/// Samples one process at a time.
///
/// CPU usage is a delta between refreshes, so a sampler should be kept per
/// process and reused; the first sample always reports zero CPU.
pub struct MetricsSampler {
    system: System,
    cpu_count: usize,
}

impl Default for MetricsSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            cpu_count: num_cpus::get().max(1),
        }
    }

    /// Take a sample, `None` when the process has vanished.
    pub fn sample(&mut self, pid: i32) -> Option<ProcessMetrics> {
        let raw = u32::try_from(pid).ok().filter(|p| *p > 0)?;
        let pid = Pid::from_u32(raw);

        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );
        let process = self.system.process(pid)?;
        let cpu_percent = process.cpu_usage() / self.cpu_count as f32;
        let rss_bytes = process.memory();

        let status = read_status(raw)?;
        let cpu_affinity = if status.cpus_allowed.is_empty() {
            (0..self.cpu_count).collect()
        } else {
            status.cpus_allowed
        };

        Some(ProcessMetrics {
            cpu_percent,
            rss_bytes,
            cpu_affinity,
            thread_count: status.threads,
            context_switches: status.voluntary_ctxt_switches + status.nonvoluntary_ctxt_switches,
        })
    }
}

#[cfg(target_os = "linux")]
fn read_status(pid: u32) -> Option<ProcStatus> {
    std::fs::read_to_string(format!("/proc/{pid}/status"))
        .ok()
        .map(|content| parse_proc_status(&content))
}

#[cfg(not(target_os = "linux"))]
fn read_status(_pid: u32) -> Option<ProcStatus> {
    Some(ProcStatus::default())
}
