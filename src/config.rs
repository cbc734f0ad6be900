//! Configuration module for the kraken monitor.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `KRAKEN_` and use double underscores
//! to separate nested levels:
//! - `KRAKEN_SERVER__PORT=20001` sets `server.port`
//! - `KRAKEN_SERVER__RATE_LIMIT=0.1` sets `server.rate_limit`
//! - `KRAKEN_TRACKING__SHARE_DIR=/data/share` sets `tracking.share_dir`
//!
//! `MILK_PROC_DIR` is honoured as the default process directory, matching the
//! layout used by the processes being tracked.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::watcher::FilePattern;

/// Directory searched upward from the working directory for `settings.toml`.
pub const CONFIG_DIR: &str = ".kraken";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Remote call surface
    #[serde(default)]
    pub server: ServerConfig,

    /// Watched roots and recognised file patterns
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Per-process sampling
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_address")]
    pub address: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Minimum interval in seconds between calls on one agent (0 disables)
    #[serde(default)]
    pub rate_limit: f64,

    /// Gzip-compress responses
    #[serde(default = "default_true")]
    pub compression: bool,

    /// CPUs the server pins itself to (empty leaves affinity untouched)
    #[serde(default)]
    pub real_time: Vec<usize>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TrackingConfig {
    /// Flat directory holding process descriptor files
    #[serde(default = "default_proc_dir")]
    pub proc_dir: PathBuf,

    /// Directory tree holding log and kernel connection files
    #[serde(default = "default_share_dir")]
    pub share_dir: PathBuf,

    /// Seconds between full re-scans (0 disables periodic re-scans)
    #[serde(default = "default_rescan_interval")]
    pub rescan_interval_secs: u64,

    /// Capacity of the watcher -> registry event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Process descriptor pattern
    #[serde(default = "default_process_pattern")]
    pub process: FilePattern,

    /// Log file pattern
    #[serde(default = "default_log_pattern")]
    pub log: FilePattern,

    /// Kernel connection file pattern
    #[serde(default = "default_kernel_pattern")]
    pub kernel: FilePattern,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MonitorConfig {
    /// Sampling period for OS metrics
    #[serde(default = "default_sample_interval")]
    pub sample_interval_ms: u64,

    /// Liveness polling period used to detect process termination
    #[serde(default = "default_reap_interval")]
    pub reap_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for every target
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides (`watcher = "debug"`)
    #[serde(default)]
    pub modules: HashMap<String, String>,

    /// Append log output to this file instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    20000
}
fn default_proc_dir() -> PathBuf {
    std::env::var_os("MILK_PROC_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/milk/proc"))
}
fn default_share_dir() -> PathBuf {
    PathBuf::from("/milk/share")
}
fn default_rescan_interval() -> u64 {
    5
}
fn default_event_capacity() -> usize {
    256
}
fn default_process_pattern() -> FilePattern {
    FilePattern::new("proc.", "shm")
}
fn default_log_pattern() -> FilePattern {
    FilePattern::new("log.", "txt")
}
fn default_kernel_pattern() -> FilePattern {
    FilePattern::new("kernel.", "json")
}
fn default_sample_interval() -> u64 {
    1000
}
fn default_reap_interval() -> u64 {
    500
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            server: ServerConfig::default(),
            tracking: TrackingConfig::default(),
            monitor: MonitorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            rate_limit: 0.0,
            compression: true,
            real_time: Vec::new(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            proc_dir: default_proc_dir(),
            share_dir: default_share_dir(),
            rescan_interval_secs: default_rescan_interval(),
            event_capacity: default_event_capacity(),
            process: default_process_pattern(),
            log: default_log_pattern(),
            kernel: default_kernel_pattern(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval(),
            reap_interval_ms: default_reap_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
            file: None,
        }
    }
}

impl ServerConfig {
    /// `address:port` for the listener.
    pub fn bind(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Rate-limit interval; negative and non-finite values disable limiting.
    ///
    /// Values too large for a `Duration` saturate to `Duration::MAX`.
    pub fn rate_limit_interval(&self) -> Duration {
        if !(self.rate_limit.is_finite() && self.rate_limit > 0.0) {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(self.rate_limit).unwrap_or_else(|e| {
            tracing::warn!(
                "[config] rate limit {} seconds out of range ({e}), using maximum",
                self.rate_limit
            );
            Duration::MAX
        })
    }
}

impl TrackingConfig {
    pub fn rescan_interval(&self) -> Option<Duration> {
        (self.rescan_interval_secs > 0).then(|| Duration::from_secs(self.rescan_interval_secs))
    }
}

impl MonitorConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.max(1))
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_millis(self.reap_interval_ms.max(1))
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honouring `KRAKEN_` overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels, single underscore stays
            .merge(Env::prefixed("KRAKEN_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find `.kraken/settings.toml` from the current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join("settings.toml"));
            }
        }

        None
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Write a default settings file under `dir/.kraken/`
    pub fn init_config_file(dir: &Path, force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = dir.join(CONFIG_DIR).join("settings.toml");

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.server.port, 20000);
        assert_eq!(settings.server.address, "0.0.0.0");
        assert!(settings.server.compression);
        assert_eq!(settings.server.rate_limit_interval(), Duration::ZERO);
        assert_eq!(settings.tracking.share_dir, PathBuf::from("/milk/share"));
        assert_eq!(settings.tracking.process, FilePattern::new("proc.", "shm"));
        assert_eq!(settings.monitor.sample_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
[server]
port = 20001
rate_limit = 0.25
compression = false

[tracking]
share_dir = "/tmp/share"
rescan_interval_secs = 0

[tracking.log]
prefix = "journal."
extension = "log"

[logging]
default = "debug"
"#;
        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.server.port, 20001);
        assert_eq!(
            settings.server.rate_limit_interval(),
            Duration::from_millis(250)
        );
        assert!(!settings.server.compression);
        assert_eq!(settings.tracking.share_dir, PathBuf::from("/tmp/share"));
        assert_eq!(settings.tracking.rescan_interval(), None);
        assert_eq!(settings.tracking.log, FilePattern::new("journal.", "log"));
        // Untouched patterns keep their defaults
        assert_eq!(settings.tracking.kernel, FilePattern::new("kernel.", "json"));
        assert_eq!(settings.logging.default, "debug");
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.server.port = 9999;
        settings.server.real_time = vec![0, 2];

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.server.port, 9999);
        assert_eq!(loaded.server.real_time, vec![0, 2]);
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();

        let path = Settings::init_config_file(temp_dir.path(), false).unwrap();
        assert!(path.exists());
        assert!(Settings::init_config_file(temp_dir.path(), false).is_err());
        assert!(Settings::init_config_file(temp_dir.path(), true).is_ok());
    }

    #[test]
    fn test_negative_rate_limit_disables() {
        let server = ServerConfig {
            rate_limit: -1.0,
            ..ServerConfig::default()
        };
        assert_eq!(server.rate_limit_interval(), Duration::ZERO);
    }

    #[test]
    fn test_huge_rate_limit_saturates() {
        let server = ServerConfig {
            rate_limit: 1e300,
            ..ServerConfig::default()
        };
        assert_eq!(server.rate_limit_interval(), Duration::MAX);
    }
}
