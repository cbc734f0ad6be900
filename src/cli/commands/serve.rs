//! Serve command.

use std::path::PathBuf;

use crate::config::Settings;
use crate::server::{KrakenServer, shutdown_signal};

/// Overrides taken from the command line.
#[derive(Debug, Default)]
pub struct ServeArgs {
    pub address: Option<String>,
    pub port: Option<u16>,
    pub rate_limit: Option<f64>,
    pub no_compression: bool,
    pub real_time: Vec<usize>,
    pub log_file: Option<PathBuf>,
}

impl ServeArgs {
    /// Layer the overrides on top of loaded settings.
    pub fn apply(self, settings: &mut Settings) {
        if let Some(address) = self.address {
            settings.server.address = address;
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(rate_limit) = self.rate_limit {
            settings.server.rate_limit = rate_limit;
        }
        if self.no_compression {
            settings.server.compression = false;
        }
        if !self.real_time.is_empty() {
            settings.server.real_time = self.real_time;
        }
        if let Some(log_file) = self.log_file {
            settings.logging.file = Some(log_file);
        }
    }
}

/// Run the server until Ctrl-C.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    crate::log_event!(
        "server",
        "starting",
        "{} (rate limit {:?})",
        settings.server.bind(),
        settings.server.rate_limit_interval()
    );
    let server = KrakenServer::new(settings);
    server.serve(shutdown_signal()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let mut settings = Settings::default();
        ServeArgs {
            port: Some(20005),
            rate_limit: Some(0.5),
            no_compression: true,
            log_file: Some(PathBuf::from("/var/log/kraken.log")),
            ..ServeArgs::default()
        }
        .apply(&mut settings);

        assert_eq!(settings.server.port, 20005);
        assert_eq!(settings.server.rate_limit, 0.5);
        assert!(!settings.server.compression);
        assert_eq!(settings.server.address, "0.0.0.0");
        assert_eq!(
            settings.logging.file,
            Some(PathBuf::from("/var/log/kraken.log"))
        );
    }
}
