//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Process and share monitor
#[derive(Parser, Debug)]
#[command(
    name = "kraken",
    version = env!("CARGO_PKG_VERSION"),
    about = "Tracks control processes and shared artifacts, and serves their state",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Root directory overrides shared by commands that track files.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RootArgs {
    /// Flat directory holding process descriptors
    #[arg(long, env = "MILK_PROC_DIR")]
    pub proc_dir: Option<PathBuf>,

    /// Directory tree holding logs and kernel files
    #[arg(long)]
    pub share_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration
    #[command(about = "Set up .kraken directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings")]
    Config,

    /// Scan both roots once and print the digests
    #[command(
        about = "Print process and share digests as JSON",
        after_help = "Examples:\n  kraken digest\n  kraken digest --proc-dir /tmp/proc --share-dir /tmp/share"
    )]
    Digest {
        #[command(flatten)]
        roots: RootArgs,
    },

    /// Track both roots and serve them over HTTP
    #[command(
        about = "Start the monitor server",
        after_help = "Examples:\n  kraken serve\n  kraken serve --port 20001 --rate-limit 0.1\n  kraken serve --real-time 2 3"
    )]
    Serve {
        /// Bind address
        #[arg(long)]
        address: Option<String>,

        /// Bind port
        #[arg(short, long)]
        port: Option<u16>,

        /// Minimum seconds between calls on one agent (0 disables)
        #[arg(long, value_name = "SECONDS")]
        rate_limit: Option<f64>,

        /// Disable gzip response compression
        #[arg(long)]
        no_compression: bool,

        /// Pin the server to these CPUs
        #[arg(long, value_name = "CPU", num_args = 1..)]
        real_time: Vec<usize>,

        /// Append log output to this file instead of stderr
        #[arg(long, value_name = "PATH")]
        log_file: Option<PathBuf>,

        #[command(flatten)]
        roots: RootArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from([
            "kraken",
            "serve",
            "--port",
            "20001",
            "--rate-limit",
            "0.1",
            "--no-compression",
            "--log-file",
            "/tmp/kraken.log",
            "--real-time",
            "2",
            "3",
            "--share-dir",
            "/tmp/share",
        ])
        .unwrap();

        match cli.command {
            Commands::Serve {
                port,
                rate_limit,
                no_compression,
                real_time,
                log_file,
                roots,
                ..
            } => {
                assert_eq!(log_file, Some(PathBuf::from("/tmp/kraken.log")));
                assert_eq!(port, Some(20001));
                assert_eq!(rate_limit, Some(0.1));
                assert!(no_compression);
                assert_eq!(real_time, vec![2, 3]);
                assert_eq!(roots.share_dir, Some(PathBuf::from("/tmp/share")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["kraken", "-v", "-q", "config"]).is_err());
        let cli = Cli::try_parse_from(["kraken", "-vv", "config"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_debug_assert() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
