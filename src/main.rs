use clap::Parser;

use kraken::Settings;
use kraken::cli::commands::serve::ServeArgs;
use kraken::cli::{Cli, Commands, RootArgs};

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .map_err(|e| anyhow::anyhow!("Configuration error: {e}"))?;

    if cli.quiet {
        settings.logging.default = "error".to_string();
    } else {
        match cli.verbose {
            0 => {}
            1 => settings.logging.default = "info".to_string(),
            _ => settings.logging.default = "debug".to_string(),
        }
    }
    Ok(settings)
}

fn apply_roots(roots: RootArgs, settings: &mut Settings) {
    if let Some(proc_dir) = roots.proc_dir {
        settings.tracking.proc_dir = proc_dir;
    }
    if let Some(share_dir) = roots.share_dir {
        settings.tracking.share_dir = share_dir;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(&cli)?;

    match cli.command {
        Commands::Init { force } => {
            kraken::logging::init_with_config(&settings.logging);
            kraken::cli::commands::init::run_init(force)
        }
        Commands::Config => {
            kraken::logging::init_with_config(&settings.logging);
            kraken::cli::commands::init::run_config(&settings)
        }
        Commands::Digest { roots } => {
            apply_roots(roots, &mut settings);
            kraken::logging::init_with_config(&settings.logging);
            kraken::cli::commands::digest::run(&settings).await
        }
        Commands::Serve {
            address,
            port,
            rate_limit,
            no_compression,
            real_time,
            log_file,
            roots,
        } => {
            apply_roots(roots, &mut settings);
            ServeArgs {
                address,
                port,
                rate_limit,
                no_compression,
                real_time,
                log_file,
            }
            .apply(&mut settings);
            kraken::logging::init_with_config(&settings.logging);
            kraken::cli::commands::serve::run(settings).await
        }
    }
}
