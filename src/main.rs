use batchdoc::cli::{execute_command, get_log_level, Cli};
use batchdoc::config::{loader, BatchdocConfig};
use batchdoc::display::show_error;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, error, trace};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let project_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = loader::load(&project_dir, cli.config.as_deref()).await;

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(
            cli.verbose,
            config.as_ref().ok().map(|loaded| &loaded.config),
        ))
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2) // Show target module for -vv and above
        .with_thread_ids(cli.verbose >= 3) // Show thread IDs for -vvv
        .with_line_number(cli.verbose >= 3) // Show line numbers for -vvv
        .init();

    debug!("batchdoc started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = match config {
        Ok(loaded) => {
            for source in &loaded.sources {
                debug!("Loaded configuration from {}", source.display());
            }
            debug!("Using backend at {}", loaded.config.api_url);
            execute_command(cli.command, &loaded.config).await
        }
        Err(e) => Err(anyhow::Error::new(e).context("Invalid configuration")),
    };

    if let Err(e) = result {
        // Local rejections never reached the backend.
        let local = e
            .downcast_ref::<batchdoc::Error>()
            .is_some_and(batchdoc::Error::is_local);
        if local {
            debug!("Rejected locally: {:#}", e);
        } else {
            error!("Fatal error: {:#}", e);
        }
        show_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

/// `-v` flags win, then `RUST_LOG`, then the configured level.
fn log_filter(verbose: u8, config: Option<&BatchdocConfig>) -> EnvFilter {
    if verbose > 0 {
        return EnvFilter::new(get_log_level(verbose));
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::new(config.map_or("info", |c| c.log_level.as_str()))
}
