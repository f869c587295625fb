//! CLI entry point.
//!
//! Parses arguments, installs logging and hands off to the bootstrap
//! composition root. Ctrl-C (and SIGTERM on unix) stops the server gracefully
//! and terminates the local inference server.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use switchyard_cli::{Cli, bootstrap, load_config, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Logging needs the merged config to know whether inspection is on
    let config = load_config(&cli)?;
    logging::init(cli.verbose, config.debug_inspect);

    let ctx = bootstrap(&config)?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    ctx.run(cancel).await
}

async fn cancel_on_signal(cancel: CancellationToken) {
    match wait_for_signal().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
    }
    cancel.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
