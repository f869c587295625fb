//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together:
//! - Backend registry and target state (via switchyard-proxy)
//! - Local inference-server supervisor (via switchyard-runtime)
//! - Upstream HTTP client and router (via switchyard-proxy)

use std::sync::Arc;

use anyhow::{Context, Result};
use switchyard_core::{LocalServerPort, ProxyConfig};
use switchyard_proxy::{AppState, TargetState, build_client, serve};
use switchyard_runtime::LocalServerSupervisor;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::parser::Cli;

/// Load the configuration file named on the command line and apply flag overrides.
pub fn load_config(cli: &Cli) -> Result<ProxyConfig> {
    let mut config = ProxyConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    cli.apply_overrides(&mut config);
    Ok(config)
}

/// Fully composed proxy, ready to run.
pub struct ProxyContext {
    /// Router state shared by every request.
    pub state: AppState,
    /// Active target selection.
    pub targets: Arc<TargetState>,
    /// Owner of the local inference-server process.
    pub supervisor: Arc<LocalServerSupervisor>,
    /// `host:port` to bind.
    pub listen_addr: String,
}

/// Compose the proxy from a loaded configuration.
///
/// Nothing is spawned or bound here; see [`ProxyContext::run`].
pub fn bootstrap(config: &ProxyConfig) -> Result<ProxyContext> {
    let registry = config.registry().context("Invalid target configuration")?;
    let names: Vec<&str> = registry.names().collect();
    info!(
        targets = ?names,
        default = %config.default_target,
        "Loaded backend registry"
    );

    let supervisor = Arc::new(LocalServerSupervisor::new(config.local_server.clone()));
    let local_server: Arc<dyn LocalServerPort> = supervisor.clone();
    let targets = Arc::new(TargetState::new(
        registry,
        local_server,
        config.resolved_models_dir(),
    ));

    let client =
        build_client(config.upstream_timeout()).context("Failed to build upstream HTTP client")?;
    let state = AppState::new(
        Arc::clone(&targets),
        client,
        config.local_server.port,
        config.debug_inspect,
    );

    Ok(ProxyContext {
        state,
        targets,
        supervisor,
        listen_addr: format!("{}:{}", config.host, config.port),
    })
}

impl ProxyContext {
    /// Start the default target, serve until `cancel` fires, then stop the local server.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        self.targets
            .activate_initial()
            .await
            .context("Failed to start local server for the default target")?;

        let listener = TcpListener::bind(&self.listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.listen_addr));
        let served = match listener {
            Ok(listener) => serve(listener, self.state, cancel).await,
            Err(e) => Err(e),
        };

        // Stop the local server on every exit, a failed bind included
        if let Err(e) = self.supervisor.shutdown().await {
            warn!(error = %e, "Local server did not shut down cleanly");
        }
        served
    }
}
