//! Supervisor for the single local inference-server process.

use std::path::Path;

use async_trait::async_trait;
use switchyard_core::{LocalServerConfig, LocalServerPort, ProcessError};
use tokio::process::Child;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::command::build_command;
use crate::process::{shutdown_child, spawn_stream_reader};

/// Owns at most one local inference-server process.
///
/// `activate` is serialized by the internal mutex: the previous process is
/// terminated and reaped before the next one is spawned, so two servers are
/// never alive at the same time.
///
/// # Example
///
/// ```ignore
/// let supervisor = LocalServerSupervisor::new(LocalServerConfig::default());
/// supervisor.activate(Path::new("/models/model.bin")).await?;
/// supervisor.shutdown().await?;
/// ```
pub struct LocalServerSupervisor {
    config: LocalServerConfig,
    child: Mutex<Option<Child>>,
}

impl LocalServerSupervisor {
    pub fn new(config: LocalServerConfig) -> Self {
        Self {
            config,
            child: Mutex::new(None),
        }
    }

    /// Replace the running server (if any) with one serving `model_path`.
    pub async fn activate(&self, model_path: &Path) -> Result<(), ProcessError> {
        let mut guard = self.child.lock().await;

        if let Some(mut old) = guard.take() {
            self.stop(&mut old).await?;
        }

        let mut cmd = build_command(&self.config, model_path);
        info!(
            model = %model_path.display(),
            port = self.config.port,
            "Starting local server: {:?}",
            cmd.as_std()
        );

        let mut child = cmd.spawn().map_err(|e| {
            ProcessError::StartFailed(format!("{}: {e}", self.config.program))
        })?;
        let pid = child.id().unwrap_or_default();

        if let Some(stdout) = child.stdout.take() {
            spawn_stream_reader(stdout, pid, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_stream_reader(stderr, pid, "stderr");
        }

        info!(pid, port = self.config.port, "Local server started");
        *guard = Some(child);
        Ok(())
    }

    /// Terminate the running server, if any.
    pub async fn shutdown(&self) -> Result<(), ProcessError> {
        let mut guard = self.child.lock().await;
        match guard.take() {
            Some(mut child) => self.stop(&mut child).await,
            None => Ok(()),
        }
    }

    /// PID of the live server process.
    pub async fn current_pid(&self) -> Option<u32> {
        self.child.lock().await.as_ref().and_then(Child::id)
    }

    async fn stop(&self, child: &mut Child) -> Result<(), ProcessError> {
        let pid = child.id();
        debug!(?pid, "Stopping local server");
        match shutdown_child(child, self.config.shutdown_grace()).await {
            Ok(status) => {
                info!(?pid, %status, "Local server stopped");
                Ok(())
            }
            Err(e) => {
                warn!(?pid, error = %e, "Failed to stop local server");
                Err(ProcessError::StopFailed(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl LocalServerPort for LocalServerSupervisor {
    async fn activate(&self, model_path: &Path) -> Result<(), ProcessError> {
        Self::activate(self, model_path).await
    }
}
