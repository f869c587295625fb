//! Shared target state.
//!
//! One [`TargetState`] is shared by every request handler. Reads clone an
//! `Arc` under a short read guard; a switch replaces the `Arc` under a short
//! write guard. The (slow) local-server activation runs outside the cell's
//! lock but inside a dedicated switch mutex, so concurrent switches cannot
//! race to spawn two servers.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use switchyard_core::{BackendDescriptor, BackendRegistry, LocalServerPort, TargetError};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// The currently selected target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTarget {
    /// Registry name of the target.
    pub name: String,
    /// Where requests are sent.
    pub descriptor: BackendDescriptor,
}

pub struct TargetState {
    registry: BackendRegistry,
    current: RwLock<Arc<ActiveTarget>>,
    switch_lock: Mutex<()>,
    local_server: Arc<dyn LocalServerPort>,
    models_dir: PathBuf,
}

impl TargetState {
    /// Create the state, selecting the registry's default target.
    ///
    /// No process is started here; see [`TargetState::activate_initial`].
    pub fn new(
        registry: BackendRegistry,
        local_server: Arc<dyn LocalServerPort>,
        models_dir: impl Into<PathBuf>,
    ) -> Self {
        let (name, descriptor) = registry.default_target();
        let initial = Arc::new(ActiveTarget {
            name: name.to_string(),
            descriptor: descriptor.clone(),
        });
        Self {
            current: RwLock::new(initial),
            registry,
            switch_lock: Mutex::new(()),
            local_server,
            models_dir: models_dir.into(),
        }
    }

    /// The last successfully selected target.
    pub fn current(&self) -> Arc<ActiveTarget> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Switch to the target called `name`.
    ///
    /// Unknown names leave the state untouched. For a local target the call
    /// returns only after the local server has been replaced. If that fails
    /// the new selection stays in place and the error is returned.
    pub async fn set(&self, name: &str) -> Result<String, TargetError> {
        let descriptor = self.registry.resolve(name)?.clone();

        let _switching = self.switch_lock.lock().await;
        self.replace(ActiveTarget {
            name: name.to_string(),
            descriptor: descriptor.clone(),
        });
        info!(name, %descriptor, "Target switched");

        if let BackendDescriptor::Local { model_filename } = &descriptor {
            self.activate_local(model_filename).await?;
        }

        Ok(format!("Target set to {descriptor}"))
    }

    /// Start the local server for the initial target, if it is local.
    pub async fn activate_initial(&self) -> Result<(), TargetError> {
        let _switching = self.switch_lock.lock().await;
        let current = self.current();
        if let BackendDescriptor::Local { model_filename } = &current.descriptor {
            self.activate_local(model_filename).await?;
        }
        Ok(())
    }

    /// Path handed to the local server for `model_filename`.
    fn model_path(&self, model_filename: &str) -> PathBuf {
        self.models_dir.join(model_filename)
    }

    fn replace(&self, next: ActiveTarget) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(next);
    }

    async fn activate_local(&self, model_filename: &str) -> Result<(), TargetError> {
        let path = self.model_path(model_filename);
        debug!(model = %path.display(), "Activating local server");
        self.local_server.activate(&path).await?;
        Ok(())
    }
}
