//! Port definitions.
//!
//! Target switching lives in the proxy crate and process supervision in the
//! runtime crate; this trait is the only thing they share.

use std::path::Path;

use async_trait::async_trait;

use crate::error::ProcessError;

/// Owner of the single local inference-server process.
#[async_trait]
pub trait LocalServerPort: Send + Sync {
    /// Replace any running local server with one serving `model_path`.
    ///
    /// Returns only after the previous process has exited and the new one
    /// has been spawned. Calls are serialized by the implementation.
    async fn activate(&self, model_path: &Path) -> Result<(), ProcessError>;
}
