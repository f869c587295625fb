//! Configuration file loading.
//!
//! The configuration is a single JSON document read once at startup. Every
//! field except the target map has a default, so the smallest useful file is:
//!
//! ```json
//! {
//!   "default": "openai",
//!   "targets": { "openai": { "type": "remote", "base_url": "https://api.openai.com" } }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::BackendDescriptor;
use crate::error::ConfigError;
use crate::registry::BackendRegistry;

/// Default port the proxy listens on.
pub const DEFAULT_LISTEN_PORT: u16 = 5001;

/// Default port the local inference server is bound to.
pub const DEFAULT_LOCAL_PORT: u16 = 8000;

/// Default connect/read timeout for upstream calls.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Top-level proxy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Name of the target selected at startup.
    #[serde(rename = "default")]
    pub default_target: String,

    /// All selectable targets keyed by name.
    #[serde(alias = "models")]
    pub targets: BTreeMap<String, BackendDescriptor>,

    /// Directory local model filenames are resolved against (`~/models` if unset).
    #[serde(default)]
    pub models_dir: Option<PathBuf>,

    /// Launch parameters for the local inference server.
    #[serde(default)]
    pub local_server: LocalServerConfig,

    /// Address to bind the proxy to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind the proxy to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Connect and read timeout for every upstream call.
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Log decoded request/response bodies at debug level.
    #[serde(default)]
    pub debug_inspect: bool,
}

/// How the local inference server is launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalServerConfig {
    /// Executable to run.
    pub program: String,
    /// Arguments placed before the generated model/port arguments.
    pub args: Vec<String>,
    /// Host the server binds to.
    pub host: String,
    /// Fixed port the server binds to; local targets are forwarded here.
    pub port: u16,
    /// Number of layers offloaded to the GPU.
    pub gpu_layers: u32,
    /// Context window size.
    pub context_size: u64,
    /// How long to wait after SIGTERM before escalating to SIGKILL.
    pub shutdown_grace_ms: u64,
}

impl Default for LocalServerConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["-m".to_string(), "llama_cpp.server".to_string()],
            host: "127.0.0.1".to_string(),
            port: DEFAULT_LOCAL_PORT,
            gpu_layers: 1,
            context_size: 4096,
            shutdown_grace_ms: 5000,
        }
    }
}

impl LocalServerConfig {
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

const fn default_upstream_timeout_secs() -> u64 {
    DEFAULT_UPSTREAM_TIMEOUT_SECS
}

impl ProxyConfig {
    /// Read and parse a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Self::from_json(&raw)
    }

    /// Parse a config document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Build the backend registry, validating the default target.
    pub fn registry(&self) -> Result<BackendRegistry, ConfigError> {
        BackendRegistry::new(self.targets.clone(), self.default_target.clone())
    }

    /// Directory local model filenames are joined onto.
    ///
    /// Falls back to `~/models`, and expands a leading `~/`.
    pub fn resolved_models_dir(&self) -> PathBuf {
        match &self.models_dir {
            Some(dir) => expand_home(dir),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("models"),
        }
    }

    pub const fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
