//! Error types shared across the workspace.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from switching the active target.
#[derive(Debug, Error)]
pub enum TargetError {
    /// The requested name is not in the registry.
    #[error("Invalid target: {0}")]
    UnknownTarget(String),

    /// The target was selected but its local server could not be started.
    #[error("Failed to activate local server: {0}")]
    Activation(#[from] ProcessError),
}

/// Errors from managing the local inference-server process.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Failed to start the process.
    #[error("Failed to start: {0}")]
    StartFailed(String),

    /// Failed to stop the previous process.
    #[error("Failed to stop: {0}")]
    StopFailed(String),
}

/// Errors from loading the configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    /// The config file is not valid JSON for [`crate::ProxyConfig`].
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// No targets were configured.
    #[error("No targets configured")]
    EmptyRegistry,

    /// The default target name is not one of the configured targets.
    #[error("Default target '{0}' is not a configured target")]
    UnknownDefault(String),
}
