//! Core domain types for switchyard.
//!
//! This crate holds everything the proxy and the runtime agree on without
//! depending on each other:
//!
//! - [`BackendDescriptor`] - where a target lives (remote URL or local model file)
//! - [`BackendRegistry`] - the read-only name → descriptor map loaded at startup
//! - [`ProxyConfig`] - the JSON configuration file
//! - [`LocalServerPort`] - the seam between target switching and process supervision
//! - the error taxonomy shared by all crates

#![deny(unused_crate_dependencies)]

pub mod config;
pub mod descriptor;
pub mod error;
pub mod ports;
pub mod registry;

pub use config::{
    DEFAULT_LISTEN_PORT, DEFAULT_LOCAL_PORT, DEFAULT_UPSTREAM_TIMEOUT_SECS, LocalServerConfig,
    ProxyConfig,
};
pub use descriptor::BackendDescriptor;
pub use error::{ConfigError, ProcessError, TargetError};
pub use ports::LocalServerPort;
pub use registry::BackendRegistry;

