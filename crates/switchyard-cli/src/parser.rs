//! Command-line arguments.
//!
//! Every flag can also come from a `SWITCHYARD_*` environment variable.
//! Values given here override the configuration file.

use std::path::PathBuf;

use clap::Parser;
use switchyard_core::ProxyConfig;

/// Reverse proxy that routes completion requests to a switchable backend.
#[derive(Debug, Parser)]
#[command(name = "switchyard")]
#[command(about = "Route completion API calls to a remote or local backend, switchable at runtime")]
#[command(version)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(
        short = 'c',
        long = "config",
        env = "SWITCHYARD_CONFIG",
        default_value = "switchyard.json"
    )]
    pub config: PathBuf,

    /// Address to listen on
    #[arg(long, env = "SWITCHYARD_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short = 'p', long, env = "SWITCHYARD_PORT")]
    pub port: Option<u16>,

    /// Log decoded request and response bodies
    #[arg(long, env = "SWITCHYARD_INSPECT")]
    pub inspect: bool,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", env = "SWITCHYARD_VERBOSE")]
    pub verbose: bool,
}

impl Cli {
    /// Apply flag values on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut ProxyConfig) {
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.inspect {
            config.debug_inspect = true;
        }
    }
}
