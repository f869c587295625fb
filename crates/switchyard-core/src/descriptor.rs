//! Backend descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Connection details of a single target.
///
/// Descriptors are immutable: switching targets replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendDescriptor {
    /// A hosted completion API reached at `base_url`.
    Remote {
        /// Scheme + host (+ optional prefix), e.g. `https://api.example.com`.
        #[serde(alias = "domain")]
        base_url: String,
    },
    /// A model served by the locally supervised inference server.
    Local {
        /// Model file, relative to the models directory unless absolute.
        #[serde(alias = "filename")]
        model_filename: String,
    },
}

impl BackendDescriptor {
    /// Returns `true` for [`BackendDescriptor::Local`].
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }

    /// Full upstream URL for an inbound `path_and_query`.
    ///
    /// Remote targets concatenate the base URL and the path verbatim; local
    /// targets always go to `http://localhost:<local_port>`.
    pub fn upstream_url(&self, local_port: u16, path_and_query: &str) -> String {
        match self {
            Self::Remote { base_url } => format!("{base_url}{path_and_query}"),
            Self::Local { .. } => format!("http://localhost:{local_port}{path_and_query}"),
        }
    }
}

impl fmt::Display for BackendDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote { base_url } => write!(f, "remote({base_url})"),
            Self::Local { model_filename } => write!(f, "local({model_filename})"),
        }
    }
}
