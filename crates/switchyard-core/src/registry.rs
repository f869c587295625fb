//! Backend registry: the static name → descriptor map.

use std::collections::BTreeMap;

use crate::descriptor::BackendDescriptor;
use crate::error::{ConfigError, TargetError};

/// Read-only map of configured targets plus the name of the default one.
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    targets: BTreeMap<String, BackendDescriptor>,
    default: String,
}

impl BackendRegistry {
    /// Build a registry, checking that `default` names a configured target.
    pub fn new(
        targets: BTreeMap<String, BackendDescriptor>,
        default: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let default = default.into();
        if targets.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }
        if !targets.contains_key(&default) {
            return Err(ConfigError::UnknownDefault(default));
        }
        Ok(Self { targets, default })
    }

    /// Look up a target by name. Unknown names never fall back to the default.
    pub fn resolve(&self, name: &str) -> Result<&BackendDescriptor, TargetError> {
        self.targets
            .get(name)
            .ok_or_else(|| TargetError::UnknownTarget(name.to_string()))
    }

    /// The default target's name and descriptor.
    pub fn default_target(&self) -> (&str, &BackendDescriptor) {
        // new() guarantees the key exists
        let descriptor = &self.targets[&self.default];
        (&self.default, descriptor)
    }

    /// Configured target names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }
}
