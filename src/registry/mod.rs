// src/registry/mod.rs

//! Capability registry lookups.
//!
//! The registry itself belongs to the connector catalogue; this crate only
//! asks two questions of it:
//! - does a storage support managed-runtime execution, and with which
//!   dependencies?
//! - is a source known at all?
//!
//! [`CapabilityRegistry`] is the read-only seam. [`InMemoryRegistry`] is a
//! table built at startup (programmatically or from TOML) whose names are
//! validated at registration time.

pub mod loader;

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::config::validate::is_valid_identifier;
use crate::deps::DependencyDescriptor;
use crate::errors::ValidationError;

pub use loader::load_registry;

/// What the registry knows about one storage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct StorageCapability {
    #[serde(default)]
    pub environment: EnvironmentCapabilities,
}

/// Execution modes a storage declares.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct EnvironmentCapabilities {
    /// Managed-runtime mode (isolated worker process).
    #[serde(default)]
    pub runtime: Option<RuntimeCapability>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RuntimeCapability {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub dependencies: Vec<DependencyDescriptor>,
}

impl StorageCapability {
    /// Storage that can run in a managed runtime with these dependencies.
    pub fn runtime(dependencies: Vec<DependencyDescriptor>) -> Self {
        Self {
            environment: EnvironmentCapabilities {
                runtime: Some(RuntimeCapability {
                    enabled: true,
                    dependencies,
                }),
            },
        }
    }

    /// Storage known to the registry but without managed-runtime support.
    pub fn runtime_disabled() -> Self {
        Self {
            environment: EnvironmentCapabilities {
                runtime: Some(RuntimeCapability {
                    enabled: false,
                    dependencies: Vec::new(),
                }),
            },
        }
    }

    /// The managed-runtime capability, only if it is present and enabled.
    pub fn enabled_runtime(&self) -> Option<&RuntimeCapability> {
        self.environment.runtime.as_ref().filter(|rt| rt.enabled)
    }
}

/// Read-only view of the connector catalogue.
///
/// Implementations must be safe to query from concurrent runs.
pub trait CapabilityRegistry: Send + Sync {
    fn storage(&self, name: &str) -> Option<StorageCapability>;

    fn has_source(&self, name: &str) -> bool;
}

/// Lookup table of sources and storages.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    storages: BTreeMap<String, StorageCapability>,
    sources: BTreeSet<String>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a storage.
    pub fn register_storage(
        &mut self,
        name: impl Into<String>,
        capability: StorageCapability,
    ) -> Result<&mut Self, ValidationError> {
        let name = checked_name(name.into())?;
        self.storages.insert(name, capability);
        Ok(self)
    }

    pub fn register_source(&mut self, name: impl Into<String>) -> Result<&mut Self, ValidationError> {
        let name = checked_name(name.into())?;
        self.sources.insert(name);
        Ok(self)
    }

    pub fn storage_names(&self) -> impl Iterator<Item = &str> {
        self.storages.keys().map(String::as_str)
    }

    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.storages.is_empty() && self.sources.is_empty()
    }
}

fn checked_name(name: String) -> Result<String, ValidationError> {
    if is_valid_identifier(&name) {
        Ok(name)
    } else {
        Err(ValidationError::InvalidIdentifier(name))
    }
}

impl CapabilityRegistry for InMemoryRegistry {
    fn storage(&self, name: &str) -> Option<StorageCapability> {
        self.storages.get(name).cloned()
    }

    fn has_source(&self, name: &str) -> bool {
        self.sources.contains(name)
    }
}
