// src/registry/loader.rs

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::{InMemoryRegistry, StorageCapability};
use crate::errors::Result;

/// Registry file layout:
///
/// ```toml
/// [source.FacebookMarketing]
///
/// [storage.GoogleBigQuery.environment.runtime]
/// enabled = true
/// dependencies = [
///   { name = "@google-cloud/bigquery", version = "7.9.1", bindings = ["BigQuery"] },
/// ]
///
/// [storage.LegacySheets]
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawRegistryFile {
    #[serde(default)]
    pub source: BTreeMap<String, SourceEntry>,

    #[serde(default)]
    pub storage: BTreeMap<String, StorageCapability>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SourceEntry {
    #[serde(default)]
    pub description: Option<String>,
}

impl TryFrom<RawRegistryFile> for InMemoryRegistry {
    type Error = crate::errors::SandboxError;

    fn try_from(raw: RawRegistryFile) -> Result<Self> {
        let mut registry = InMemoryRegistry::new();
        for name in raw.source.into_keys() {
            registry.register_source(name)?;
        }
        for (name, capability) in raw.storage {
            registry.register_storage(name, capability)?;
        }
        Ok(registry)
    }
}

/// Load a registry table from a TOML file.
pub fn load_registry(path: impl AsRef<Path>) -> Result<InMemoryRegistry> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawRegistryFile = toml::from_str(&contents)?;
    InMemoryRegistry::try_from(raw)
}
