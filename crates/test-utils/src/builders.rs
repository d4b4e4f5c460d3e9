#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use connector_sandbox::config::{KeyValue, RunConfiguration, SandboxSettings};
use connector_sandbox::deps::DependencyDescriptor;
use connector_sandbox::registry::{InMemoryRegistry, StorageCapability};
use connector_sandbox::types::RunType;

/// Builder for `RunConfiguration` to simplify test setup.
pub struct RunConfigurationBuilder {
    config: RunConfiguration,
}

impl RunConfigurationBuilder {
    pub fn new(source: &str, storage: &str) -> Self {
        Self {
            config: RunConfiguration::new(source, storage),
        }
    }

    pub fn with_source_config(mut self, config: Value) -> Self {
        self.config.source.config = config;
        self
    }

    pub fn with_storage_config(mut self, config: Value) -> Self {
        self.config.storage.config = config;
        self
    }

    pub fn with_data(mut self, key: &str, value: Value) -> Self {
        self.config.data.push(KeyValue {
            key: key.to_string(),
            value,
        });
        self
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.config.state = state;
        self
    }

    pub fn with_run_type(mut self, run_type: RunType) -> Self {
        self.config.run_type = run_type;
        self
    }

    pub fn build(self) -> RunConfiguration {
        self.config
    }
}

/// Builder for an `InMemoryRegistry`.
pub struct RegistryBuilder {
    registry: InMemoryRegistry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: InMemoryRegistry::new(),
        }
    }

    pub fn with_source(mut self, name: &str) -> Self {
        self.registry
            .register_source(name)
            .expect("invalid source name in test registry");
        self
    }

    /// Storage with managed-runtime support and the given dependencies.
    pub fn with_runtime_storage(mut self, name: &str, deps: Vec<DependencyDescriptor>) -> Self {
        self.registry
            .register_storage(name, StorageCapability::runtime(deps))
            .expect("invalid storage name in test registry");
        self
    }

    /// Storage known to the registry but without managed-runtime support.
    pub fn with_plain_storage(mut self, name: &str) -> Self {
        self.registry
            .register_storage(name, StorageCapability::runtime_disabled())
            .expect("invalid storage name in test registry");
        self
    }

    pub fn build(self) -> InMemoryRegistry {
        self.registry
    }

    pub fn build_shared(self) -> Arc<InMemoryRegistry> {
        Arc::new(self.registry)
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings that run everything through `sh`, so no Node toolchain is
/// needed: the worker is `sh run.sh` and the installer is `sh -c <install>`.
pub fn shell_settings(work_root: &Path, install: &str) -> SandboxSettings {
    let mut settings = SandboxSettings::default().with_work_root(work_root);
    settings.worker_program = "sh".to_string();
    settings.entry_script = "run.sh".to_string();
    settings.install_command = vec!["sh".to_string(), "-c".to_string(), install.to_string()];
    settings
}
