// src/deps/mod.rs

//! Dependency resolution and installation for worker environments.
//!
//! - [`DependencyDescriptor`] describes one package the worker loads and how
//!   the entry script exposes it.
//! - [`DependencyManager`] computes the per-run dependency set, builds the
//!   manifest, and installs it into a working directory.
//! - [`npm`] holds the default implementation that shells out to a package
//!   installer.

pub mod manifest;
pub mod npm;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::control::RunControl;
use crate::errors::DependencyInstallError;
use crate::exec::BoxFuture;

pub use manifest::Manifest;
pub use npm::NpmDependencyManager;

/// One runtime package required by the worker.
///
/// `bindings` controls how the entry script exposes the loaded module:
/// - `bind_as_namespace = true`: the whole module is bound under a single
///   name (the first binding, or the package name when none is given).
/// - `bind_as_namespace = false`: each listed name is bound to the module
///   member of the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyDescriptor {
    pub name: String,

    pub version: String,

    #[serde(default, alias = "global_bindings", alias = "globalBindings")]
    pub bindings: Vec<String>,

    #[serde(default, alias = "bindAsNamespace")]
    pub bind_as_namespace: bool,
}

impl DependencyDescriptor {
    /// A dependency that is installed but not bound to any name.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            bindings: Vec::new(),
            bind_as_namespace: false,
        }
    }

    /// Bind the whole module under `alias`.
    pub fn namespace(mut self, alias: impl Into<String>) -> Self {
        self.bindings = vec![alias.into()];
        self.bind_as_namespace = true;
        self
    }

    /// Bind the listed module members by name.
    pub fn members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bindings = members.into_iter().map(Into::into).collect();
        self.bind_as_namespace = false;
        self
    }

    /// Name the whole module is bound under in namespace mode.
    pub fn namespace_alias(&self) -> &str {
        self.bindings.first().map(String::as_str).unwrap_or(&self.name)
    }
}

/// Computes, describes and installs the packages a worker needs.
///
/// The default implementation is [`NpmDependencyManager`]; tests can supply
/// their own to avoid spawning an installer.
pub trait DependencyManager: Send + Sync {
    /// Baseline ∪ `per_run`, baseline entries winning on name collisions.
    fn compute_dependency_set(&self, per_run: &[DependencyDescriptor])
    -> Vec<DependencyDescriptor>;

    /// Manifest object consumed by the installer.
    fn generate_manifest(&self, connector_id: &str, dependencies: &[DependencyDescriptor])
    -> Manifest;

    /// Install the manifest found in `work_dir`.
    ///
    /// Resolves once the installer exits with code 0.
    fn install<'a>(
        &'a self,
        work_dir: &'a Path,
        control: &'a RunControl,
    ) -> BoxFuture<'a, Result<(), DependencyInstallError>>;
}
