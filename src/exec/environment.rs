// src/exec/environment.rs

//! Pluggable execution environment abstraction.
//!
//! The service talks to an `ExecutionEnvironment` instead of spawning
//! processes itself. This keeps the orchestration (validation, capability
//! lookup, guaranteed cleanup) independent of how a worker is provisioned:
//!
//! - [`ManagedRuntimeEnvironment`](super::ManagedRuntimeEnvironment) is the
//!   production implementation: a working directory with an installed
//!   manifest and a generated entry script, run by a local interpreter.
//! - Tests provide their own implementation that records calls and returns
//!   scripted outcomes without touching the filesystem.
//! - A container-backed or remote-worker engine slots in the same way.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use crate::control::RunControl;
use crate::deps::DependencyDescriptor;
use crate::errors::{CleanupError, Result};

use super::stdio::StdioMode;

/// Boxed, sendable future returned by environment operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Per-run provisioning, execution and teardown.
///
/// For one run the service always calls `create_environment`, then (on
/// success) `execute_connector`, then `cleanup` regardless of outcome.
/// Implementations must not share mutable state between runs with different
/// `(datamart_id, run_id)` pairs.
pub trait ExecutionEnvironment: Send + Sync {
    /// Provision a fresh environment for the run and return its location.
    ///
    /// `dependencies` are the storage-declared packages; the environment adds
    /// its own baseline.
    fn create_environment<'a>(
        &'a self,
        datamart_id: &'a str,
        run_id: &'a str,
        dependencies: &'a [DependencyDescriptor],
        control: &'a RunControl,
    ) -> BoxFuture<'a, Result<PathBuf>>;

    /// Run the worker rooted at `path` with `env_vars` layered over the
    /// current process environment. Resolves when the worker exits with 0.
    fn execute_connector<'a>(
        &'a self,
        path: &'a Path,
        env_vars: HashMap<String, String>,
        stdio: StdioMode,
        control: &'a RunControl,
    ) -> BoxFuture<'a, Result<()>>;

    /// Remove everything provisioned for the run. Succeeds when there is
    /// nothing to remove.
    fn cleanup<'a>(
        &'a self,
        datamart_id: &'a str,
        run_id: &'a str,
    ) -> BoxFuture<'a, std::result::Result<(), CleanupError>>;
}
