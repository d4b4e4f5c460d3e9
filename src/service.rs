// src/service.rs

//! Connector execution service.
//!
//! One `execute` call is one run:
//! 1. validate the ids and names (no side effects on failure)
//! 2. look up the storage's runtime capability and check the source exists
//! 3. `create_environment` with the storage-declared dependencies
//! 4. `execute_connector` with the run's environment variables
//! 5. `cleanup`, whatever happened in 3 and 4
//!
//! The service holds no per-run state; concurrent calls with distinct
//! `(datamart_id, run_id)` pairs are independent.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::settings::DEFAULT_RUN_TIMEOUT;
use crate::config::{RunConfiguration, SandboxSettings, validate_run_inputs};
use crate::context::RunContext;
use crate::control::RunControl;
use crate::deps::DependencyDescriptor;
use crate::errors::{Result, SandboxError};
use crate::exec::{ExecutionEnvironment, ManagedRuntimeEnvironment, StdioMode};
use crate::registry::CapabilityRegistry;

pub struct ConnectorExecutionService {
    registry: Arc<dyn CapabilityRegistry>,
    environment: Box<dyn ExecutionEnvironment>,
    default_timeout: Duration,
}

impl ConnectorExecutionService {
    pub fn new(
        registry: Arc<dyn CapabilityRegistry>,
        environment: impl ExecutionEnvironment + 'static,
    ) -> Self {
        Self {
            registry,
            environment: Box::new(environment),
            default_timeout: DEFAULT_RUN_TIMEOUT,
        }
    }

    /// Service backed by the managed-runtime environment described by
    /// `settings`.
    pub fn from_settings(
        settings: &SandboxSettings,
        registry: Arc<dyn CapabilityRegistry>,
    ) -> Result<Self> {
        let environment = ManagedRuntimeEnvironment::new(settings)?;
        Ok(Self::new(registry, environment).with_default_timeout(settings.run_timeout))
    }

    /// Time budget applied by [`execute`](Self::execute).
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run a connector under the default time budget.
    pub async fn execute(
        &self,
        datamart_id: &str,
        run_id: &str,
        config: &RunConfiguration,
        stdio: StdioMode,
    ) -> Result<()> {
        let control = RunControl::with_timeout(self.default_timeout);
        self.execute_with_control(datamart_id, run_id, config, stdio, control)
            .await
    }

    /// Run a connector with a caller-supplied deadline / cancellation.
    pub async fn execute_with_control(
        &self,
        datamart_id: &str,
        run_id: &str,
        config: &RunConfiguration,
        stdio: StdioMode,
        control: RunControl,
    ) -> Result<()> {
        validate_run_inputs(datamart_id, run_id, config)?;

        let storage_name = config.storage.name.as_str();
        let source_name = config.source.name.as_str();

        let capability = self
            .registry
            .storage(storage_name)
            .ok_or_else(|| SandboxError::StorageNotFound(storage_name.to_string()))?;
        let runtime = capability
            .enabled_runtime()
            .ok_or_else(|| SandboxError::StorageEnvironmentUnsupported(storage_name.to_string()))?;
        let dependencies = runtime.dependencies.clone();

        if !self.registry.has_source(source_name) {
            return Err(SandboxError::SourceNotFound(source_name.to_string()));
        }

        let context = RunContext::new(datamart_id, run_id, config, stdio);
        let env_vars = context.env_vars()?;
        let stdio = context.into_stdio();

        info!(
            datamart_id,
            run_id,
            source = source_name,
            storage = storage_name,
            run_type = %config.run_type,
            timeout = ?control.timeout(),
            "starting connector run"
        );

        let outcome = self
            .provision_and_run(datamart_id, run_id, &dependencies, env_vars, stdio, &control)
            .await;

        // A collision means the directory belongs to someone else.
        if !matches!(outcome, Err(SandboxError::EnvironmentCollision(_))) {
            if let Err(e) = self.environment.cleanup(datamart_id, run_id).await {
                warn!(datamart_id, run_id, error = %e, "cleanup failed");
            }
        }

        match &outcome {
            Ok(()) => info!(datamart_id, run_id, "connector run finished"),
            Err(e) => error!(datamart_id, run_id, error = %e, "connector run failed"),
        }
        outcome
    }

    async fn provision_and_run(
        &self,
        datamart_id: &str,
        run_id: &str,
        dependencies: &[DependencyDescriptor],
        env_vars: HashMap<String, String>,
        stdio: StdioMode,
        control: &RunControl,
    ) -> Result<()> {
        let path = self
            .environment
            .create_environment(datamart_id, run_id, dependencies, control)
            .await?;

        self.environment
            .execute_connector(&path, env_vars, stdio, control)
            .await
    }
}
