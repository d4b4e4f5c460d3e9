// src/exec/managed.rs

//! Local managed-runtime execution environment.
//!
//! Layout of one run:
//!
//! ```text
//! <work_root>/<datamart_id>/<run_id>/
//!     package.json   dependency manifest
//!     node_modules/  installed by the install command
//!     index.js       rendered entry script
//! ```
//!
//! The worker is started as `<worker_program> <entry_script>` with the run
//! directory as its working directory.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::environment::{BoxFuture, ExecutionEnvironment};
use super::process::{
    Mirror, WaitOutcome, drain, exit_code, resolve_program, spawn_forwarder, wait_supervised,
};
use super::stdio::StdioMode;
use crate::config::SandboxSettings;
use crate::control::{Interruption, RunControl};
use crate::deps::{DependencyDescriptor, DependencyManager, NpmDependencyManager};
use crate::errors::{CleanupError, ConnectorExecutionError, Result, SandboxError};
use crate::template::{NodeTemplateRenderer, TemplateRenderer};

pub struct ManagedRuntimeEnvironment {
    work_root: PathBuf,
    worker_program: String,
    entry_script: String,
    manifest_file: String,
    dependencies: Box<dyn DependencyManager>,
    renderer: Box<dyn TemplateRenderer>,
}

impl ManagedRuntimeEnvironment {
    /// Environment using the npm installer and the Node entry-script renderer.
    pub fn new(settings: &SandboxSettings) -> Result<Self> {
        Ok(Self {
            work_root: std::path::absolute(&settings.work_root)?,
            worker_program: settings.worker_program.clone(),
            entry_script: settings.entry_script.clone(),
            manifest_file: settings.manifest_file.clone(),
            dependencies: Box::new(NpmDependencyManager::from_settings(settings)),
            renderer: Box::new(NodeTemplateRenderer::from_settings(settings)),
        })
    }

    pub fn with_dependency_manager(mut self, manager: impl DependencyManager + 'static) -> Self {
        self.dependencies = Box::new(manager);
        self
    }

    pub fn with_renderer(mut self, renderer: impl TemplateRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    /// Directory owned by one run.
    pub fn run_dir(&self, datamart_id: &str, run_id: &str) -> PathBuf {
        self.work_root.join(datamart_id).join(run_id)
    }

    async fn create(
        &self,
        datamart_id: &str,
        run_id: &str,
        per_run: &[DependencyDescriptor],
        control: &RunControl,
    ) -> Result<PathBuf> {
        let run_dir = self.run_dir(datamart_id, run_id);

        match create_run_dir(&run_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!(
                    datamart_id,
                    run_id,
                    path = %run_dir.display(),
                    "working directory already exists"
                );
                return Err(SandboxError::EnvironmentCollision(run_dir));
            }
            Err(e) => return Err(e.into()),
        }
        debug!(datamart_id, run_id, path = %run_dir.display(), "working directory created");

        let dependencies = self.dependencies.compute_dependency_set(per_run);
        let manifest = self.dependencies.generate_manifest(datamart_id, &dependencies);
        fs::write(run_dir.join(&self.manifest_file), manifest.to_json_pretty()?).await?;
        debug!(
            datamart_id,
            run_id,
            dependencies = manifest.dependencies.len(),
            "dependency manifest written"
        );

        self.dependencies.install(&run_dir, control).await?;

        let script = self.renderer.render(&dependencies);
        fs::write(run_dir.join(&self.entry_script), script).await?;

        info!(datamart_id, run_id, path = %run_dir.display(), "environment ready");
        Ok(run_dir)
    }

    async fn execute(
        &self,
        path: &Path,
        env_vars: HashMap<String, String>,
        stdio: StdioMode,
        control: &RunControl,
    ) -> std::result::Result<(), ConnectorExecutionError> {
        let program = self.worker_program.as_str();
        let resolved = resolve_program(program).map_err(|reason| ConnectorExecutionError::Spawn {
            program: program.to_string(),
            reason,
        })?;

        let mut cmd = Command::new(&resolved);
        cmd.arg(&self.entry_script)
            .current_dir(path)
            .envs(&env_vars)
            .kill_on_drop(true);

        let capture = match stdio {
            StdioMode::Inherit => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
                None
            }
            StdioMode::Explicit {
                stdin,
                stdout,
                stderr,
            } => {
                cmd.stdin(stdin).stdout(stdout).stderr(stderr);
                None
            }
            StdioMode::Capture(capture) => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
                Some(capture)
            }
        };

        let mut child = cmd.spawn().map_err(|e| ConnectorExecutionError::Spawn {
            program: program.to_string(),
            reason: e.to_string(),
        })?;
        info!(
            path = %path.display(),
            pid = child.id(),
            program,
            "connector process started"
        );

        let mut readers = Vec::new();
        if let Some(capture) = capture {
            let (out_mirror, err_mirror) = if capture.pass_through {
                (Some(Mirror::Stdout), Some(Mirror::Stderr))
            } else {
                (None, None)
            };
            if let Some(stdout) = child.stdout.take() {
                readers.push(spawn_forwarder(stdout, capture.on_stdout.clone(), out_mirror));
            }
            if let Some(stderr) = child.stderr.take() {
                readers.push(spawn_forwarder(stderr, capture.on_stderr.clone(), err_mirror));
            }
        }

        let outcome = wait_supervised(&mut child, control, "connector").await;
        drain(readers).await;

        match outcome {
            Ok(WaitOutcome::Exited(status)) => {
                let code = exit_code(status);
                info!(
                    path = %path.display(),
                    exit_code = code,
                    success = status.success(),
                    "connector process exited"
                );
                if status.success() {
                    Ok(())
                } else {
                    Err(ConnectorExecutionError::Exited { code })
                }
            }
            Ok(WaitOutcome::Interrupted(Interruption::TimedOut(after))) => {
                warn!(path = %path.display(), ?after, "connector process timed out");
                Err(ConnectorExecutionError::TimedOut { after })
            }
            Ok(WaitOutcome::Interrupted(Interruption::Cancelled)) => {
                info!(path = %path.display(), "connector process cancelled");
                Err(ConnectorExecutionError::Cancelled)
            }
            Err(e) => Err(ConnectorExecutionError::Spawn {
                program: program.to_string(),
                reason: format!("waiting for connector process: {e}"),
            }),
        }
    }

    async fn remove(&self, datamart_id: &str, run_id: &str) -> std::result::Result<(), CleanupError> {
        let path = self.run_dir(datamart_id, run_id);
        match fs::remove_dir_all(&path).await {
            Ok(()) => {
                debug!(datamart_id, run_id, path = %path.display(), "working directory removed");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(CleanupError { path, source }),
        }

        // The datamart directory goes once its last run is gone.
        let datamart_dir = self.work_root.join(datamart_id);
        match fs::remove_dir(&datamart_dir).await {
            Ok(()) => debug!(datamart_id, "datamart directory removed"),
            Err(e) if matches!(
                e.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::DirectoryNotEmpty
            ) => {}
            Err(e) => {
                debug!(datamart_id, error = %e, "datamart directory left in place");
            }
        }
        Ok(())
    }
}

/// Create the run directory and its parent.
///
/// A concurrent cleanup may remove the shared datamart directory between the
/// two steps; that case is retried.
async fn create_run_dir(run_dir: &Path) -> io::Result<()> {
    const ATTEMPTS: usize = 5;

    let mut attempt = 1;
    loop {
        if let Some(parent) = run_dir.parent() {
            fs::create_dir_all(parent).await?;
        }
        match fs::create_dir(run_dir).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound && attempt < ATTEMPTS => {
                attempt += 1;
            }
            other => return other,
        }
    }
}

impl ExecutionEnvironment for ManagedRuntimeEnvironment {
    fn create_environment<'a>(
        &'a self,
        datamart_id: &'a str,
        run_id: &'a str,
        dependencies: &'a [DependencyDescriptor],
        control: &'a RunControl,
    ) -> BoxFuture<'a, Result<PathBuf>> {
        Box::pin(self.create(datamart_id, run_id, dependencies, control))
    }

    fn execute_connector<'a>(
        &'a self,
        path: &'a Path,
        env_vars: HashMap<String, String>,
        stdio: StdioMode,
        control: &'a RunControl,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.execute(path, env_vars, stdio, control).await?;
            Ok(())
        })
    }

    fn cleanup<'a>(
        &'a self,
        datamart_id: &'a str,
        run_id: &'a str,
    ) -> BoxFuture<'a, std::result::Result<(), CleanupError>> {
        Box::pin(self.remove(datamart_id, run_id))
    }
}
