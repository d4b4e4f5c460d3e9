// src/deps/npm.rs

use std::collections::HashSet;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{DependencyDescriptor, DependencyManager, Manifest};
use crate::config::SandboxSettings;
use crate::control::{Interruption, RunControl};
use crate::errors::DependencyInstallError;
use crate::exec::BoxFuture;
use crate::exec::process::{
    WaitOutcome, drain, exit_code, resolve_program, spawn_debug_logger, wait_supervised,
};

/// Dependency manager backed by an npm-compatible installer.
///
/// The baseline set is normalised once, when the manager is built, and never
/// changes afterwards.
#[derive(Debug, Clone)]
pub struct NpmDependencyManager {
    baseline: Vec<DependencyDescriptor>,
    install_command: Vec<String>,
}

impl NpmDependencyManager {
    pub fn new(baseline: Vec<DependencyDescriptor>, install_command: Vec<String>) -> Self {
        Self {
            baseline: dedup_by_name(baseline),
            install_command,
        }
    }

    pub fn from_settings(settings: &SandboxSettings) -> Self {
        Self::new(settings.baseline.clone(), settings.install_command.clone())
    }

    pub fn baseline(&self) -> &[DependencyDescriptor] {
        &self.baseline
    }

    async fn run_installer(
        &self,
        work_dir: &Path,
        control: &RunControl,
    ) -> Result<(), DependencyInstallError> {
        let (program, args) = self.install_command.split_first().ok_or_else(|| {
            DependencyInstallError::Spawn {
                program: String::new(),
                reason: "install command is empty".to_string(),
            }
        })?;

        let resolved = resolve_program(program).map_err(|reason| DependencyInstallError::Spawn {
            program: program.clone(),
            reason,
        })?;

        info!(
            dir = %work_dir.display(),
            installer = %program,
            "installing worker dependencies"
        );

        let mut cmd = Command::new(&resolved);
        cmd.args(args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| DependencyInstallError::Spawn {
            program: program.clone(),
            reason: e.to_string(),
        })?;

        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_debug_logger(stdout, "installer", "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_debug_logger(stderr, "installer", "stderr"));
        }

        let outcome = wait_supervised(&mut child, control, "installer").await;
        drain(readers).await;

        match outcome {
            Ok(WaitOutcome::Exited(status)) if status.success() => {
                debug!(dir = %work_dir.display(), "dependency installation finished");
                Ok(())
            }
            Ok(WaitOutcome::Exited(status)) => {
                let code = exit_code(status);
                warn!(dir = %work_dir.display(), exit_code = code, "dependency installation failed");
                Err(DependencyInstallError::Exited { code })
            }
            Ok(WaitOutcome::Interrupted(Interruption::TimedOut(after))) => {
                Err(DependencyInstallError::TimedOut { after })
            }
            Ok(WaitOutcome::Interrupted(Interruption::Cancelled)) => {
                Err(DependencyInstallError::Cancelled)
            }
            Err(e) => Err(DependencyInstallError::Spawn {
                program: program.clone(),
                reason: format!("waiting for installer: {e}"),
            }),
        }
    }
}

impl DependencyManager for NpmDependencyManager {
    fn compute_dependency_set(
        &self,
        per_run: &[DependencyDescriptor],
    ) -> Vec<DependencyDescriptor> {
        let mut seen: HashSet<&str> = self.baseline.iter().map(|d| d.name.as_str()).collect();
        let mut set = self.baseline.clone();

        for dep in per_run {
            if seen.insert(dep.name.as_str()) {
                set.push(dep.clone());
            } else {
                debug!(dependency = %dep.name, "dependency already provided; keeping earlier entry");
            }
        }

        set
    }

    fn generate_manifest(
        &self,
        connector_id: &str,
        dependencies: &[DependencyDescriptor],
    ) -> Manifest {
        Manifest::new(connector_id, dependencies)
    }

    fn install<'a>(
        &'a self,
        work_dir: &'a Path,
        control: &'a RunControl,
    ) -> BoxFuture<'a, Result<(), DependencyInstallError>> {
        Box::pin(self.run_installer(work_dir, control))
    }
}

fn dedup_by_name(deps: Vec<DependencyDescriptor>) -> Vec<DependencyDescriptor> {
    let mut seen = HashSet::new();
    deps.into_iter()
        .filter(|d| seen.insert(d.name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn manager(install: &[&str]) -> NpmDependencyManager {
        NpmDependencyManager::new(
            vec![
                DependencyDescriptor::new("@owox/connectors", "0.9.0").namespace("Connectors"),
                DependencyDescriptor::new("lodash", "4.17.21").namespace("_"),
            ],
            install.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn baseline_wins_on_collision() {
        let mgr = manager(&["true"]);
        let set = mgr.compute_dependency_set(&[
            DependencyDescriptor::new("lodash", "3.0.0"),
            DependencyDescriptor::new("pg", "8.11.0").members(["Client"]),
        ]);

        let names: Vec<_> = set.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["@owox/connectors", "lodash", "pg"]);
        assert_eq!(set[1].version, "4.17.21");
        assert_eq!(set[2].bindings, vec!["Client"]);
    }

    #[test]
    fn empty_per_run_yields_baseline() {
        let mgr = manager(&["true"]);
        assert_eq!(mgr.compute_dependency_set(&[]), mgr.baseline().to_vec());
    }

    #[test]
    fn baseline_duplicates_are_collapsed_at_construction() {
        let mgr = NpmDependencyManager::new(
            vec![
                DependencyDescriptor::new("a", "1"),
                DependencyDescriptor::new("a", "2"),
            ],
            vec!["true".to_string()],
        );
        assert_eq!(mgr.baseline().len(), 1);
        assert_eq!(mgr.baseline()[0].version, "1");
    }

    #[tokio::test]
    async fn install_success_and_failure() {
        let dir = tempfile::tempdir().unwrap();
        let control = RunControl::unbounded();

        let ok = manager(&["sh", "-c", "exit 0"]);
        ok.install(dir.path(), &control).await.unwrap();

        let failing = manager(&["sh", "-c", "echo broken >&2; exit 3"]);
        let err = failing.install(dir.path(), &control).await.unwrap_err();
        assert_eq!(err.exit_code(), Some(3));
    }

    #[tokio::test]
    async fn install_runs_inside_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(&["sh", "-c", "touch installed.marker"]);
        mgr.install(dir.path(), &RunControl::unbounded()).await.unwrap();
        assert!(dir.path().join("installed.marker").exists());
    }

    #[tokio::test]
    async fn missing_installer_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(&["no-such-installer-9137"]);
        let err = mgr
            .install(dir.path(), &RunControl::unbounded())
            .await
            .unwrap_err();
        assert!(matches!(err, DependencyInstallError::Spawn { program, .. } if program == "no-such-installer-9137"));
    }

    #[tokio::test]
    async fn hung_installer_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(&["sh", "-c", "sleep 30"]);
        let control = RunControl::with_timeout(Duration::from_millis(150));
        let err = mgr.install(dir.path(), &control).await.unwrap_err();
        assert!(matches!(err, DependencyInstallError::TimedOut { .. }));
    }
}
