#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use connector_sandbox::ConnectorExecutionService;
use connector_sandbox::exec::{LogCapture, ManagedRuntimeEnvironment};
use connector_sandbox::registry::InMemoryRegistry;

pub use connector_sandbox_test_utils::builders::{
    RegistryBuilder, RunConfigurationBuilder, shell_settings,
};
pub use connector_sandbox_test_utils::fake_environment::{
    Call, CallLog, RecordingEnvironment, ShellScriptRenderer,
};
pub use connector_sandbox_test_utils::{init_tracing, with_timeout};

/// Registry with source `Acme`, runtime storage `WarehouseX` and the
/// runtime-less storage `LegacyDb`.
pub fn standard_registry() -> InMemoryRegistry {
    RegistryBuilder::new()
        .with_source("Acme")
        .with_runtime_storage("WarehouseX", vec![])
        .with_plain_storage("LegacyDb")
        .build()
}

/// Real managed-runtime environment that runs `script` with `sh` and
/// "installs" with `sh -c <install>`.
pub fn shell_environment(root: &Path, install: &str, script: &str) -> ManagedRuntimeEnvironment {
    ManagedRuntimeEnvironment::new(&shell_settings(root, install))
        .expect("work root resolves")
        .with_renderer(ShellScriptRenderer::new(script))
}

pub fn shell_service(root: &Path, install: &str, script: &str) -> ConnectorExecutionService {
    ConnectorExecutionService::new(
        Arc::new(standard_registry()),
        shell_environment(root, install, script),
    )
}

/// Lines captured from the worker's stdout and stderr.
#[derive(Clone, Default)]
pub struct Captured {
    pub stdout: Arc<Mutex<Vec<String>>>,
    pub stderr: Arc<Mutex<Vec<String>>>,
}

impl Captured {
    pub fn capture(&self) -> LogCapture {
        let out = Arc::clone(&self.stdout);
        let err = Arc::clone(&self.stderr);
        LogCapture::new(
            move |line| out.lock().unwrap().push(line.to_string()),
            move |line| err.lock().unwrap().push(line.to_string()),
        )
    }

    pub fn stdout(&self) -> Vec<String> {
        self.stdout.lock().unwrap().clone()
    }

    pub fn stderr(&self) -> Vec<String> {
        self.stderr.lock().unwrap().clone()
    }
}

/// Whether anything was created for the datamart under `root`.
pub fn datamart_dir_exists(root: &Path, datamart_id: &str) -> bool {
    root.join(datamart_id).exists()
}
