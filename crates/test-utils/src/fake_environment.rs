use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use connector_sandbox::control::RunControl;
use connector_sandbox::deps::DependencyDescriptor;
use connector_sandbox::errors::{CleanupError, Result, SandboxError};
use connector_sandbox::exec::{BoxFuture, ExecutionEnvironment, StdioMode};
use connector_sandbox::template::TemplateRenderer;

/// One call the service made on the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create {
        datamart_id: String,
        run_id: String,
        dependencies: Vec<String>,
    },
    Execute {
        path: PathBuf,
        env: HashMap<String, String>,
    },
    Cleanup {
        datamart_id: String,
        run_id: String,
    },
}

/// Shared view of the calls recorded by a [`RecordingEnvironment`].
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    /// Calls made for one run, in order.
    pub fn calls_for(&self, datamart_id: &str, run_id: &str) -> Vec<Call> {
        let suffix = Path::new(datamart_id).join(run_id);
        self.calls()
            .into_iter()
            .filter(|c| match c {
                Call::Create {
                    datamart_id: d,
                    run_id: r,
                    ..
                }
                | Call::Cleanup {
                    datamart_id: d,
                    run_id: r,
                } => d == datamart_id && r == run_id,
                Call::Execute { path, .. } => path.ends_with(&suffix),
            })
            .collect()
    }

    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }
}

type ErrorFactory = Box<dyn Fn() -> SandboxError + Send + Sync>;

/// A fake execution environment that:
/// - records every call in a [`CallLog`]
/// - returns `/fake/<datamart_id>/<run_id>` from `create_environment`
/// - succeeds unless told to fail a given step.
pub struct RecordingEnvironment {
    log: CallLog,
    create_error: Option<ErrorFactory>,
    execute_error: Option<ErrorFactory>,
    fail_cleanup: bool,
    execute_delay: Option<Duration>,
}

impl RecordingEnvironment {
    pub fn new() -> (Self, CallLog) {
        let log = CallLog::default();
        let env = Self {
            log: log.clone(),
            create_error: None,
            execute_error: None,
            fail_cleanup: false,
            execute_delay: None,
        };
        (env, log)
    }

    pub fn fail_create_with<F>(mut self, make: F) -> Self
    where
        F: Fn() -> SandboxError + Send + Sync + 'static,
    {
        self.create_error = Some(Box::new(make));
        self
    }

    pub fn fail_execute_with<F>(mut self, make: F) -> Self
    where
        F: Fn() -> SandboxError + Send + Sync + 'static,
    {
        self.execute_error = Some(Box::new(make));
        self
    }

    pub fn fail_cleanup(mut self) -> Self {
        self.fail_cleanup = true;
        self
    }

    /// Make every `execute_connector` call take this long.
    pub fn with_execute_delay(mut self, delay: Duration) -> Self {
        self.execute_delay = Some(delay);
        self
    }
}

impl ExecutionEnvironment for RecordingEnvironment {
    fn create_environment<'a>(
        &'a self,
        datamart_id: &'a str,
        run_id: &'a str,
        dependencies: &'a [DependencyDescriptor],
        _control: &'a RunControl,
    ) -> BoxFuture<'a, Result<PathBuf>> {
        Box::pin(async move {
            self.log.push(Call::Create {
                datamart_id: datamart_id.to_string(),
                run_id: run_id.to_string(),
                dependencies: dependencies.iter().map(|d| d.name.clone()).collect(),
            });

            match &self.create_error {
                Some(make) => Err(make()),
                None => Ok(PathBuf::from("/fake").join(datamart_id).join(run_id)),
            }
        })
    }

    fn execute_connector<'a>(
        &'a self,
        path: &'a Path,
        env_vars: HashMap<String, String>,
        _stdio: StdioMode,
        _control: &'a RunControl,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if let Some(delay) = self.execute_delay {
                tokio::time::sleep(delay).await;
            }

            self.log.push(Call::Execute {
                path: path.to_path_buf(),
                env: env_vars,
            });

            match &self.execute_error {
                Some(make) => Err(make()),
                None => Ok(()),
            }
        })
    }

    fn cleanup<'a>(
        &'a self,
        datamart_id: &'a str,
        run_id: &'a str,
    ) -> BoxFuture<'a, std::result::Result<(), CleanupError>> {
        Box::pin(async move {
            self.log.push(Call::Cleanup {
                datamart_id: datamart_id.to_string(),
                run_id: run_id.to_string(),
            });

            if self.fail_cleanup {
                Err(CleanupError {
                    path: PathBuf::from("/fake").join(datamart_id).join(run_id),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
                })
            } else {
                Ok(())
            }
        })
    }
}

/// Renderer that writes a fixed shell script regardless of dependencies.
///
/// Pair with `builders::shell_settings` to run real processes without Node.
#[derive(Debug, Clone)]
pub struct ShellScriptRenderer {
    script: String,
}

impl ShellScriptRenderer {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl TemplateRenderer for ShellScriptRenderer {
    fn render(&self, _dependencies: &[DependencyDescriptor]) -> String {
        self.script.clone()
    }
}
