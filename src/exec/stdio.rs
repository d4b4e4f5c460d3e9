// src/exec/stdio.rs

use std::fmt;
use std::process::Stdio;
use std::sync::Arc;

/// Callback receiving one line of worker output (without the line ending).
pub type OutputCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// How the worker's standard streams are wired.
pub enum StdioMode {
    /// Share the parent's stdin/stdout/stderr (interactive and CLI runs).
    Inherit,

    /// Use caller-provided streams or file descriptors as-is.
    Explicit {
        stdin: Stdio,
        stdout: Stdio,
        stderr: Stdio,
    },

    /// Pipe stdout/stderr and hand every line to the capture callbacks.
    Capture(LogCapture),
}

impl Default for StdioMode {
    fn default() -> Self {
        StdioMode::Inherit
    }
}

impl fmt::Debug for StdioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StdioMode::Inherit => f.write_str("Inherit"),
            StdioMode::Explicit { .. } => f.write_str("Explicit"),
            StdioMode::Capture(capture) => f.debug_tuple("Capture").field(capture).finish(),
        }
    }
}

/// Structured log capture for service-side runs.
#[derive(Clone)]
pub struct LogCapture {
    pub on_stdout: OutputCallback,
    pub on_stderr: OutputCallback,
    /// Also mirror captured output to the parent's own stdout/stderr.
    pub pass_through: bool,
}

impl LogCapture {
    pub fn new<O, E>(on_stdout: O, on_stderr: E) -> Self
    where
        O: Fn(&str) + Send + Sync + 'static,
        E: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            on_stdout: Arc::new(on_stdout),
            on_stderr: Arc::new(on_stderr),
            pass_through: false,
        }
    }

    pub fn pass_through(mut self, enabled: bool) -> Self {
        self.pass_through = enabled;
        self
    }
}

impl fmt::Debug for LogCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogCapture")
            .field("pass_through", &self.pass_through)
            .finish_non_exhaustive()
    }
}

impl From<LogCapture> for StdioMode {
    fn from(capture: LogCapture) -> Self {
        StdioMode::Capture(capture)
    }
}
