// src/errors.rs

//! Crate-wide error types.
//!
//! Every stage of a run has its own error shape so callers can decide on
//! retry policy without string matching:
//! - [`ValidationError`] fails fast, before any filesystem or process work.
//! - [`DependencyInstallError`] and [`ConnectorExecutionError`] describe how a
//!   subprocess ended (exit code, spawn failure, timeout, cancellation).
//! - [`CleanupError`] is only ever logged.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage '{0}' not found in capability registry")]
    StorageNotFound(String),

    #[error("Source '{0}' not found in capability registry")]
    SourceNotFound(String),

    #[error("Storage '{0}' does not support isolated runtime execution")]
    StorageEnvironmentUnsupported(String),

    #[error("Working directory already exists: {}", .0.display())]
    EnvironmentCollision(PathBuf),

    #[error(transparent)]
    DependencyInstall(#[from] DependencyInstallError),

    #[error(transparent)]
    ConnectorExecution(#[from] ConnectorExecutionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// A required run input is missing or malformed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' must be a single path segment (got '{value}')")]
    InvalidPathSegment { field: &'static str, value: String },

    #[error("'{0}' is not a valid identifier")]
    InvalidIdentifier(String),
}

/// The dependency installation subprocess did not succeed.
#[derive(Error, Debug)]
pub enum DependencyInstallError {
    #[error("dependency installation exited with code {code}")]
    Exited { code: i32 },

    #[error("failed to start installer '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("dependency installation timed out after {after:?}")]
    TimedOut { after: Duration },

    #[error("dependency installation was cancelled")]
    Cancelled,
}

impl DependencyInstallError {
    /// Exit code of the installer, when it ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            DependencyInstallError::Exited { code } => Some(*code),
            _ => None,
        }
    }
}

/// The worker process failed, could not start, or ran out of time.
#[derive(Error, Debug)]
pub enum ConnectorExecutionError {
    #[error("connector process exited with code {code}")]
    Exited { code: i32 },

    #[error("failed to start connector process '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("connector process timed out after {after:?}")]
    TimedOut { after: Duration },

    #[error("connector process was cancelled")]
    Cancelled,
}

impl ConnectorExecutionError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ConnectorExecutionError::Exited { code } => Some(*code),
            _ => None,
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, ConnectorExecutionError::TimedOut { .. })
    }
}

/// Removing a working directory failed. Never propagated over a run outcome.
#[derive(Error, Debug)]
#[error("failed to remove working directory {}: {source}", path.display())]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

pub type Result<T> = std::result::Result<T, SandboxError>;
