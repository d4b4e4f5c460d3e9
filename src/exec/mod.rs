// src/exec/mod.rs

//! Worker provisioning and execution.
//!
//! - [`environment`] defines the `ExecutionEnvironment` seam the service
//!   drives for every run.
//! - [`managed`] is the local managed-runtime implementation: one working
//!   directory per run, dependencies installed there, entry script rendered
//!   and executed by an interpreter.
//! - [`process`] holds subprocess supervision shared by the installer and the
//!   worker (deadline/cancel handling, pipe forwarding).
//! - [`stdio`] describes how the worker's standard streams are wired.

pub mod environment;
pub mod managed;
pub mod process;
pub mod stdio;

pub use environment::{BoxFuture, ExecutionEnvironment};
pub use managed::ManagedRuntimeEnvironment;
pub use stdio::{LogCapture, OutputCallback, StdioMode};
