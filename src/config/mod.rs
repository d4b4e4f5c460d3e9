// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the run request data model (`model.rs`).
//! - Define sandbox-wide settings (`settings.rs`).
//! - Load run configurations (JSON) and settings (TOML) from disk (`loader.rs`).
//! - Validate run inputs and settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod settings;
pub mod validate;

pub use loader::{load_and_validate_settings, load_run_configuration, resolve_settings};
pub use model::{KeyValue, RunConfiguration, SourceConfig, StorageConfig};
pub use settings::{RawSandboxSettings, RegistryPackage, SandboxSettings, parse_duration};
pub use validate::{is_valid_identifier, validate_run_inputs};
