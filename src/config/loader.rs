// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::RunConfiguration;
use crate::config::settings::{RawSandboxSettings, SandboxSettings};
use crate::errors::Result;

/// Load a run configuration (JSON) from disk.
///
/// Only deserializes; the ids and names are checked by the service when the
/// run is executed.
pub fn load_run_configuration(path: impl AsRef<Path>) -> Result<RunConfiguration> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RunConfiguration = serde_json::from_str(&contents)?;
    Ok(config)
}

/// Load raw sandbox settings (TOML) without validation.
pub fn load_settings_from_path(path: impl AsRef<Path>) -> Result<RawSandboxSettings> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawSandboxSettings = toml::from_str(&contents)?;
    Ok(raw)
}

/// Load and validate sandbox settings.
pub fn load_and_validate_settings(path: impl AsRef<Path>) -> Result<SandboxSettings> {
    let raw = load_settings_from_path(path)?;
    SandboxSettings::try_from(raw)
}

/// Settings file picked up when `--settings` is not given.
pub fn default_settings_path() -> PathBuf {
    PathBuf::from("Sandbox.toml")
}

/// Resolve settings for the CLI.
///
/// - An explicit path must exist and be valid.
/// - Otherwise `Sandbox.toml` in the working directory is used if present.
/// - Otherwise built-in defaults apply.
pub fn resolve_settings(explicit: Option<&Path>) -> Result<SandboxSettings> {
    match explicit {
        Some(path) => load_and_validate_settings(path),
        None => {
            let path = default_settings_path();
            if path.is_file() {
                load_and_validate_settings(&path)
            } else {
                Ok(SandboxSettings::default())
            }
        }
    }
}
