// src/config/settings.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::deps::DependencyDescriptor;

/// Sandbox settings as read from a TOML file.
///
/// ```toml
/// work_root = "/var/tmp/connector-sandbox"
/// run_timeout = "30m"
/// worker_program = "node"
/// install_command = ["npm", "install", "--no-audit", "--no-fund"]
///
/// [registry_package]
/// name = "@owox/connectors"
/// version = "^0.9.0"
///
/// [[baseline]]
/// name = "@owox/connectors"
/// version = "^0.9.0"
/// ```
///
/// Every key is optional. Use [`SandboxSettings::try_from`] to validate.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSandboxSettings {
    /// Parent directory for per-run working directories.
    #[serde(default)]
    pub work_root: Option<PathBuf>,

    /// Program that executes the generated entry script.
    #[serde(default)]
    pub worker_program: Option<String>,

    #[serde(default)]
    pub entry_script: Option<String>,

    #[serde(default)]
    pub manifest_file: Option<String>,

    /// Program + arguments used to install dependencies inside the working
    /// directory.
    #[serde(default)]
    pub install_command: Option<Vec<String>>,

    /// Duration string (e.g. `"90s"`, `"2h"`) bounding install + worker time.
    #[serde(default)]
    pub run_timeout: Option<String>,

    #[serde(default)]
    pub registry_package: Option<RegistryPackage>,

    /// Support packages every worker needs. Defaults to the registry package.
    #[serde(default)]
    pub baseline: Option<Vec<DependencyDescriptor>>,
}

/// The package exporting the connector capability registry, and the names
/// of its export groups.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistryPackage {
    pub name: String,

    pub version: String,

    #[serde(default = "default_core_export")]
    pub core_export: String,

    #[serde(default = "default_storages_export")]
    pub storages_export: String,

    #[serde(default = "default_sources_export")]
    pub sources_export: String,
}

fn default_core_export() -> String {
    "Core".to_string()
}

fn default_storages_export() -> String {
    "Storages".to_string()
}

fn default_sources_export() -> String {
    "Sources".to_string()
}

impl Default for RegistryPackage {
    fn default() -> Self {
        Self {
            name: "@owox/connectors".to_string(),
            version: "latest".to_string(),
            core_export: default_core_export(),
            storages_export: default_storages_export(),
            sources_export: default_sources_export(),
        }
    }
}

impl RegistryPackage {
    /// The registry package as a dependency the worker must install.
    pub fn as_dependency(&self) -> DependencyDescriptor {
        DependencyDescriptor::new(&self.name, &self.version)
    }
}

/// Validated sandbox settings.
#[derive(Debug, Clone)]
pub struct SandboxSettings {
    pub work_root: PathBuf,
    pub worker_program: String,
    pub entry_script: String,
    pub manifest_file: String,
    pub install_command: Vec<String>,
    pub run_timeout: Duration,
    pub registry_package: RegistryPackage,
    pub baseline: Vec<DependencyDescriptor>,
}

pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(60 * 60);

pub fn default_work_root() -> PathBuf {
    std::env::temp_dir().join("connector-sandbox")
}

pub fn default_install_command() -> Vec<String> {
    ["npm", "install", "--no-audit", "--no-fund", "--loglevel=error"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for SandboxSettings {
    fn default() -> Self {
        let registry_package = RegistryPackage::default();
        Self {
            work_root: default_work_root(),
            worker_program: "node".to_string(),
            entry_script: "index.js".to_string(),
            manifest_file: "package.json".to_string(),
            install_command: default_install_command(),
            run_timeout: DEFAULT_RUN_TIMEOUT,
            baseline: vec![registry_package.as_dependency()],
            registry_package,
        }
    }
}

impl SandboxSettings {
    /// Same settings rooted at a different work directory.
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = root.into();
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_units() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration(" 3s "), Ok(Duration::from_secs(3)));
        assert_eq!(parse_duration("10m"), Ok(Duration::from_secs(600)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(7200)));
    }

    #[test]
    fn rejects_bad_durations() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("30").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("abc").is_err());
    }

    #[test]
    fn oversized_durations_are_errors() {
        let err = parse_duration("5124095576030432h").unwrap_err();
        assert!(err.contains("too large"), "{err}");
        assert!(parse_duration("307445734561825861m").is_err());
        assert!(parse_duration("99999999999999999999s").is_err());
        assert_eq!(
            parse_duration("18446744073709551615s"),
            Ok(Duration::from_secs(u64::MAX))
        );
    }

    #[test]
    fn default_baseline_is_registry_package() {
        let settings = SandboxSettings::default();
        assert_eq!(settings.baseline.len(), 1);
        assert_eq!(settings.baseline[0].name, settings.registry_package.name);
        assert_eq!(settings.run_timeout, DEFAULT_RUN_TIMEOUT);
    }
}
