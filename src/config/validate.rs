// src/config/validate.rs

use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::model::RunConfiguration;
use crate::config::settings::{
    DEFAULT_RUN_TIMEOUT, RawSandboxSettings, SandboxSettings, default_install_command,
    default_work_root, parse_duration,
};
use crate::errors::{Result, SandboxError, ValidationError};

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("identifier pattern is a valid regex")
});

/// Names used for source/storage lookups: a letter followed by letters,
/// digits or underscores.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Check the inputs of one `execute` call.
///
/// Runs before anything touches the filesystem, so a failure here leaves no
/// trace of the run.
pub fn validate_run_inputs(
    datamart_id: &str,
    run_id: &str,
    config: &RunConfiguration,
) -> std::result::Result<(), ValidationError> {
    require("datamartId", datamart_id)?;
    require("runId", run_id)?;
    require("config.source.name", &config.source.name)?;
    require("config.storage.name", &config.storage.name)?;

    // Both ids become directory names under the work root.
    validate_path_segment("datamartId", datamart_id)?;
    validate_path_segment("runId", run_id)?;
    Ok(())
}

fn require(field: &'static str, value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

fn validate_path_segment(
    field: &'static str,
    value: &str,
) -> std::result::Result<(), ValidationError> {
    let mut components = Path::new(value).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    if !single_normal || value.contains(['/', '\\']) {
        return Err(ValidationError::InvalidPathSegment {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

impl TryFrom<RawSandboxSettings> for SandboxSettings {
    type Error = SandboxError;

    fn try_from(raw: RawSandboxSettings) -> Result<Self> {
        let defaults = SandboxSettings::default();

        let run_timeout = match raw.run_timeout.as_deref() {
            Some(s) => parse_duration(s)
                .map_err(|e| SandboxError::Config(format!("run_timeout: {e}")))?,
            None => DEFAULT_RUN_TIMEOUT,
        };
        if run_timeout.is_zero() {
            return Err(SandboxError::Config(
                "run_timeout must be greater than zero".to_string(),
            ));
        }

        let install_command = raw.install_command.unwrap_or_else(default_install_command);
        if install_command.first().is_none_or(|p| p.trim().is_empty()) {
            return Err(SandboxError::Config(
                "install_command must name a program".to_string(),
            ));
        }

        let worker_program = raw.worker_program.unwrap_or(defaults.worker_program);
        if worker_program.trim().is_empty() {
            return Err(SandboxError::Config(
                "worker_program must not be empty".to_string(),
            ));
        }

        let entry_script = raw.entry_script.unwrap_or(defaults.entry_script);
        let manifest_file = raw.manifest_file.unwrap_or(defaults.manifest_file);
        for (key, name) in [("entry_script", &entry_script), ("manifest_file", &manifest_file)] {
            if validate_path_segment("file", name).is_err() {
                return Err(SandboxError::Config(format!(
                    "{key} must be a plain file name (got '{name}')"
                )));
            }
        }
        if entry_script == manifest_file {
            return Err(SandboxError::Config(
                "entry_script and manifest_file must differ".to_string(),
            ));
        }

        let registry_package = raw.registry_package.unwrap_or_default();
        let baseline = raw
            .baseline
            .unwrap_or_else(|| vec![registry_package.as_dependency()]);
        for dep in &baseline {
            if dep.name.trim().is_empty() || dep.version.trim().is_empty() {
                return Err(SandboxError::Config(format!(
                    "baseline dependency '{}' needs a name and a version",
                    dep.name
                )));
            }
        }

        Ok(SandboxSettings {
            work_root: raw.work_root.unwrap_or_else(default_work_root),
            worker_program,
            entry_script,
            manifest_file,
            install_command,
            run_timeout,
            registry_package,
            baseline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RunConfiguration {
        RunConfiguration::new("Acme", "WarehouseX")
    }

    #[test]
    fn accepts_plain_ids() {
        assert_eq!(validate_run_inputs("dm1", "r1", &config()), Ok(()));
    }

    #[test]
    fn reports_first_missing_field() {
        assert_eq!(
            validate_run_inputs("", "r1", &config()),
            Err(ValidationError::MissingField("datamartId"))
        );
        assert_eq!(
            validate_run_inputs("dm1", "  ", &config()),
            Err(ValidationError::MissingField("runId"))
        );

        let mut cfg = config();
        cfg.storage.name.clear();
        assert_eq!(
            validate_run_inputs("dm1", "r1", &cfg),
            Err(ValidationError::MissingField("config.storage.name"))
        );
    }

    #[test]
    fn rejects_ids_that_escape_the_work_root() {
        for bad in ["..", ".", "a/b", "../x", "a\\b", "/abs"] {
            let res = validate_run_inputs("dm1", bad, &config());
            assert!(
                matches!(res, Err(ValidationError::InvalidPathSegment { field: "runId", .. })),
                "expected {bad:?} to be rejected, got {res:?}"
            );
        }
    }

    #[test]
    fn identifiers() {
        assert!(is_valid_identifier("GoogleBigQuery"));
        assert!(is_valid_identifier("Aws_Athena2"));
        assert!(!is_valid_identifier("2fast"));
        assert!(!is_valid_identifier("Bad-Name"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn raw_settings_defaults_validate() {
        let settings = SandboxSettings::try_from(RawSandboxSettings::default()).unwrap();
        assert_eq!(settings.worker_program, "node");
        assert_eq!(settings.manifest_file, "package.json");
        assert_eq!(settings.run_timeout, DEFAULT_RUN_TIMEOUT);
    }

    #[test]
    fn raw_settings_reject_zero_timeout_and_empty_installer() {
        let raw = RawSandboxSettings {
            run_timeout: Some("0s".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            SandboxSettings::try_from(raw),
            Err(SandboxError::Config(msg)) if msg.contains("greater than zero")
        ));

        let raw = RawSandboxSettings {
            install_command: Some(vec![]),
            ..Default::default()
        };
        assert!(matches!(
            SandboxSettings::try_from(raw),
            Err(SandboxError::Config(msg)) if msg.contains("install_command")
        ));
    }

    #[test]
    fn raw_settings_reject_overflowing_timeout() {
        let raw = RawSandboxSettings {
            run_timeout: Some("5124095576030432h".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            SandboxSettings::try_from(raw),
            Err(SandboxError::Config(msg)) if msg.starts_with("run_timeout") && msg.contains("too large")
        ));
    }

    #[test]
    fn raw_settings_reject_nested_file_names() {
        let raw = RawSandboxSettings {
            entry_script: Some("sub/index.js".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            SandboxSettings::try_from(raw),
            Err(SandboxError::Config(msg)) if msg.contains("entry_script")
        ));
    }
}
