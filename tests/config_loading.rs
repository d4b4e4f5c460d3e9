use std::fs;
use std::time::Duration;

use connector_sandbox::config::{load_and_validate_settings, load_run_configuration};
use connector_sandbox::errors::SandboxError;
use connector_sandbox::registry::{CapabilityRegistry, load_registry};
use connector_sandbox::types::RunType;

#[test]
fn run_configuration_from_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("job.json");
    fs::write(
        &path,
        r#"{
            "name": "Nightly",
            "source": { "name": "Acme", "config": { "AccessToken": "t" } },
            "storage": { "name": "WarehouseX" },
            "runType": "MANUAL_BACKFILL",
            "data": [{ "key": "StartDate", "value": "2024-01-01" }]
        }"#,
    )
    .unwrap();

    let config = load_run_configuration(&path).unwrap();
    assert_eq!(config.source.name, "Acme");
    assert_eq!(config.storage.name, "WarehouseX");
    assert_eq!(config.run_type, RunType::ManualBackfill);
    assert_eq!(
        config.data_value("StartDate"),
        Some(&serde_json::json!("2024-01-01"))
    );
    assert!(config.state.as_object().is_some_and(|m| m.is_empty()));
}

#[test]
fn malformed_run_configuration_is_a_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("job.json");
    fs::write(&path, r#"{ "source": { "name": "Acme" } }"#).unwrap();

    assert!(matches!(load_run_configuration(&path), Err(SandboxError::Json(_))));
    assert!(matches!(
        load_run_configuration(dir.path().join("absent.json")),
        Err(SandboxError::Io(_))
    ));
}

#[test]
fn settings_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Sandbox.toml");
    fs::write(
        &path,
        r#"
work_root = "/var/tmp/sandbox-runs"
run_timeout = "90s"
install_command = ["pnpm", "install"]

[registry_package]
name = "my-connectors"
version = "2.1.0"

[[baseline]]
name = "my-connectors"
version = "2.1.0"

[[baseline]]
name = "lodash"
version = "4.17.21"
bindings = ["_"]
bind_as_namespace = true
"#,
    )
    .unwrap();

    let settings = load_and_validate_settings(&path).unwrap();
    assert_eq!(settings.work_root, std::path::PathBuf::from("/var/tmp/sandbox-runs"));
    assert_eq!(settings.run_timeout, Duration::from_secs(90));
    assert_eq!(settings.install_command, vec!["pnpm", "install"]);
    assert_eq!(settings.worker_program, "node");
    assert_eq!(settings.registry_package.name, "my-connectors");
    assert_eq!(settings.registry_package.sources_export, "Sources");
    assert_eq!(settings.baseline.len(), 2);
    assert!(settings.baseline[1].bind_as_namespace);
}

#[test]
fn invalid_settings_are_config_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Sandbox.toml");
    fs::write(&path, "run_timeout = \"soon\"\n").unwrap();

    assert!(matches!(
        load_and_validate_settings(&path),
        Err(SandboxError::Config(msg)) if msg.starts_with("run_timeout")
    ));

    fs::write(&path, "run_timeout = [1]\n").unwrap();
    assert!(matches!(load_and_validate_settings(&path), Err(SandboxError::Toml(_))));
}

#[test]
fn registry_file_drives_capability_lookups() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Registry.toml");
    fs::write(
        &path,
        r#"
[source.Acme]
description = "Acme ads API"

[storage.WarehouseX.environment.runtime]
enabled = true
dependencies = [{ name = "pg", version = "8.11.0", bindings = ["Client"] }]

[storage.LegacyDb]
"#,
    )
    .unwrap();

    let registry = load_registry(&path).unwrap();
    assert!(registry.has_source("Acme"));

    let runtime = registry.storage("WarehouseX").unwrap();
    let runtime = runtime.enabled_runtime().unwrap();
    assert_eq!(runtime.dependencies[0].name, "pg");
    assert_eq!(runtime.dependencies[0].bindings, vec!["Client"]);

    let legacy = registry.storage("LegacyDb").unwrap();
    assert!(legacy.enabled_runtime().is_none());
}
