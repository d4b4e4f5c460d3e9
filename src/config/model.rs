// src/config/model.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::RunType;

/// One execution request, as handed to the worker in `OW_CONFIG`.
///
/// A run configuration file mirrors this struct directly:
///
/// ```json
/// {
///   "datamartId": "dm1",
///   "runId": "r1",
///   "name": "Daily ads",
///   "source": { "name": "FacebookMarketing", "config": { "AccessToken": "..." } },
///   "storage": { "name": "GoogleBigQuery", "config": { "DatasetId": "ads" } },
///   "runType": "INCREMENTAL",
///   "data": [{ "key": "StartDate", "value": "2024-01-01" }],
///   "state": {}
/// }
/// ```
///
/// Everything except `source` and `storage` is optional. The value is never
/// mutated once loaded; the service only borrows it for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfiguration {
    #[serde(default)]
    pub datamart_id: String,

    #[serde(default)]
    pub run_id: String,

    #[serde(default)]
    pub name: String,

    pub source: SourceConfig,

    pub storage: StorageConfig,

    #[serde(default)]
    pub run_type: RunType,

    /// Run-time parameters (date windows, overrides, ...).
    #[serde(default)]
    pub data: Vec<KeyValue>,

    /// Resumable connector state from the previous run.
    #[serde(default = "empty_object")]
    pub state: Value,
}

/// `source` section: which connector to run and its settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,

    #[serde(default = "empty_object")]
    pub config: Value,
}

/// `storage` section: which storage target receives the rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub name: String,

    #[serde(default = "empty_object")]
    pub config: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: Value,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl RunConfiguration {
    /// Minimal configuration for a source/storage pair.
    pub fn new(source: impl Into<String>, storage: impl Into<String>) -> Self {
        Self {
            datamart_id: String::new(),
            run_id: String::new(),
            name: String::new(),
            source: SourceConfig {
                name: source.into(),
                config: empty_object(),
            },
            storage: StorageConfig {
                name: storage.into(),
                config: empty_object(),
            },
            run_type: RunType::default(),
            data: Vec::new(),
            state: empty_object(),
        }
    }

    /// Look up a run-time parameter by key.
    pub fn data_value(&self, key: &str) -> Option<&Value> {
        self.data.iter().find(|kv| kv.key == key).map(|kv| &kv.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_camel_case_with_defaults() {
        let cfg: RunConfiguration = serde_json::from_value(json!({
            "datamartId": "dm1",
            "source": { "name": "Acme" },
            "storage": { "name": "WarehouseX", "config": { "table": "t" } },
            "runType": "MANUAL_BACKFILL",
            "data": [{ "key": "StartDate", "value": "2024-01-01" }]
        }))
        .unwrap();

        assert_eq!(cfg.datamart_id, "dm1");
        assert_eq!(cfg.run_id, "");
        assert_eq!(cfg.source.name, "Acme");
        assert_eq!(cfg.source.config, json!({}));
        assert_eq!(cfg.storage.config["table"], "t");
        assert_eq!(cfg.run_type, RunType::ManualBackfill);
        assert_eq!(cfg.data_value("StartDate"), Some(&json!("2024-01-01")));
        assert_eq!(cfg.state, json!({}));
    }

    #[test]
    fn missing_storage_is_rejected() {
        let res: Result<RunConfiguration, _> =
            serde_json::from_value(json!({ "source": { "name": "Acme" } }));
        assert!(res.is_err());
    }
}
