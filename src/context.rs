// src/context.rs

//! Per-run context handed from the service to the execution environment.

use std::collections::HashMap;

use crate::config::RunConfiguration;
use crate::errors::Result;
use crate::exec::StdioMode;

/// Environment variable carrying the datamart id.
pub const ENV_DATAMART_ID: &str = "OW_DATAMART_ID";
/// Environment variable carrying the run id.
pub const ENV_RUN_ID: &str = "OW_RUN_ID";
/// Environment variable carrying the run configuration as JSON.
pub const ENV_CONFIG: &str = "OW_CONFIG";

/// Everything a single run needs; lives for one call to `execute`.
#[derive(Debug)]
pub struct RunContext<'a> {
    pub datamart_id: &'a str,
    pub run_id: &'a str,
    pub config: &'a RunConfiguration,
    pub stdio: StdioMode,
}

impl<'a> RunContext<'a> {
    pub fn new(
        datamart_id: &'a str,
        run_id: &'a str,
        config: &'a RunConfiguration,
        stdio: StdioMode,
    ) -> Self {
        Self {
            datamart_id,
            run_id,
            config,
            stdio,
        }
    }

    /// Variables layered over the parent environment for the worker.
    ///
    /// The configuration is serialized in full, so whatever the worker parses
    /// from `OW_CONFIG` is structurally equal to `config`.
    pub fn env_vars(&self) -> Result<HashMap<String, String>> {
        let config = serde_json::to_string(self.config)?;

        Ok(HashMap::from([
            (ENV_DATAMART_ID.to_string(), self.datamart_id.to_string()),
            (ENV_RUN_ID.to_string(), self.run_id.to_string()),
            (ENV_CONFIG.to_string(), config),
        ]))
    }

    /// Give up the context, keeping only the stdio wiring.
    pub fn into_stdio(self) -> StdioMode {
        self.stdio
    }
}
