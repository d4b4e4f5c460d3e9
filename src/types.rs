// src/types.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a run was started.
///
/// - `Incremental`: regular scheduled run continuing from the saved state.
/// - `ManualBackfill`: operator-requested reload of a historical window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunType {
    Incremental,
    ManualBackfill,
}

impl Default for RunType {
    fn default() -> Self {
        RunType::Incremental
    }
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunType::Incremental => f.write_str("INCREMENTAL"),
            RunType::ManualBackfill => f.write_str("MANUAL_BACKFILL"),
        }
    }
}
