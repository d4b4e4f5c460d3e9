// src/deps/manifest.rs

use std::collections::BTreeMap;

use serde::Serialize;

use super::DependencyDescriptor;

/// Dependency manifest written into a working directory.
///
/// Serializes to the package-manifest shape the installer expects:
///
/// ```json
/// { "name": "connector-dm1", "private": true, "dependencies": { "lodash": "^4.17.21" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub name: String,
    pub private: bool,
    pub dependencies: BTreeMap<String, String>,
}

impl Manifest {
    pub fn new(connector_id: &str, dependencies: &[DependencyDescriptor]) -> Self {
        let mut deps = BTreeMap::new();
        for dep in dependencies {
            // First occurrence wins, matching dependency-set precedence.
            deps.entry(dep.name.clone())
                .or_insert_with(|| dep.version.clone());
        }

        Self {
            name: format!("connector-{}", package_safe(connector_id)),
            private: true,
            dependencies: deps,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Lowercase and replace anything a package name can't hold with `-`.
fn package_safe(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches(['.', '_']);
    if trimmed.is_empty() {
        "run".to_string()
    } else {
        trimmed.to_string()
    }
}
