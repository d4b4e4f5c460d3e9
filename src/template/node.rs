// src/template/node.rs

use serde_json::Value;

use super::TemplateRenderer;
use crate::config::{RegistryPackage, SandboxSettings};
use crate::context::{ENV_CONFIG, ENV_DATAMART_ID, ENV_RUN_ID};
use crate::deps::DependencyDescriptor;

/// Helpers shared by every generated script.
///
/// Dependencies are bound into an explicit `context` object handed to
/// `main`; nothing is attached to the global object. The registry lookup
/// tables are filled once at startup and every entry is checked to be a
/// constructor at that point.
const PRELUDE: &str = r#"'use strict';
// Generated worker entry script. Rebuilt for every run; do not edit.

function createContext() {
  const bindings = Object.create(null);
  const bind = (name, value) => {
    if (name in bindings) {
      throw new Error(`binding "${name}" is defined twice`);
    }
    bindings[name] = value;
  };

  return {
    bindings,
    core: {},
    registry: null,
    bindNamespace(name, mod) {
      bind(name, mod);
    },
    bindMembers(mod, names) {
      for (const name of names) {
        if (!(name in mod)) {
          throw new Error(`module does not export "${name}"`);
        }
        bind(name, mod[name]);
      }
    },
  };
}

const KIND_PATTERN = /^([A-Za-z][A-Za-z0-9_]*)(Source|Connector|Storage)$/;

function buildRegistry(groups) {
  const tables = { Source: new Map(), Connector: new Map(), Storage: new Map() };

  const register = (exportName, value) => {
    const match = KIND_PATTERN.exec(exportName);
    if (!match) {
      return;
    }
    if (typeof value !== 'function') {
      throw new Error(`registry entry "${exportName}" is not a constructor`);
    }
    const [, name, kind] = match;
    if (tables[kind].has(name)) {
      throw new Error(`registry entry "${exportName}" is registered twice`);
    }
    tables[kind].set(name, value);
  };

  for (const group of groups) {
    for (const [key, value] of Object.entries(group || {})) {
      if (value && typeof value === 'object') {
        for (const [member, inner] of Object.entries(value)) {
          register(member, inner);
        }
      } else {
        register(key, value);
      }
    }
  }

  return {
    resolve(kind, name) {
      const factory = tables[kind].get(name);
      if (!factory) {
        const known = [...tables[kind].keys()].sort().join(', ') || 'none';
        throw new Error(`unknown ${kind.toLowerCase()} "${name}" (known: ${known})`);
      }
      return factory;
    },
  };
}

function readEnv(name) {
  const value = process.env[name];
  if (value === undefined || value === '') {
    throw new Error(`environment variable ${name} is not set`);
  }
  return value;
}
"#;

/// Renders a Node.js entry script that loads the registry package and runs
/// `<Name>Connector(<Name>Source, <Name>Storage)`.
#[derive(Debug, Clone)]
pub struct NodeTemplateRenderer {
    package: RegistryPackage,
}

impl NodeTemplateRenderer {
    pub fn new(package: RegistryPackage) -> Self {
        Self { package }
    }

    pub fn from_settings(settings: &SandboxSettings) -> Self {
        Self::new(settings.registry_package.clone())
    }

    fn registry_bootstrap(&self) -> String {
        let pkg = &self.package;
        format!(
            "\n// capability registry\n\
             const registryModule = require({name});\n\
             context.core = registryModule[{core}] || {{}};\n\
             context.registry = buildRegistry([registryModule[{sources}], registryModule[{storages}]]);\n",
            name = js_string(&pkg.name),
            core = js_string(&pkg.core_export),
            sources = js_string(&pkg.sources_export),
            storages = js_string(&pkg.storages_export),
        )
    }

    fn main_routine(&self) -> String {
        format!(
            r#"
async function main(context) {{
  const config = JSON.parse(readEnv({config}));
  const run = {{
    datamartId: readEnv({datamart}),
    runId: readEnv({run_id}),
    runType: config.runType,
    data: config.data || [],
    state: config.state || {{}},
  }};

  const Source = context.registry.resolve('Source', config.source.name);
  const Storage = context.registry.resolve('Storage', config.storage.name);
  const Connector = context.registry.resolve('Connector', config.source.name);

  const source = new Source(config.source.config || {{}}, context);
  const storage = new Storage(config.storage.config || {{}}, context);
  const connector = new Connector(source, storage, context);
  await connector.run(run);
}}

main(context).catch((err) => {{
  console.error(err && err.stack ? err.stack : err);
  process.exitCode = 1;
}});
"#,
            config = js_string(ENV_CONFIG),
            datamart = js_string(ENV_DATAMART_ID),
            run_id = js_string(ENV_RUN_ID),
        )
    }
}

impl TemplateRenderer for NodeTemplateRenderer {
    fn render(&self, dependencies: &[DependencyDescriptor]) -> String {
        let mut out = String::with_capacity(PRELUDE.len() + 1024);
        out.push_str(PRELUDE);
        out.push_str("\nconst context = createContext();\n");

        if !dependencies.is_empty() {
            out.push_str("\n// dependencies\n");
            for dep in dependencies {
                out.push_str(&binding_statement(dep));
                out.push('\n');
            }
        }

        out.push_str(&self.registry_bootstrap());
        out.push_str(&self.main_routine());
        out
    }
}

/// The single statement that loads and binds one dependency.
pub fn binding_statement(dep: &DependencyDescriptor) -> String {
    let module = format!("require({})", js_string(&dep.name));

    if dep.bind_as_namespace || dep.bindings.is_empty() {
        format!(
            "context.bindNamespace({}, {});",
            js_string(dep.namespace_alias()),
            module
        )
    } else {
        let names: Vec<String> = dep.bindings.iter().map(|b| js_string(b)).collect();
        format!("context.bindMembers({}, [{}]);", module, names.join(", "))
    }
}

/// Quote `s` as a string literal. JSON string syntax is valid JavaScript.
fn js_string(s: &str) -> String {
    Value::from(s).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> NodeTemplateRenderer {
        NodeTemplateRenderer::new(RegistryPackage::default())
    }

    fn binding_lines(script: &str) -> Vec<&str> {
        script
            .lines()
            .filter(|l| l.starts_with("context.bind"))
            .collect()
    }

    #[test]
    fn one_binding_per_dependency() {
        let deps = vec![
            DependencyDescriptor::new("lodash", "4.17.21").namespace("_"),
            DependencyDescriptor::new("@google-cloud/bigquery", "7.9.1").members(["BigQuery"]),
            DependencyDescriptor::new("dayjs", "1.11.0"),
        ];
        let script = renderer().render(&deps);

        assert_eq!(
            binding_lines(&script),
            vec![
                r#"context.bindNamespace("_", require("lodash"));"#,
                r#"context.bindMembers(require("@google-cloud/bigquery"), ["BigQuery"]);"#,
                r#"context.bindNamespace("dayjs", require("dayjs"));"#,
            ]
        );
    }

    #[test]
    fn empty_list_has_no_bindings_but_keeps_bootstrap() {
        let script = renderer().render(&[]);
        assert!(binding_lines(&script).is_empty());
        assert!(!script.contains("// dependencies"));
        assert!(script.contains(r#"const registryModule = require("@owox/connectors");"#));
        assert!(script.contains(
            r#"context.registry = buildRegistry([registryModule["Sources"], registryModule["Storages"]]);"#
        ));
        assert!(script.contains(r#"context.core = registryModule["Core"] || {};"#));
    }

    #[test]
    fn main_reads_run_environment() {
        let script = renderer().render(&[]);
        assert!(script.contains(r#"JSON.parse(readEnv("OW_CONFIG"))"#));
        assert!(script.contains(r#"datamartId: readEnv("OW_DATAMART_ID")"#));
        assert!(script.contains(r#"runId: readEnv("OW_RUN_ID")"#));
        assert!(script.contains("await connector.run(run);"));
        assert!(script.contains("main(context).catch"));
        assert!(!script.contains("global."));
        assert!(!script.contains("globalThis"));
    }

    #[test]
    fn names_are_escaped() {
        let dep = DependencyDescriptor::new("we\"ird", "1.0.0").namespace("x");
        assert_eq!(
            binding_statement(&dep),
            r#"context.bindNamespace("x", require("we\"ird"));"#
        );
    }

    #[test]
    fn custom_export_names() {
        let pkg = RegistryPackage {
            name: "my-connectors".to_string(),
            version: "1.0.0".to_string(),
            core_export: "Utils".to_string(),
            storages_export: "Sinks".to_string(),
            sources_export: "Feeds".to_string(),
        };
        let script = NodeTemplateRenderer::new(pkg).render(&[]);
        assert!(script.contains(r#"require("my-connectors")"#));
        assert!(script.contains(r#"registryModule["Utils"]"#));
        assert!(script.contains(r#"[registryModule["Feeds"], registryModule["Sinks"]]"#));
    }
}
