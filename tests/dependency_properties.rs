use std::collections::{BTreeMap, HashSet};

use proptest::prelude::*;

use connector_sandbox::config::RegistryPackage;
use connector_sandbox::deps::{DependencyDescriptor, DependencyManager, Manifest, NpmDependencyManager};
use connector_sandbox::template::{NodeTemplateRenderer, TemplateRenderer};

// Small name pool so baseline and per-run lists collide often.
fn name_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["lodash", "pg", "dayjs", "axios", "@owox/connectors", "@scope/pkg"])
        .prop_map(str::to_string)
}

fn dependency_strategy() -> impl Strategy<Value = DependencyDescriptor> {
    (
        name_strategy(),
        "[0-9]\\.[0-9]{1,2}\\.[0-9]",
        prop::collection::vec("[A-Z][a-zA-Z]{0,6}", 0..3),
        any::<bool>(),
    )
        .prop_map(|(name, version, bindings, bind_as_namespace)| DependencyDescriptor {
            name,
            version,
            bindings,
            bind_as_namespace,
        })
}

fn deps_strategy() -> impl Strategy<Value = Vec<DependencyDescriptor>> {
    prop::collection::vec(dependency_strategy(), 0..8)
}

fn manager(baseline: Vec<DependencyDescriptor>) -> NpmDependencyManager {
    NpmDependencyManager::new(baseline, vec!["true".to_string()])
}

proptest! {
    #[test]
    fn baseline_versions_win_and_names_are_unique(
        baseline in deps_strategy(),
        per_run in deps_strategy(),
    ) {
        let mgr = manager(baseline.clone());
        let set = mgr.compute_dependency_set(&per_run);

        // Unique names.
        let names: HashSet<&str> = set.iter().map(|d| d.name.as_str()).collect();
        prop_assert_eq!(names.len(), set.len());

        // Baseline comes first, unchanged.
        prop_assert_eq!(&set[..mgr.baseline().len()], mgr.baseline());

        // Every input name is present; baseline entries are authoritative.
        let mut expected: BTreeMap<&str, &str> = BTreeMap::new();
        for dep in baseline.iter().chain(per_run.iter()) {
            expected.entry(dep.name.as_str()).or_insert(dep.version.as_str());
        }
        let actual: BTreeMap<&str, &str> =
            set.iter().map(|d| (d.name.as_str(), d.version.as_str())).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn manifest_lists_each_dependency_once(deps in deps_strategy()) {
        let mgr = manager(vec![]);
        let set = mgr.compute_dependency_set(&deps);
        let manifest: Manifest = mgr.generate_manifest("dm1", &set);

        prop_assert_eq!(manifest.name.as_str(), "connector-dm1");
        prop_assert!(manifest.private);
        prop_assert_eq!(manifest.dependencies.len(), set.len());
        for dep in &set {
            prop_assert_eq!(manifest.dependencies.get(&dep.name), Some(&dep.version));
        }
    }

    #[test]
    fn render_is_deterministic_with_one_binding_per_dependency(deps in deps_strategy()) {
        let renderer = NodeTemplateRenderer::new(RegistryPackage::default());
        let first = renderer.render(&deps);
        let second = renderer.render(&deps);
        prop_assert_eq!(&first, &second);

        let bindings = first.lines().filter(|l| l.starts_with("context.bind")).count();
        prop_assert_eq!(bindings, deps.len());

        prop_assert!(first.contains("const registryModule = require(\"@owox/connectors\");"));
        prop_assert!(first.contains("context.registry = buildRegistry("));
        prop_assert!(first.contains("main(context)"));
    }
}
