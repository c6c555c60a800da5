//! Invariants checked over families of generated or hand picked graphs.
use std::collections::HashMap;
use std::sync::atomic::Ordering;

use crate::plugin_system::descriptor::Descriptor;
use crate::plugin_system::manager::PluginState;
use crate::plugin_system::query::Constraint;
use crate::plugin_system::registry::Registry;
use crate::plugin_system::selection::Selection;
use crate::profile::document::{ParsedDocument, RequirementGroup};
use crate::profile::reconciler::Profile;
use crate::tests::common::{
    manager_of, manager_with, plugin, record_events, resolved_registry, ScriptedDisambiguator,
};

// ===== RESOLUTION =====

/// Acyclic graph over `n` nodes; node i may only depend on lower nodes or
/// on an unregistered id, chosen from the bits of `seed`.
fn generated_graph(seed: u64, n: usize) -> Vec<(String, Vec<String>)> {
    let mut bits = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut graph = Vec::new();
    for i in 0..n {
        let mut deps = Vec::new();
        for j in 0..i {
            if bits & 1 == 1 {
                deps.push(format!("n{j}"));
            }
            bits = bits.rotate_right(1);
        }
        if bits & 0b111 == 0 {
            deps.push(format!("ghost{i}"));
        }
        bits = bits.rotate_right(3);
        graph.push((format!("n{i}"), deps));
    }
    graph
}

fn expected_loadable(
    id: &str,
    graph: &HashMap<String, Vec<String>>,
    memo: &mut HashMap<String, bool>,
) -> bool {
    if let Some(known) = memo.get(id) {
        return *known;
    }
    let loadable = match graph.get(id) {
        Some(deps) => deps.iter().all(|dep| expected_loadable(dep, graph, memo)),
        None => false,
    };
    memo.insert(id.to_string(), loadable);
    loadable
}

#[test]
fn test_can_load_propagates_through_acyclic_graphs() {
    for seed in 1..200u64 {
        let graph = generated_graph(seed, 7);
        let descriptors: Vec<Descriptor> = graph
            .iter()
            .rev()
            .map(|(id, deps)| Descriptor::new(id).with_dependencies(deps.as_slice()))
            .collect();
        let registry = resolved_registry(descriptors);

        let lookup: HashMap<String, Vec<String>> = graph.into_iter().collect();
        let mut memo = HashMap::new();
        for id in lookup.keys() {
            let descriptor = registry.by_id(id).unwrap();
            assert_eq!(
                descriptor.can_load(),
                expected_loadable(id, &lookup, &mut memo),
                "seed {seed}, plugin {id}"
            );
        }
    }
}

#[test]
fn test_load_order_puts_dependencies_first() {
    for seed in 1..200u64 {
        let graph = generated_graph(seed, 6);
        let descriptors: Vec<Descriptor> = graph
            .iter()
            .map(|(id, deps)| Descriptor::new(id).with_dependencies(deps.as_slice()))
            .collect();
        let mut registry = Registry::new();
        registry.register_all(descriptors);
        let order = registry.resolve().load_order;

        let position: HashMap<&str, usize> =
            order.iter().enumerate().map(|(pos, id)| (id.as_str(), pos)).collect();
        for (id, deps) in &graph {
            for dep in deps.iter().filter(|d| position.contains_key(d.as_str())) {
                assert!(position[dep.as_str()] < position[id.as_str()], "seed {seed}: {dep} before {id}");
            }
        }
    }
}

#[test]
fn test_cycles_are_pruned_without_touching_unrelated_plugins() {
    let mut registry = Registry::new();
    registry.register_all(vec![
        plugin("A", &[], &["B"]),
        plugin("B", &[], &["C"]),
        plugin("C", &[], &["A"]),
        plugin("D", &[], &["A"]),
        plugin("E", &[], &[]),
        plugin("F", &[], &["E"]),
    ]);

    let report = registry.resolve();

    for id in ["A", "B", "C"] {
        assert!(!registry.contains(id), "{id} should be pruned");
    }
    assert_eq!(report.pruned_cycles.len(), 1);
    assert!(!registry.by_id("D").unwrap().can_load());
    assert!(registry.by_id("E").unwrap().can_load());
    assert!(registry.by_id("F").unwrap().can_load());
    assert_eq!(report.load_order, vec!["D", "E", "F"]);
}

// ===== ACTIVATION =====

#[test]
fn test_dependency_is_active_before_dependent_is_recorded() {
    let (mut manager, factory) = manager_of(vec![plugin("A", &[], &["B"]), plugin("B", &[], &[])]);
    let events = record_events(&mut manager);

    manager.activate("A").unwrap();

    assert_eq!(events.entries(), vec!["plugin-activated:B", "plugin-activated:A"]);
    assert_eq!(
        factory.journal.entries(),
        vec!["new:B", "activate:B", "new:A", "activate:A"]
    );
}

#[test]
fn test_deactivation_order_and_veto() {
    let (mut manager, factory) = manager_of(vec![plugin("A", &[], &["B"]), plugin("B", &[], &[])]);
    manager.activate("A").unwrap();
    let events = record_events(&mut manager);

    factory.veto_deactivation("A", true);
    assert!(!manager.deactivate("B").unwrap());
    assert!(events.entries().is_empty());
    assert_eq!(manager.state("A"), Some(PluginState::Active));
    assert_eq!(manager.state("B"), Some(PluginState::Active));

    factory.veto_deactivation("A", false);
    assert!(manager.deactivate("B").unwrap());
    assert_eq!(events.entries(), vec!["plugin-deactivated:A", "plugin-deactivated:B"]);
}

#[test]
fn test_disambiguation_is_memoized_per_candidate_set() {
    let disambiguator = ScriptedDisambiguator::new(vec![
        Selection::chosen("X", true),
        Selection::chosen("Z", true),
    ]);
    let prompts = disambiguator.prompts();
    let (mut manager, _) = manager_with(
        vec![
            plugin("U", &["IUnique"], &[]),
            plugin("X", &["IShared"], &[]),
            plugin("Y", &["IShared"], &[]),
            plugin("Z", &["IShared"], &[]),
        ],
        Box::new(disambiguator),
    );
    manager.disable(&["Z"]);

    manager.get_by_capability("IUnique").unwrap().unwrap();
    assert_eq!(prompts.load(Ordering::SeqCst), 0);

    manager.get_by_capability("IShared").unwrap().unwrap();
    assert_eq!(prompts.load(Ordering::SeqCst), 1);
    manager.deactivate("X").unwrap();
    manager.get_by_capability("IShared").unwrap().unwrap();
    assert_eq!(prompts.load(Ordering::SeqCst), 1);
    assert!(manager.is_active("X"));

    manager.deactivate("X").unwrap();
    manager.enable(&["Z"]);
    manager.get_by_capability("IShared").unwrap().unwrap();
    assert_eq!(prompts.load(Ordering::SeqCst), 2);
    assert!(manager.is_active("Z"));
    assert_eq!(manager.remembered_selections().get("X,Y,Z"), Some("Z"));
}

// ===== ATTRIBUTES AND PROFILES =====

#[test]
fn test_override_round_trip() {
    let (mut manager, _) = manager_of(vec![
        plugin("P", &["IThing"], &[]).with_attribute("Kind", "Role", "Printer"),
    ]);
    let cases = [
        ("Kind", "Role", "Scanner"),
        ("Kind", "Fresh", "value"),
        ("identity", "Interfaces", "IOther"),
    ];

    for (section, key, value) in cases {
        let original = manager
            .registry()
            .by_id("P")
            .and_then(|d| d.attributes().get(section, key))
            .map(str::to_string);

        manager.override_attribute("P", section, key, value).unwrap();
        let overridden = manager.registry().by_id("P").and_then(|d| d.attributes().get(section, key));
        assert_eq!(overridden, Some(value));

        manager.remove_override("P", section, key).unwrap();
        let restored = manager
            .registry()
            .by_id("P")
            .and_then(|d| d.attributes().get(section, key))
            .map(str::to_string);
        assert_eq!(restored, original, "[{section}] {key}");
    }
}

#[test]
fn test_mandatory_flag_decides_between_failure_and_omission() {
    let group = RequirementGroup::new("Ghost", vec![Constraint::new("Kind", "Role", "Ghost")]);

    let (mut manager, _) = manager_of(vec![plugin("P", &[], &[])]);
    let mandatory = ParsedDocument::new("strict").with_requirement(group.clone().mandatory("https://ghost"));
    let error = Profile::new("strict").load_parsed(&mut manager, &[mandatory]).unwrap_err();
    let names: Vec<&str> = error.missing_plugins().iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Ghost"]);

    let optional = ParsedDocument::new("lenient").with_requirement(group);
    let selected = Profile::new("lenient").load_parsed(&mut manager, &[optional]).unwrap();
    assert!(selected.is_empty());
}
