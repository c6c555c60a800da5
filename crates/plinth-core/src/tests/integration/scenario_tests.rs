//! End to end walks through registry, activation engine and profiles.
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::plugin_system::descriptor::Descriptor;
use crate::plugin_system::manager::PluginState;
use crate::plugin_system::query::Constraint;
use crate::plugin_system::registry::Registry;
use crate::plugin_system::selection::Selection;
use crate::profile::document::{ParsedDocument, ProfileSource, RequirementGroup};
use crate::profile::error::ProfileError;
use crate::profile::reconciler::Profile;
use crate::storage::config::ConfigFormat;
use crate::tests::common::{manager_of, manager_with, plugin, record_events, ScriptedDisambiguator};

fn editor_and_loader() -> Vec<Descriptor> {
    vec![
        plugin("L", &["ILoader"], &["E"]),
        plugin("E", &["IEditor"], &[]),
    ]
}

#[test]
fn test_dependency_activates_first() {
    let mut registry = Registry::new();
    registry.register_all(editor_and_loader());
    assert_eq!(registry.resolve().load_order, vec!["E", "L"]);

    let (mut manager, _) = manager_of(editor_and_loader());
    let events = record_events(&mut manager);

    manager.activate("L").unwrap();

    assert_eq!(events.entries(), vec!["plugin-activated:E", "plugin-activated:L"]);
    assert_eq!(manager.state("E"), Some(PluginState::Active));
    assert_eq!(manager.state("L"), Some(PluginState::Active));
}

#[test]
fn test_deactivating_dependency_cascades_to_dependents_first() {
    let (mut manager, _) = manager_of(editor_and_loader());
    manager.activate("L").unwrap();
    let events = record_events(&mut manager);

    assert!(manager.deactivate("E").unwrap());

    assert_eq!(events.entries(), vec!["plugin-deactivated:L", "plugin-deactivated:E"]);
    assert!(manager.active_plugins().is_empty());
}

#[test]
fn test_capability_choice_is_remembered() {
    let disambiguator = ScriptedDisambiguator::new(vec![Selection::chosen("B", true)]);
    let prompts = disambiguator.prompts();
    let seen = disambiguator.seen();
    let (mut manager, factory) = manager_with(
        vec![plugin("A", &["IThing"], &[]), plugin("B", &["IThing"], &[])],
        Box::new(disambiguator),
    );

    let first = manager.get_by_capability("IThing").unwrap().unwrap();
    assert_eq!(seen.lock().unwrap().clone(), vec![vec!["A".to_string(), "B".to_string()]]);
    assert!(manager.is_active("B"));
    assert!(!manager.is_active("A"));

    let second = manager.get_by_capability("IThing").unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(prompts.load(Ordering::SeqCst), 1);
    assert_eq!(factory.instantiated("B"), 1);

    let remembered: Vec<(&str, &str)> = manager.remembered_selections().iter().collect();
    assert_eq!(remembered, vec![("A,B", "B")]);
}

#[test]
fn test_profile_with_unmet_mandatory_requirement_activates_nothing() {
    let (mut manager, factory) = manager_of(vec![
        plugin("E", &["IEditor"], &[]).with_attribute("Kind", "Role", "Editor"),
        plugin("L", &["ILoader"], &["E"]),
    ]);
    let source = ProfileSource::text(
        "default.yaml",
        r#"
plugin:
  - name: Formatter
    url: https://example.org/formatter
    mandatory: "yes"
    require:
      - { group: Kind, attribute: Role, value: Formatter }
  - name: Editor
    require:
      - { group: Kind, attribute: Role, value: Editor }
"#,
        ConfigFormat::Yaml,
    );
    let mut profile = Profile::new("default");

    let error = profile.load(&mut manager, &[source]).unwrap_err();

    let missing = error.missing_plugins();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].name, "Formatter");
    assert_eq!(missing[0].url, "https://example.org/formatter");
    assert!(error.to_string().contains("Formatter: Install it from 'https://example.org/formatter'"));
    assert!(matches!(error, ProfileError::MissingMandatoryPlugins { .. }));
    assert!(manager.active_plugins().is_empty());
    assert!(factory.journal.entries().is_empty());
}

#[test]
fn test_profile_switch_converges_plugin_set() {
    let (mut manager, _) = manager_of(vec![
        plugin("shell", &["IShell"], &[]),
        plugin("editor", &["IEditor"], &["shell"]),
        plugin("debugger", &["IDebugger"], &["shell"]),
        plugin("vcs", &["IVcs"], &[]),
    ]);
    manager.set_core("shell", true).unwrap();
    let events = record_events(&mut manager);
    let wants = |label: &str, capability: &str| {
        ParsedDocument::new(label).with_requirement(RequirementGroup::new(
            capability,
            vec![Constraint::new("identity", "Interfaces", capability)],
        ))
    };

    let mut coding = Profile::new("coding");
    coding
        .load_parsed(&mut manager, &[wants("coding", "IEditor"), wants("coding", "IVcs")])
        .unwrap();
    assert_eq!(manager.active_plugins(), vec!["shell", "editor", "vcs"]);
    coding.unload(&mut manager).unwrap();

    events.clear();
    let mut debugging = Profile::new("debugging");
    debugging
        .load_parsed(&mut manager, &[wants("debugging", "IDebugger")])
        .unwrap();

    assert_eq!(manager.active_plugins(), vec!["shell", "debugger"]);
    assert_eq!(
        events.entries(),
        vec![
            "plugin-deactivated:vcs",
            "plugin-deactivated:editor",
            "plugin-activated:debugger",
            "profile-scoped:debugging"
        ]
    );
    assert_eq!(debugging.plugins(), vec!["debugger"]);
}
