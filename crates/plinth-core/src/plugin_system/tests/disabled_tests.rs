use crate::plugin_system::disabled::{DisableScope, DisabledSet};

#[test]
fn test_global_disable_and_enable() {
    let mut disabled = DisabledSet::new();
    disabled.disable("a");
    disabled.disable("a");

    assert!(disabled.is_disabled("a"));
    assert_eq!(disabled.len(), 1);

    disabled.enable("a");
    assert!(!disabled.is_disabled("a"));
    assert!(disabled.is_empty());
}

#[test]
fn test_id_stays_disabled_while_any_scope_holds_it() {
    let mut disabled = DisabledSet::new();
    let profile = DisableScope::Profile("default".to_string());
    disabled.disable("shared");
    disabled.disable_scoped("shared", profile.clone());
    disabled.disable_scoped("only-profile", profile.clone());

    let enabled = disabled.clear_scope(&profile);

    assert_eq!(enabled, vec!["only-profile"]);
    assert!(disabled.is_disabled("shared"));
    assert!(!disabled.is_disabled("only-profile"));
    assert!(disabled.ids_in_scope(&profile).is_empty());
    assert_eq!(disabled.ids_in_scope(&DisableScope::Global), vec!["shared"]);
}

#[test]
fn test_scopes_are_independent() {
    let mut disabled = DisabledSet::new();
    let first = DisableScope::Profile("first".to_string());
    let second = DisableScope::Profile("second".to_string());
    disabled.disable_scoped("x", first.clone());
    disabled.disable_scoped("x", second.clone());

    disabled.enable("x");
    assert!(disabled.is_disabled("x"), "global enable does not touch profile scopes");

    disabled.enable_scoped("x", &first);
    assert!(disabled.is_disabled("x"));
    disabled.enable_scoped("x", &second);
    assert!(!disabled.is_disabled("x"));
}

#[test]
fn test_ids_are_sorted() {
    let mut disabled = DisabledSet::new();
    disabled.disable("b");
    disabled.disable_scoped("a", DisableScope::Profile("p".to_string()));

    assert_eq!(disabled.ids(), vec!["a", "b"]);
}
