use crate::kernel::constants::{
    DEPENDENCIES_KEY, IDENTITY_SECTION, INTERFACES_KEY, LOCATION_KEY, USER_ACTIVATABLE_KEY,
};
use crate::plugin_system::descriptor::{AttributeBag, Descriptor};

#[test]
fn test_identity_data_is_mirrored_into_attributes() {
    let descriptor = Descriptor::new("editor")
        .with_name("Editor")
        .with_capabilities(&["IEditor", "IFile"])
        .with_dependencies(&["core"])
        .with_language("python");

    let attributes = descriptor.attributes();
    assert_eq!(attributes.get(IDENTITY_SECTION, LOCATION_KEY), Some("editor"));
    assert_eq!(attributes.get(IDENTITY_SECTION, INTERFACES_KEY), Some("IEditor,IFile"));
    assert_eq!(attributes.get(IDENTITY_SECTION, DEPENDENCIES_KEY), Some("core"));
    assert_eq!(descriptor.name(), "Editor");
    assert_eq!(descriptor.language(), Some("python"));
    assert!(descriptor.exports("IFile"));
    assert!(!descriptor.exports("ifile"), "capability names are exact");
    assert_eq!(descriptor.to_string(), "Editor (editor)");
}

#[test]
fn test_defaults() {
    let descriptor = Descriptor::new("bare").with_language("   ");

    assert_eq!(descriptor.name(), "bare");
    assert_eq!(descriptor.language(), None, "blank language means native");
    assert!(descriptor.is_user_activatable());
    assert!(descriptor.can_load());
    assert!(!descriptor.is_core());
    assert!(descriptor.dependencies().is_empty());
}

#[test]
fn test_capabilities_and_dependencies_are_trimmed_and_deduplicated() {
    let descriptor = Descriptor::new("x")
        .with_capabilities(&[" IThing ", "IThing", ""])
        .with_dependencies(&["a", " a", "b"]);

    assert_eq!(descriptor.capabilities(), ["IThing"]);
    assert_eq!(descriptor.dependency_names(), ["a", "b"]);
}

#[test]
fn test_user_activatable_reads_attribute() {
    assert!(!Descriptor::new("a").with_user_activatable(false).is_user_activatable());
    let descriptor = Descriptor::new("b").with_attribute(IDENTITY_SECTION, USER_ACTIVATABLE_KEY, "No");
    assert!(!descriptor.is_user_activatable());
}

#[test]
fn test_localized_lookup_falls_back_to_language_then_plain_value() {
    let mut bag = AttributeBag::new();
    bag.set("identity", "Name", "Editor");
    bag.set_localized("identity", "Name", "de", "Bearbeiter");
    bag.set_localized("identity", "Name", "pt_BR", "Editor BR");

    assert_eq!(bag.get_localized("identity", "Name", Some("de_DE.UTF-8")), Some("Bearbeiter"));
    assert_eq!(bag.get_localized("identity", "Name", Some("pt_BR")), Some("Editor BR"));
    assert_eq!(bag.get_localized("identity", "Name", Some("fr")), Some("Editor"));
    assert_eq!(bag.get_localized("identity", "Name", None), Some("Editor"));
    assert_eq!(bag.get("identity", "Name"), Some("Editor"));
}

#[test]
fn test_override_shadows_value_until_removed() {
    let mut bag = AttributeBag::new();
    bag.set("Kind", "Role", "Linter");

    assert_eq!(bag.override_value("Kind", "Role", "Formatter"), None);
    assert_eq!(bag.get("Kind", "Role"), Some("Formatter"));
    assert!(bag.has_override("Kind", "Role"));
    assert_eq!(
        bag.override_value("Kind", "Role", "Checker"),
        Some("Formatter".to_string())
    );
    // Stored values never see the shadow layer
    assert_eq!(bag.iter().count(), 1);
    assert_eq!(bag.iter().next().map(|(_, v)| v), Some("Linter"));

    assert_eq!(bag.remove_override("Kind", "Role"), Some("Checker".to_string()));
    assert_eq!(bag.get("Kind", "Role"), Some("Linter"));
    assert!(!bag.has_override("Kind", "Role"));
}

#[test]
fn test_override_of_absent_attribute() {
    let mut bag = AttributeBag::new();
    bag.override_value("Kind", "Extra", "yes");
    assert_eq!(bag.get("Kind", "Extra"), Some("yes"));
    bag.remove_override("Kind", "Extra");
    assert_eq!(bag.get("Kind", "Extra"), None);
}

#[test]
fn test_bool_and_list_views() {
    let mut bag = AttributeBag::new();
    bag.set("s", "yes", "Yes");
    bag.set("s", "zero", "0");
    bag.set("s", "other", "maybe");
    bag.set("s", "list", " a, b ,,c ");

    assert_eq!(bag.get_bool("s", "yes"), Some(true));
    assert_eq!(bag.get_bool("s", "zero"), Some(false));
    assert_eq!(bag.get_bool("s", "other"), None);
    assert_eq!(bag.get_bool("s", "missing"), None);
    assert_eq!(bag.get_list("s", "list"), vec!["a", "b", "c"]);
    assert!(bag.get_list("s", "missing").is_empty());
}

#[test]
fn test_sections_are_sorted_and_distinct() {
    let mut bag = AttributeBag::new();
    bag.set("b", "k", "v");
    bag.set("a", "k", "v");
    bag.set("a", "j", "v");

    assert_eq!(bag.sections(), vec!["a", "b"]);
}
