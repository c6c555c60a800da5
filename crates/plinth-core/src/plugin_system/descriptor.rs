use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::kernel::constants::{
    DEPENDENCIES_KEY, DESCRIPTION_KEY, ICON_KEY, IDENTITY_SECTION, INTERFACES_KEY, LANGUAGE_KEY,
    LOCATION_KEY, NAME_KEY, USER_ACTIVATABLE_KEY,
};

/// Stable index of a descriptor inside the registry arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorIdx(pub(crate) usize);

impl DescriptorIdx {
    /// Raw arena slot
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for DescriptorIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Key of a stored attribute value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttributeKey {
    pub section: String,
    pub key: String,
    pub locale: Option<String>,
}

impl AttributeKey {
    pub fn new(section: &str, key: &str, locale: Option<&str>) -> Self {
        Self {
            section: section.to_string(),
            key: key.to_string(),
            locale: locale.map(str::to_string),
        }
    }
}

/// Attribute store of a descriptor.
///
/// Values are keyed by (section, key, optional locale). A separate shadow
/// layer holds temporary overrides; an override hides the unlocalized stored
/// value until it is removed and is never written back to the stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeBag {
    values: BTreeMap<AttributeKey, String>,
    overrides: BTreeMap<(String, String), String>,
}

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an unlocalized value
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.values.insert(AttributeKey::new(section, key, None), value.to_string());
    }

    /// Store a value for one locale
    pub fn set_localized(&mut self, section: &str, key: &str, locale: &str, value: &str) {
        self.values
            .insert(AttributeKey::new(section, key, Some(locale)), value.to_string());
    }

    /// Current value of an attribute, override first.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.overrides
            .get(&(section.to_string(), key.to_string()))
            .or_else(|| self.values.get(&AttributeKey::new(section, key, None)))
            .map(String::as_str)
    }

    /// Localized lookup.
    ///
    /// Tries the exact locale (`de_DE`), then its language part (`de`), then
    /// falls back to [`AttributeBag::get`].
    pub fn get_localized(&self, section: &str, key: &str, locale: Option<&str>) -> Option<&str> {
        if let Some(locale) = locale {
            if let Some(value) = self.values.get(&AttributeKey::new(section, key, Some(locale))) {
                return Some(value);
            }
            if let Some((lang, _)) = locale.split_once(['_', '.', '@']) {
                if let Some(value) = self.values.get(&AttributeKey::new(section, key, Some(lang))) {
                    return Some(value);
                }
            }
        }
        self.get(section, key)
    }

    /// Boolean view of an attribute (`true`/`yes`/`1` and `false`/`no`/`0`).
    pub fn get_bool(&self, section: &str, key: &str) -> Option<bool> {
        let value = self.get(section, key)?.trim();
        if ["true", "yes", "1"].iter().any(|t| value.eq_ignore_ascii_case(t)) {
            Some(true)
        } else if ["false", "no", "0"].iter().any(|f| value.eq_ignore_ascii_case(f)) {
            Some(false)
        } else {
            None
        }
    }

    /// Comma separated list view of an attribute, trimmed, empty items dropped.
    pub fn get_list(&self, section: &str, key: &str) -> Vec<String> {
        self.get(section, key).map(split_list).unwrap_or_default()
    }

    /// Install or replace a shadow value. Returns the shadow it replaced.
    pub fn override_value(&mut self, section: &str, key: &str, value: &str) -> Option<String> {
        self.overrides
            .insert((section.to_string(), key.to_string()), value.to_string())
    }

    /// Drop a shadow value, reverting to the stored one. Returns the removed shadow.
    pub fn remove_override(&mut self, section: &str, key: &str) -> Option<String> {
        self.overrides.remove(&(section.to_string(), key.to_string()))
    }

    pub fn has_override(&self, section: &str, key: &str) -> bool {
        self.overrides
            .contains_key(&(section.to_string(), key.to_string()))
    }

    /// Stored values, overrides excluded
    pub fn iter(&self) -> impl Iterator<Item = (&AttributeKey, &str)> {
        self.values.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Distinct section names in sorted order
    pub fn sections(&self) -> Vec<&str> {
        let mut sections: Vec<&str> = self.values.keys().map(|k| k.section.as_str()).collect();
        sections.dedup();
        sections
    }
}

/// Split a comma separated attribute value
pub(crate) fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Static metadata record of a discovered plugin plus its resolution state.
///
/// Identity (id, capabilities, declared dependency ids) is fixed at
/// construction. Display data lives in the attribute bag under the identity
/// section so it can be queried and overridden like any other attribute.
/// The dense dependency/dependent sets and `can_load` are written by the
/// resolver only.
#[derive(Debug, Clone)]
pub struct Descriptor {
    id: String,
    capabilities: Vec<String>,
    dependency_names: Vec<String>,
    attributes: AttributeBag,
    /// Transitive dependencies, filled by the resolver
    pub(crate) dependencies: BTreeSet<DescriptorIdx>,
    /// Transitive dependents, filled by the resolver
    pub(crate) dependents: BTreeSet<DescriptorIdx>,
    pub(crate) can_load: bool,
    core: bool,
}

impl Descriptor {
    /// Create a descriptor with the given unique id and no capabilities or dependencies
    pub fn new(id: &str) -> Self {
        let mut attributes = AttributeBag::new();
        attributes.set(IDENTITY_SECTION, LOCATION_KEY, id);
        Self {
            id: id.to_string(),
            capabilities: Vec::new(),
            dependency_names: Vec::new(),
            attributes,
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
            can_load: true,
            core: false,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.attributes.set(IDENTITY_SECTION, NAME_KEY, name);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.attributes.set(IDENTITY_SECTION, DESCRIPTION_KEY, description);
        self
    }

    pub fn with_icon(mut self, icon_path: &str) -> Self {
        self.attributes.set(IDENTITY_SECTION, ICON_KEY, icon_path);
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.attributes.set(IDENTITY_SECTION, LANGUAGE_KEY, language);
        self
    }

    /// Declare exported capability names
    pub fn with_capabilities<S: AsRef<str>>(mut self, capabilities: &[S]) -> Self {
        for capability in capabilities {
            let capability = capability.as_ref().trim();
            if !capability.is_empty() && !self.capabilities.iter().any(|c| c == capability) {
                self.capabilities.push(capability.to_string());
            }
        }
        self.attributes
            .set(IDENTITY_SECTION, INTERFACES_KEY, &self.capabilities.join(","));
        self
    }

    /// Declare dependency ids
    pub fn with_dependencies<S: AsRef<str>>(mut self, dependencies: &[S]) -> Self {
        for dependency in dependencies {
            let dependency = dependency.as_ref().trim();
            if !dependency.is_empty() && !self.dependency_names.iter().any(|d| d == dependency) {
                self.dependency_names.push(dependency.to_string());
            }
        }
        self.attributes
            .set(IDENTITY_SECTION, DEPENDENCIES_KEY, &self.dependency_names.join(","));
        self
    }

    pub fn with_user_activatable(mut self, user_activatable: bool) -> Self {
        self.attributes.set(
            IDENTITY_SECTION,
            USER_ACTIVATABLE_KEY,
            if user_activatable { "true" } else { "false" },
        );
        self
    }

    /// Store an arbitrary attribute
    pub fn with_attribute(mut self, section: &str, key: &str, value: &str) -> Self {
        self.attributes.set(section, key, value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name, falling back to the id
    pub fn name(&self) -> &str {
        self.attributes.get(IDENTITY_SECTION, NAME_KEY).unwrap_or(&self.id)
    }

    pub fn description(&self) -> Option<&str> {
        self.attributes.get(IDENTITY_SECTION, DESCRIPTION_KEY)
    }

    pub fn icon_path(&self) -> Option<&str> {
        self.attributes.get(IDENTITY_SECTION, ICON_KEY)
    }

    /// Implementation language tag; `None` means native
    pub fn language(&self) -> Option<&str> {
        self.attributes
            .get(IDENTITY_SECTION, LANGUAGE_KEY)
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }

    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    pub fn exports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    /// Dependency ids as declared
    pub fn dependency_names(&self) -> &[String] {
        &self.dependency_names
    }

    /// Transitive dependency set computed by the last resolution
    pub fn dependencies(&self) -> &BTreeSet<DescriptorIdx> {
        &self.dependencies
    }

    /// Transitive dependent set computed by the last resolution
    pub fn dependents(&self) -> &BTreeSet<DescriptorIdx> {
        &self.dependents
    }

    pub fn can_load(&self) -> bool {
        self.can_load
    }

    /// Plugins are user activatable unless they say otherwise
    pub fn is_user_activatable(&self) -> bool {
        self.attributes
            .get_bool(IDENTITY_SECTION, USER_ACTIVATABLE_KEY)
            .unwrap_or(true)
    }

    /// Core plugins are never deactivated by profile reconciliation
    pub fn is_core(&self) -> bool {
        self.core
    }

    pub(crate) fn set_core(&mut self, core: bool) {
        self.core = core;
    }

    pub fn attributes(&self) -> &AttributeBag {
        &self.attributes
    }

    pub(crate) fn attributes_mut(&mut self) -> &mut AttributeBag {
        &mut self.attributes
    }

    /// Forget everything a previous resolution pass computed
    pub(crate) fn reset_resolution(&mut self) {
        self.dependencies.clear();
        self.dependents.clear();
        self.can_load = true;
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.id)
    }
}
