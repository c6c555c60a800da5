use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::kernel::constants::{IDENTITY_SECTION, LOCATION_KEY};
use crate::plugin_system::descriptor::Descriptor;

fn default_true() -> bool {
    true
}

/// On-disk description of a plugin, in any supported config format.
///
/// Free-form attributes are grouped by section. A key written as
/// `Key[locale]` stores a localized value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorManifest {
    /// Unique identifier for the plugin
    pub id: String,

    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Icon path
    #[serde(default)]
    pub icon: Option<String>,

    /// Implementation language; absent means native
    #[serde(default)]
    pub language: Option<String>,

    /// Exported capability names
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Ids of required plugins
    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default = "default_true")]
    pub user_activatable: bool,

    #[serde(default)]
    pub attributes: BTreeMap<String, BTreeMap<String, String>>,
}

impl DescriptorManifest {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            user_activatable: true,
            ..Self::default()
        }
    }

    /// Build the registry descriptor. Identity fields are mirrored into the
    /// identity section so they can be queried; the mirror is written after
    /// the free-form attributes so those can never shadow it.
    pub fn to_descriptor(&self) -> Descriptor {
        let mut descriptor = Descriptor::new(&self.id);
        for (section, values) in &self.attributes {
            for (key, value) in values {
                match split_locale(key) {
                    Some((key, locale)) => {
                        descriptor
                            .attributes_mut()
                            .set_localized(section, key, locale, value);
                    }
                    None => descriptor = descriptor.with_attribute(section, key, value),
                }
            }
        }

        descriptor
            .attributes_mut()
            .set(IDENTITY_SECTION, LOCATION_KEY, &self.id);
        descriptor = descriptor
            .with_capabilities(&self.capabilities)
            .with_dependencies(&self.dependencies)
            .with_user_activatable(self.user_activatable);
        if let Some(name) = &self.name {
            descriptor = descriptor.with_name(name);
        }
        if let Some(description) = &self.description {
            descriptor = descriptor.with_description(description);
        }
        if let Some(icon) = &self.icon {
            descriptor = descriptor.with_icon(icon);
        }
        if let Some(language) = &self.language {
            descriptor = descriptor.with_language(language);
        }
        descriptor
    }
}

/// `Name[de]` -> (`Name`, `de`)
fn split_locale(key: &str) -> Option<(&str, &str)> {
    let inner = key.strip_suffix(']')?;
    let (key, locale) = inner.split_once('[')?;
    (!key.is_empty() && !locale.is_empty()).then_some((key, locale))
}
