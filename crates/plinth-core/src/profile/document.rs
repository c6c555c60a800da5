//! # Plinth Requirement Documents
//!
//! A requirement document declares the desired plugin set of a profile:
//!
//! ```yaml
//! filter:
//!   - - { group: identity, attribute: Interfaces, value: "IEditor" }
//! plugin:
//!   - name: Formatter
//!     url: https://example.org/formatter
//!     mandatory: "yes"
//!     require:
//!       - { group: Kind, attribute: Role, value: Formatter }
//!     set:
//!       - { group: Kind, attribute: Style, value: compact }
//! ```
//!
//! `filter` groups are ANDed constraint lists, ORed together; descriptors
//! matched by no group are hidden while the profile is loaded. Each
//! `plugin` entry becomes a [`RequirementGroup`].
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::kernel::constants::DEFAULT_PLUGIN_URL;
use crate::plugin_system::query::Constraint;
use crate::profile::error::ProfileError;
use crate::storage::config::{self, ConfigFormat};

/// `mandatory` accepts booleans and `"yes"`/`"no"` strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MandatoryFlag {
    Bool(bool),
    Text(String),
}

impl MandatoryFlag {
    pub fn is_mandatory(&self) -> bool {
        match self {
            MandatoryFlag::Bool(value) => *value,
            MandatoryFlag::Text(text) => text.trim().eq_ignore_ascii_case("yes"),
        }
    }
}

/// Constraint as written in a document; every field must be present
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawConstraint {
    #[serde(default, alias = "section", skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl RawConstraint {
    pub fn new(group: &str, attribute: &str, value: &str) -> Self {
        Self {
            group: Some(group.to_string()),
            attribute: Some(attribute.to_string()),
            value: Some(value.to_string()),
        }
    }

    fn to_constraint(&self) -> Option<Constraint> {
        match (&self.group, &self.attribute, &self.value) {
            (Some(group), Some(attribute), Some(value)) => {
                Some(Constraint::new(group, attribute, value))
            }
            _ => None,
        }
    }
}

/// `plugin` entry of a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRequirement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandatory: Option<MandatoryFlag>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub core: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub exclude_from_sync: bool,
    #[serde(default)]
    pub require: Vec<RawConstraint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub set: Vec<RawConstraint>,
}

/// Serde form of a whole requirement document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementDocument {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<Vec<RawConstraint>>,
    #[serde(default)]
    pub plugin: Vec<PluginRequirement>,
}

/// One validated requirement of a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementGroup {
    pub name: String,
    pub url: String,
    pub mandatory: bool,
    /// ANDed selection constraints, never empty
    pub constraints: Vec<Constraint>,
    /// Attribute overrides applied to the selected descriptor
    pub overrides: Vec<Constraint>,
    pub core: bool,
    pub exclude_from_sync: bool,
}

impl RequirementGroup {
    pub fn new(name: &str, constraints: Vec<Constraint>) -> Self {
        Self {
            name: name.to_string(),
            url: DEFAULT_PLUGIN_URL.to_string(),
            mandatory: false,
            constraints,
            overrides: Vec::new(),
            core: false,
            exclude_from_sync: false,
        }
    }

    pub fn mandatory(mut self, url: &str) -> Self {
        self.mandatory = true;
        self.url = url.to_string();
        self
    }

    pub fn with_override(mut self, section: &str, key: &str, value: &str) -> Self {
        self.overrides.push(Constraint::new(section, key, value));
        self
    }

    pub fn core(mut self, core: bool) -> Self {
        self.core = core;
        self
    }

    pub fn exclude_from_sync(mut self, exclude: bool) -> Self {
        self.exclude_from_sync = exclude;
        self
    }
}

/// Result of parsing one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Label used in error messages
    pub label: String,
    pub filters: Vec<Vec<Constraint>>,
    pub requirements: Vec<RequirementGroup>,
}

impl ParsedDocument {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: Vec<Constraint>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_requirement(mut self, requirement: RequirementGroup) -> Self {
        self.requirements.push(requirement);
        self
    }
}

/// Raw document text awaiting parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSource {
    pub label: String,
    pub data: String,
    pub format: ConfigFormat,
}

impl ProfileSource {
    pub fn text(label: &str, data: &str, format: ConfigFormat) -> Self {
        Self {
            label: label.to_string(),
            data: data.to_string(),
            format,
        }
    }

    /// Read a document file; the format comes from its extension
    pub fn from_file(path: &Path) -> Result<Self, ProfileError> {
        let label = path.display().to_string();
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ProfileError::configuration(&label, "unsupported document format"))?;
        let data = fs::read_to_string(path).map_err(|e| config::StorageError::Io {
            path: PathBuf::from(path),
            operation: "read".to_string(),
            source: e,
        })?;
        Ok(Self { label, data, format })
    }
}

/// Turns raw documents into requirement groups and filters
pub trait DocumentParser {
    fn parse(&self, source: &ProfileSource) -> Result<ParsedDocument, ProfileError>;
}

/// Parser for [`RequirementDocument`]s in any supported config format
#[derive(Debug, Default, Clone, Copy)]
pub struct SerdeDocumentParser;

impl DocumentParser for SerdeDocumentParser {
    fn parse(&self, source: &ProfileSource) -> Result<ParsedDocument, ProfileError> {
        let document: RequirementDocument = config::from_str(&source.data, source.format)
            .map_err(|e| ProfileError::configuration(&source.label, e.to_string()))?;
        document.validate(&source.label)
    }
}

impl RequirementDocument {
    /// Check required fields and build the parsed form
    pub fn validate(&self, label: &str) -> Result<ParsedDocument, ProfileError> {
        let mut parsed = ParsedDocument::new(label);

        for raw_group in &self.filter {
            let group = raw_group
                .iter()
                .map(|raw| {
                    raw.to_constraint().ok_or_else(|| {
                        ProfileError::configuration(
                            label,
                            "group, attribute and value should be defined in filter",
                        )
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            parsed.filters.push(group);
        }

        for plugin in &self.plugin {
            let name = plugin
                .name
                .as_deref()
                .filter(|n| !n.trim().is_empty())
                .ok_or_else(|| {
                    ProfileError::configuration(label, "plugin name should be present in plugin entry")
                })?;

            let constraints = plugin
                .require
                .iter()
                .map(|raw| {
                    raw.to_constraint().ok_or_else(|| {
                        ProfileError::configuration(
                            label,
                            "group, attribute and value should be defined in require",
                        )
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if constraints.is_empty() {
                return Err(ProfileError::configuration(
                    label,
                    format!("no attributes to match given for plugin '{name}'"),
                ));
            }

            let overrides = plugin
                .set
                .iter()
                .map(|raw| {
                    raw.to_constraint().ok_or_else(|| {
                        ProfileError::configuration(
                            label,
                            "group, attribute and value should be defined in set",
                        )
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            parsed.requirements.push(RequirementGroup {
                name: name.to_string(),
                url: plugin
                    .url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PLUGIN_URL.to_string()),
                mandatory: plugin.mandatory.as_ref().is_some_and(MandatoryFlag::is_mandatory),
                constraints,
                overrides,
                core: plugin.core,
                exclude_from_sync: plugin.exclude_from_sync,
            });
        }

        Ok(parsed)
    }
}
