//! # Plinth Profile Errors
//!
//! [`ProfileError`] covers malformed requirement documents, unmet mandatory
//! requirements and failures of the persistence sink. A failing load leaves
//! whatever it already applied in place; see the reconciler docs.
use std::fmt;

use thiserror::Error;

use crate::plugin_system::error::PluginSystemError;
use crate::storage::config::StorageError;

/// An unmet mandatory requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingPlugin {
    /// Label of the document that declared the requirement
    pub document: String,
    pub name: String,
    pub url: String,
}

impl fmt::Display for MissingPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: Install it from '{}'", self.name, self.url)
    }
}

fn list_missing(missing: &[MissingPlugin]) -> String {
    missing
        .iter()
        .map(|m| format!("{m}\n"))
        .collect()
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Failed to read '{document}': Following mandatory plugins are missing:\n{}", list_missing(.missing))]
    MissingMandatoryPlugins {
        document: String,
        missing: Vec<MissingPlugin>,
    },

    #[error("Failed to read '{document}': {message}. Invalid or corrupted plugins profile.")]
    Configuration { document: String, message: String },

    #[error("Profile '{0}' is already loaded")]
    AlreadyLoaded(String),

    #[error("Profile '{0}' is not loaded")]
    NotLoaded(String),

    #[error("Profile '{0}' membership state is poisoned")]
    Poisoned(String),

    #[error("Failed to synchronize profile: {0}")]
    Storage(#[from] StorageError),

    #[error("Plugin error while reconciling profile: {0}")]
    PluginSystem(#[from] PluginSystemError),
}

impl ProfileError {
    pub(crate) fn configuration(document: &str, message: impl Into<String>) -> Self {
        ProfileError::Configuration {
            document: document.to_string(),
            message: message.into(),
        }
    }

    /// Unmet requirements carried by a missing-mandatory error
    pub fn missing_plugins(&self) -> &[MissingPlugin] {
        match self {
            ProfileError::MissingMandatoryPlugins { missing, .. } => missing,
            _ => &[],
        }
    }
}
