//! # Plinth Plugin System Errors
//!
//! Defines error types specific to the plugin system.
//!
//! [`PluginSystemError`] covers everything the activation engine can report:
//! lookups of unknown ids, descriptors that cannot load because of a missing
//! dependency, missing instantiation paths, instantiation failures and vetoed
//! deactivations. Cascade operations report per-item errors without aborting
//! the rest of the batch, so most of these end up in the manager's diagnostics
//! list rather than in a returned `Err`.
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PluginSystemError {
    #[error("Plugin not found: '{plugin_id}'")]
    NotFound { plugin_id: String },

    #[error("Plugin '{plugin_id}' cannot be loaded: dependency '{missing}' is missing or cannot load")]
    MissingDependency { plugin_id: String, missing: String },

    #[error("No plugin is able to load '{plugin_id}' written in '{language}'")]
    MissingFactory { plugin_id: String, language: String },

    #[error("Could not instantiate plugin '{plugin_id}': {message}")]
    InstantiationFailed { plugin_id: String, message: String },

    #[error("Plugin '{plugin_id}' refused to activate")]
    ActivationRefused { plugin_id: String },

    #[error("Plugin '{plugin_id}' does not want to be deactivated")]
    VetoedDeactivation { plugin_id: String },

    #[error("Plugin '{plugin_id}' was not activated because dependency '{dependency}' failed to activate")]
    DependencyNotActive { plugin_id: String, dependency: String },

    #[error("Plugin '{plugin_id}' stays active because '{dependent}' still depends on it")]
    StillRequired { plugin_id: String, dependent: String },

    #[error("Plugin state can't change: {0}")]
    InvalidState(String),

    #[error("Plugin manifest error for '{path}': {message}")]
    ManifestError { path: PathBuf, message: String },

    #[error("Internal plugin system error: {0}")]
    InternalError(String),
}

impl PluginSystemError {
    /// Id of the plugin the error is about, when there is one.
    pub fn plugin_id(&self) -> Option<&str> {
        match self {
            PluginSystemError::NotFound { plugin_id }
            | PluginSystemError::MissingDependency { plugin_id, .. }
            | PluginSystemError::MissingFactory { plugin_id, .. }
            | PluginSystemError::InstantiationFailed { plugin_id, .. }
            | PluginSystemError::ActivationRefused { plugin_id }
            | PluginSystemError::VetoedDeactivation { plugin_id }
            | PluginSystemError::DependencyNotActive { plugin_id, .. }
            | PluginSystemError::StillRequired { plugin_id, .. } => Some(plugin_id),
            _ => None,
        }
    }

    pub(crate) fn not_found(plugin_id: &str) -> Self {
        PluginSystemError::NotFound { plugin_id: plugin_id.to_string() }
    }
}
