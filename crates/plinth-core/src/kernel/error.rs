//! # Plinth Kernel Errors
//!
//! Defines the aggregate error type for the engine.
//!
//! Each subsystem owns a typed error enum; [`Error`] wraps them so callers
//! that drive several subsystems (the binary, the profile reconciler) can use
//! a single [`Result`] alias and `?` across boundaries.
use std::result::Result as StdResult;

use crate::event::EventSystemError;
use crate::plugin_system::dependency::DependencyError;
use crate::plugin_system::error::PluginSystemError;
use crate::profile::error::ProfileError;
use crate::storage::config::StorageError;
use thiserror::Error as ThisError;

/// Top level error for the plinth engine
#[derive(Debug, ThisError)]
pub enum Error {
    /// Activation, lookup and instantiation failures
    #[error("Plugin system error: {0}")]
    PluginSystem(#[from] PluginSystemError),

    /// Resolution-time failures (normally recovered, surfaced for diagnostics)
    #[error("Dependency error: {0}")]
    Dependency(#[from] DependencyError),

    /// Requirement document and reconciliation failures
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Configuration and persistence failures
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Observer bookkeeping failures
    #[error("Event system error: {0}")]
    EventSystem(#[from] EventSystemError),
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

