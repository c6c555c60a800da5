//! # Plinth Plugin System
//!
//! Discovery, dependency resolution, querying and lifecycle activation of
//! plugins.
//!
//! ## Key Components
//!
//! - **[`Descriptor`]** (`descriptor`): static metadata of a plugin plus its
//!   attribute bag with a temporary override layer.
//! - **[`Registry`]** (`registry`): arena of descriptors indexed by id and
//!   by exported capability; its order becomes the load order.
//! - **[`Resolver`]** (`dependency`): builds dense dependency/dependent sets,
//!   prunes cycles, propagates the can-load flag and computes the load order.
//! - **[`QueryEngine`]** (`query`): constraint based filtering with glob
//!   support, excluding the [`DisabledSet`].
//! - **[`PluginManager`]** (`manager`): the activation engine with cascading
//!   activate/deactivate, capability lookup and memoized disambiguation.
//! - **[`FactoryRegistry`]** (`factory`) and **[`PluginInstance`]**
//!   (`traits`): instantiation seam and lifecycle hooks.
//! - **[`ManifestLoader`]** (`loader`, `manifest`): serde manifests read
//!   from plugin directories.
//! - **[`PluginSystemError`]** (`error`): errors of this subsystem.
pub mod dependency;
pub mod descriptor;
pub mod disabled;
pub mod error;
pub mod factory;
pub mod loader;
pub mod manager;
pub mod manifest;
pub mod query;
pub mod registry;
pub mod selection;
pub mod traits;

pub use dependency::{DependencyError, ResolutionReport, Resolver};
pub use descriptor::{AttributeBag, AttributeKey, Descriptor, DescriptorIdx};
pub use disabled::{DisableScope, DisabledSet};
pub use error::PluginSystemError;
pub use factory::{FactoryRegistry, PluginFactory, PluginHost};
pub use loader::{Discovery, ManifestLoader};
pub use manager::{PluginManager, PluginState};
pub use manifest::DescriptorManifest;
pub use query::{Constraint, QueryEngine};
pub use registry::Registry;
pub use selection::{DeclineAll, Disambiguator, FirstCandidate, RememberedSelections, Selection};
pub use traits::PluginInstance;

#[cfg(test)]
mod tests;
