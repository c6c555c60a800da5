//! Plugin engine for pluggable application shells: descriptor registry,
//! dependency resolution, attribute queries, cascading activation and
//! declarative profiles.
pub mod event;
pub mod kernel;
pub mod plugin_system;
pub mod profile;
pub mod storage;

// Re-export the types a host application usually touches
pub use event::{EventDispatcher, PluginEvent, RequestQueue};
pub use kernel::{Error, Result};
pub use plugin_system::{
    Constraint, Descriptor, Disambiguator, FactoryRegistry, ManifestLoader, PluginFactory,
    PluginHost, PluginInstance, PluginManager, PluginState, Registry, Selection,
};
pub use profile::{Profile, ProfileError, ProfileSource, RequirementDocument};
pub use storage::{ConfigFormat, EngineConfig};

#[cfg(test)]
mod tests;
