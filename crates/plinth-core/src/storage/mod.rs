//! # Plinth Storage
//!
//! Serde based persistence shared by the engine: [`ConfigFormat`] detection
//! from file extensions, format-generic read/write helpers used by plugin
//! manifests and requirement documents, and the [`EngineConfig`] settings
//! file.
pub mod config;

pub use config::{ConfigFormat, EngineConfig, StorageError};
