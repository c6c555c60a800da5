use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kernel::constants::{LOADER_CAPABILITY, NATIVE_LANGUAGES};

/// Errors reading or writing configuration and documents
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error during operation '{operation}' on path '{path}': {source}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization to '{format}' failed: {message}")]
    Serialization { format: String, message: String },

    #[error("Deserialization from '{format}' failed: {message}")]
    Deserialization { format: String, message: String },

    #[error("Unsupported configuration format: {0}")]
    UnsupportedConfigFormat(String),
}

impl StorageError {
    fn io(path: &Path, operation: &str, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            operation: operation.to_string(),
            source,
        }
    }
}

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(ConfigFormat::Json),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            #[cfg(feature = "toml-config")]
            "toml" => Some(ConfigFormat::Toml),
            _ => None,
        }
    }

    fn detect(path: &Path) -> Result<Self, StorageError> {
        Self::from_path(path)
            .ok_or_else(|| StorageError::UnsupportedConfigFormat(path.display().to_string()))
    }
}

/// Serialize a value in the given format
pub fn to_string<T: Serialize>(value: &T, format: ConfigFormat) -> Result<String, StorageError> {
    let failed = |message: String| StorageError::Serialization {
        format: format.extension().to_string(),
        message,
    };
    match format {
        ConfigFormat::Json => serde_json::to_string_pretty(value).map_err(|e| failed(e.to_string())),
        #[cfg(feature = "yaml-config")]
        ConfigFormat::Yaml => serde_yaml::to_string(value).map_err(|e| failed(e.to_string())),
        #[cfg(feature = "toml-config")]
        ConfigFormat::Toml => toml::to_string_pretty(value).map_err(|e| failed(e.to_string())),
    }
}

/// Deserialize a value from the given format
pub fn from_str<T: DeserializeOwned>(data: &str, format: ConfigFormat) -> Result<T, StorageError> {
    let failed = |message: String| StorageError::Deserialization {
        format: format.extension().to_string(),
        message,
    };
    match format {
        ConfigFormat::Json => serde_json::from_str(data).map_err(|e| failed(e.to_string())),
        #[cfg(feature = "yaml-config")]
        ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(|e| failed(e.to_string())),
        #[cfg(feature = "toml-config")]
        ConfigFormat::Toml => toml::from_str(data).map_err(|e| failed(e.to_string())),
    }
}

/// Read and deserialize a file, the format coming from its extension
pub fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let format = ConfigFormat::detect(path)?;
    let data = fs::read_to_string(path).map_err(|e| StorageError::io(path, "read", e))?;
    from_str(&data, format)
}

/// Serialize and write a file, creating missing parent directories
pub fn write_file<T: Serialize>(path: &Path, value: &T, format: ConfigFormat) -> Result<(), StorageError> {
    let data = to_string(value, format)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            debug!("Creating directory {}", parent.display());
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, "create_dir", e))?;
        }
    }
    fs::write(path, data).map_err(|e| StorageError::io(path, "write", e))
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directories scanned for plugin manifests
    pub plugin_dirs: Vec<PathBuf>,
    /// Language tags instantiated by the native factory
    pub native_languages: Vec<String>,
    /// Capability exported by plugins able to load other languages
    pub loader_capability: String,
    /// Remembered selections in `ids=chosen;` form
    pub remembered_selections: String,
    /// Globally disabled plugin ids
    pub disabled: Vec<String>,
    /// Where the live profile is synced, if anywhere
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_sync_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            plugin_dirs: Vec::new(),
            native_languages: NATIVE_LANGUAGES.iter().map(|l| l.to_string()).collect(),
            loader_capability: LOADER_CAPABILITY.to_string(),
            remembered_selections: String::new(),
            disabled: Vec::new(),
            profile_sync_file: None,
        }
    }
}

impl EngineConfig {
    /// Load from a file; the format comes from the extension
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        debug!("Loading engine configuration from {}", path.display());
        read_file(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        write_file(path, self, ConfigFormat::detect(path)?)
    }

    pub fn from_str(data: &str, format: ConfigFormat) -> Result<Self, StorageError> {
        from_str(data, format)
    }

    pub fn to_string(&self, format: ConfigFormat) -> Result<String, StorageError> {
        to_string(self, format)
    }
}
