use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::kernel::constants::MANIFEST_SUFFIX;
use crate::plugin_system::descriptor::Descriptor;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::manifest::DescriptorManifest;
use crate::plugin_system::registry::Registry;
use crate::storage::config::{self, ConfigFormat};

/// Descriptors found by a scan, plus the files that failed to load
#[derive(Debug, Default)]
pub struct Discovery {
    pub descriptors: Vec<Descriptor>,
    pub errors: Vec<PluginSystemError>,
}

impl Discovery {
    /// Register every discovered descriptor; returns how many were accepted
    pub fn register_all(self, registry: &mut Registry) -> usize {
        let found = self.descriptors.len();
        let registered = registry.register_all(self.descriptors);
        if registered < found {
            warn!("{} duplicate plugin descriptor(s) ignored", found - registered);
        }
        registered
    }
}

/// Discovers plugin manifests in directories
#[derive(Debug, Default, Clone)]
pub struct ManifestLoader {
    plugin_dirs: Vec<PathBuf>,
}

impl ManifestLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plugin directory to search
    pub fn add_plugin_dir<P: AsRef<Path>>(&mut self, dir: P) {
        self.plugin_dirs.push(dir.as_ref().to_path_buf());
    }

    pub fn plugin_dirs(&self) -> &[PathBuf] {
        &self.plugin_dirs
    }

    /// Scan every configured directory, in order. Missing directories are skipped.
    pub fn scan(&self) -> Discovery {
        let mut discovery = Discovery::default();
        for dir in &self.plugin_dirs {
            if !dir.is_dir() {
                warn!("Plugin directory {} does not exist, skipping", dir.display());
                continue;
            }
            match Self::load_dir(dir) {
                Ok(found) => {
                    discovery.descriptors.extend(found.descriptors);
                    discovery.errors.extend(found.errors);
                }
                Err(e) => discovery.errors.push(e),
            }
        }
        info!(
            "Discovered {} plugin descriptor(s), {} manifest error(s)",
            discovery.descriptors.len(),
            discovery.errors.len()
        );
        discovery
    }

    /// Load every `*.plugin.{json,toml,yaml,yml}` file of one directory,
    /// sorted by file name.
    pub fn load_dir(dir: &Path) -> Result<Discovery, PluginSystemError> {
        let entries = fs::read_dir(dir).map_err(|e| PluginSystemError::ManifestError {
            path: dir.to_path_buf(),
            message: format!("Failed to read plugin directory: {e}"),
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_manifest(path))
            .collect();
        paths.sort();

        let mut discovery = Discovery::default();
        for path in paths {
            match Self::load_manifest(&path) {
                Ok(descriptor) => discovery.descriptors.push(descriptor),
                Err(e) => {
                    warn!("{e}");
                    discovery.errors.push(e);
                }
            }
        }
        Ok(discovery)
    }

    /// Load a single manifest file
    pub fn load_manifest(path: &Path) -> Result<Descriptor, PluginSystemError> {
        debug!("Loading plugin manifest {}", path.display());
        let manifest: DescriptorManifest =
            config::read_file(path).map_err(|e| PluginSystemError::ManifestError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        if manifest.id.trim().is_empty() {
            return Err(PluginSystemError::ManifestError {
                path: path.to_path_buf(),
                message: "plugin id is empty".to_string(),
            });
        }
        Ok(manifest.to_descriptor())
    }
}

/// `<name>.plugin.<ext>` with a supported extension
fn is_manifest(path: &Path) -> bool {
    let supported = ConfigFormat::from_path(path).is_some();
    let stem_matches = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem.ends_with(MANIFEST_SUFFIX) && stem.len() > MANIFEST_SUFFIX.len());
    supported && stem_matches
}
