use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::debug;

use crate::kernel::constants::{IDENTITY_SECTION, LOCATION_KEY};
use crate::plugin_system::descriptor::Descriptor;
use crate::profile::document::{MandatoryFlag, PluginRequirement, RawConstraint, RequirementDocument};
use crate::profile::error::ProfileError;
use crate::storage::config::{self, ConfigFormat, StorageError};

/// A plugin recorded in a profile's live membership
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEntry {
    pub id: String,
    pub name: String,
    pub location: String,
    pub user_activatable: bool,
}

impl MemberEntry {
    pub fn from_descriptor(descriptor: &Descriptor) -> Self {
        Self {
            id: descriptor.id().to_string(),
            name: descriptor.name().to_string(),
            location: descriptor
                .attributes()
                .get(IDENTITY_SECTION, LOCATION_KEY)
                .unwrap_or(descriptor.id())
                .to_string(),
            user_activatable: descriptor.is_user_activatable(),
        }
    }
}

/// Minimal requirement record persisted for one member
pub fn member_requirement(entry: &MemberEntry) -> PluginRequirement {
    PluginRequirement {
        name: Some(entry.name.clone()),
        mandatory: Some(MandatoryFlag::Text("no".to_string())),
        require: vec![RawConstraint::new(IDENTITY_SECTION, LOCATION_KEY, &entry.location)],
        ..PluginRequirement::default()
    }
}

/// Persistence target of profile sync
pub trait ProfileSink: Send {
    fn write(&mut self, profile: &str, document: &RequirementDocument) -> Result<(), ProfileError>;
}

/// Writes the synced document to a file, creating its directory if missing
#[derive(Debug, Clone)]
pub struct FileProfileSink {
    path: PathBuf,
    format: ConfigFormat,
}

impl FileProfileSink {
    /// Sink whose format comes from the file extension
    pub fn new(path: &Path) -> Result<Self, ProfileError> {
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| StorageError::UnsupportedConfigFormat(path.display().to_string()))?;
        Ok(Self::with_format(path, format))
    }

    pub fn with_format(path: &Path, format: ConfigFormat) -> Self {
        Self {
            path: path.to_path_buf(),
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileSink for FileProfileSink {
    fn write(&mut self, profile: &str, document: &RequirementDocument) -> Result<(), ProfileError> {
        debug!("Syncing profile '{profile}' to {}", self.path.display());
        config::write_file(&self.path, document, self.format)?;
        Ok(())
    }
}

/// Keeps every synced document in memory; clones share the same history
#[derive(Clone, Default)]
pub struct MemoryProfileSink {
    written: Arc<Mutex<Vec<RequirementDocument>>>,
}

impl fmt::Debug for MemoryProfileSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryProfileSink")
            .field("writes", &self.count())
            .finish()
    }
}

impl MemoryProfileSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent document
    pub fn last(&self) -> Option<RequirementDocument> {
        self.written.lock().ok().and_then(|w| w.last().cloned())
    }

    pub fn count(&self) -> usize {
        self.written.lock().map(|w| w.len()).unwrap_or(0)
    }
}

impl ProfileSink for MemoryProfileSink {
    fn write(&mut self, profile: &str, document: &RequirementDocument) -> Result<(), ProfileError> {
        self.written
            .lock()
            .map_err(|_| ProfileError::Poisoned(profile.to_string()))?
            .push(document.clone());
        Ok(())
    }
}
