//! # Plinth Profile Reconciler
//!
//! A [`Profile`] converges the plugin manager towards the plugin set its
//! requirement documents describe, then follows activation events to keep
//! a live membership list that can be synced to a [`ProfileSink`].
//!
//! Loading is not transactional: when a mandatory requirement is unmet the
//! load fails after the profile's filter has been applied, and that disable
//! contribution stays until [`Profile::unload`]. No plugin is activated or
//! deactivated by a failing load.
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};

use crate::event::{EventId, PluginEvent};
use crate::plugin_system::descriptor::Descriptor;
use crate::plugin_system::disabled::DisableScope;
use crate::plugin_system::manager::PluginManager;
use crate::profile::document::{
    DocumentParser, ParsedDocument, ProfileSource, RequirementDocument, RequirementGroup,
    SerdeDocumentParser,
};
use crate::profile::error::{MissingPlugin, ProfileError};
use crate::profile::sync::{member_requirement, MemberEntry, ProfileSink};

/// Undo information for one attribute override
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRecord {
    pub plugin_id: String,
    pub section: String,
    pub key: String,
    /// Shadow value that was in place before, if any
    pub previous: Option<String>,
}

/// Live membership, shared with the event handler
#[derive(Default)]
struct Membership {
    entries: Vec<MemberEntry>,
    excluded: BTreeSet<String>,
    sink: Option<Box<dyn ProfileSink>>,
}

impl Membership {
    fn add(&mut self, entry: MemberEntry) -> bool {
        if self.entries.iter().any(|e| e.id == entry.id) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    fn remove(&mut self, id: &str) -> bool {
        let len_before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() < len_before
    }

    /// Members worth persisting: not excluded and user activatable
    fn document(&self) -> RequirementDocument {
        RequirementDocument {
            filter: Vec::new(),
            plugin: self
                .entries
                .iter()
                .filter(|e| e.user_activatable && !self.excluded.contains(&e.id))
                .map(member_requirement)
                .collect(),
        }
    }

    fn sync(&mut self, profile: &str) -> Result<bool, ProfileError> {
        let document = self.document();
        match self.sink.as_mut() {
            Some(sink) => {
                sink.write(profile, &document)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn changed(&mut self, profile: &str) {
        if let Err(e) = self.sync(profile) {
            warn!("Failed to synchronize plugins profile '{profile}': {e}");
        }
    }
}

/// A named desired plugin set
pub struct Profile {
    name: String,
    parser: Box<dyn DocumentParser>,
    membership: Arc<Mutex<Membership>>,
    overrides: Vec<OverrideRecord>,
    subscription: Option<EventId>,
    loaded: bool,
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("name", &self.name)
            .field("plugins", &self.plugins())
            .field("overrides", &self.overrides.len())
            .field("loaded", &self.loaded)
            .finish_non_exhaustive()
    }
}

impl Profile {
    /// Profile reading [`RequirementDocument`]s
    pub fn new(name: &str) -> Self {
        Self::with_parser(name, Box::new(SerdeDocumentParser))
    }

    pub fn with_parser(name: &str, parser: Box<dyn DocumentParser>) -> Self {
        Self {
            name: name.to_string(),
            parser,
            membership: Arc::new(Mutex::new(Membership::default())),
            overrides: Vec::new(),
            subscription: None,
            loaded: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Disable scope owned by this profile
    pub fn scope(&self) -> DisableScope {
        DisableScope::Profile(self.name.clone())
    }

    /// Attach the persistence target; membership changes sync automatically
    pub fn set_sink(&mut self, sink: Box<dyn ProfileSink>) -> Result<(), ProfileError> {
        self.members()?.sink = Some(sink);
        Ok(())
    }

    /// Member ids in the order they joined
    pub fn plugins(&self) -> Vec<String> {
        self.membership
            .lock()
            .map(|m| m.entries.iter().map(|e| e.id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn has_plugin(&self, id: &str) -> bool {
        self.membership
            .lock()
            .is_ok_and(|m| m.entries.iter().any(|e| e.id == id))
    }

    /// Add a member. Returns false when it was already present.
    pub fn add_plugin(&self, descriptor: &Descriptor) -> Result<bool, ProfileError> {
        let mut members = self.members()?;
        let added = members.add(MemberEntry::from_descriptor(descriptor));
        if added {
            members.changed(&self.name);
        }
        Ok(added)
    }

    /// Remove a member. Returns false when it was not present.
    pub fn remove_plugin(&self, id: &str) -> Result<bool, ProfileError> {
        let mut members = self.members()?;
        let removed = members.remove(id);
        if removed {
            members.changed(&self.name);
        }
        Ok(removed)
    }

    /// Override records in the order they were applied
    pub fn overrides(&self) -> &[OverrideRecord] {
        &self.overrides
    }

    /// The document [`Profile::sync`] would write
    pub fn sync_document(&self) -> Result<RequirementDocument, ProfileError> {
        Ok(self.members()?.document())
    }

    /// Write the membership to the sink. Returns false without a sink.
    pub fn sync(&self) -> Result<bool, ProfileError> {
        self.members()?.sync(&self.name)
    }

    /// Parse and reconcile documents. Returns the selected plugin ids.
    pub fn load(
        &mut self,
        manager: &mut PluginManager,
        sources: &[ProfileSource],
    ) -> Result<Vec<String>, ProfileError> {
        let documents = sources
            .iter()
            .map(|source| self.parser.parse(source))
            .collect::<Result<Vec<_>, _>>()?;
        self.load_parsed(manager, &documents)
    }

    /// Reconcile already parsed documents. Returns the selected plugin ids.
    pub fn load_parsed(
        &mut self,
        manager: &mut PluginManager,
        documents: &[ParsedDocument],
    ) -> Result<Vec<String>, ProfileError> {
        if self.loaded {
            return Err(ProfileError::AlreadyLoaded(self.name.clone()));
        }
        info!("Loading profile '{}' from {} document(s)", self.name, documents.len());

        self.apply_filters(manager, documents);
        let selected = self.select_requirements(manager, documents)?;

        let mut desired: Vec<String> = Vec::new();
        let mut excluded = Vec::new();
        for (id, group) in &selected {
            for constraint in &group.overrides {
                let previous = manager.override_attribute(
                    id,
                    &constraint.section,
                    &constraint.attribute,
                    &constraint.value,
                )?;
                self.overrides.push(OverrideRecord {
                    plugin_id: id.clone(),
                    section: constraint.section.clone(),
                    key: constraint.attribute.clone(),
                    previous,
                });
            }
            manager.set_core(id, group.core)?;
            if group.exclude_from_sync {
                excluded.push(id.clone());
            }
            if !desired.contains(id) {
                desired.push(id.clone());
            }
        }

        self.converge(manager, &desired);

        {
            let mut members = self.members()?;
            members.excluded.extend(excluded);
            for id in &desired {
                if let Some(descriptor) = manager.registry().by_id(id) {
                    members.add(MemberEntry::from_descriptor(descriptor));
                }
            }
            members.changed(&self.name);
        }

        self.subscribe(manager);
        self.loaded = true;
        manager.emit(&PluginEvent::ProfileScoped { profile: &self.name });
        info!("Profile '{}' loaded with {} plugin(s)", self.name, desired.len());
        Ok(desired)
    }

    /// Stop tracking, roll back overrides (last applied first) and drop the
    /// profile's disable contribution.
    pub fn unload(&mut self, manager: &mut PluginManager) -> Result<(), ProfileError> {
        if !self.loaded {
            // a failed load may still have left a disable contribution
            manager.clear_disable_scope(&self.scope());
            return Err(ProfileError::NotLoaded(self.name.clone()));
        }

        if let Some(id) = self.subscription.take() {
            if let Err(e) = manager.unsubscribe(id) {
                warn!("Profile '{}': {e}", self.name);
            }
        }
        while let Some(record) = self.overrides.pop() {
            if let Err(e) = manager.restore_override(
                &record.plugin_id,
                &record.section,
                &record.key,
                record.previous.as_deref(),
            ) {
                warn!("Could not restore [{}] {} on '{}': {e}", record.section, record.key, record.plugin_id);
            }
        }
        let enabled = manager.clear_disable_scope(&self.scope());
        debug!("Profile '{}' re-enabled {} plugin(s)", self.name, enabled.len());

        self.loaded = false;
        manager.emit(&PluginEvent::ProfileDescoped { profile: &self.name });
        info!("Profile '{}' unloaded", self.name);
        Ok(())
    }

    fn members(&self) -> Result<MutexGuard<'_, Membership>, ProfileError> {
        self.membership
            .lock()
            .map_err(|_| ProfileError::Poisoned(self.name.clone()))
    }

    /// Hide every descriptor no filter group matches. Without filters nothing is hidden.
    fn apply_filters(&self, manager: &mut PluginManager, documents: &[ParsedDocument]) {
        let scope = self.scope();
        manager.clear_disable_scope(&scope);
        if documents.iter().all(|d| d.filters.is_empty()) {
            return;
        }

        let mut to_disable: BTreeSet<String> = manager.registry().ids().into_iter().collect();
        for filter in documents.iter().flat_map(|d| d.filters.iter()) {
            for descriptor in manager.query().list_query_including_disabled(filter) {
                to_disable.remove(descriptor.id());
            }
        }
        debug!("Profile '{}' disables {} plugin(s)", self.name, to_disable.len());
        for id in to_disable {
            manager.disable_scoped(&id, scope.clone());
        }
    }

    /// Pick one descriptor per requirement group; fails when any mandatory
    /// group ends up without a selection.
    fn select_requirements<'d>(
        &self,
        manager: &mut PluginManager,
        documents: &'d [ParsedDocument],
    ) -> Result<Vec<(String, &'d RequirementGroup)>, ProfileError> {
        let mut selected = Vec::new();
        let mut missing = Vec::new();

        for document in documents {
            for group in &document.requirements {
                let candidates: Vec<String> = manager
                    .list_query(&group.constraints)
                    .iter()
                    .map(|d| d.id().to_string())
                    .collect();
                let chosen = manager.select(
                    "Select a plugin",
                    "Please select a plugin from the list",
                    &candidates,
                );
                match chosen {
                    Some(id) => {
                        debug!("Requirement '{}' selected '{id}'", group.name);
                        selected.push((id, group));
                    }
                    None if group.mandatory => missing.push(MissingPlugin {
                        document: document.label.clone(),
                        name: group.name.clone(),
                        url: group.url.clone(),
                    }),
                    None => debug!("Optional requirement '{}' not satisfied", group.name),
                }
            }
        }

        if missing.is_empty() {
            return Ok(selected);
        }
        let mut labels: Vec<&str> = Vec::new();
        for m in &missing {
            if !labels.contains(&m.document.as_str()) {
                labels.push(&m.document);
            }
        }
        let error = ProfileError::MissingMandatoryPlugins {
            document: labels.join(", "),
            missing,
        };
        warn!("{error}");
        Err(error)
    }

    /// Deactivate what is not wanted, then activate what is.
    fn converge(&self, manager: &mut PluginManager, desired: &[String]) {
        // active core plugins and their dependencies are never deactivated
        let active_core = manager
            .active_plugins()
            .into_iter()
            .filter(|id| manager.registry().by_id(id).is_some_and(Descriptor::is_core));
        let roots: Vec<String> = desired.iter().cloned().chain(active_core).collect();

        let mut keep: HashSet<String> = roots.iter().cloned().collect();
        for id in &roots {
            if let Some(descriptor) = manager.registry().by_id(id) {
                for dependency in descriptor.dependencies() {
                    if let Some(dependency) = manager.registry().get(*dependency) {
                        keep.insert(dependency.id().to_string());
                    }
                }
            }
        }

        let mut active = manager.active_plugins();
        active.reverse();
        for id in active {
            if keep.contains(&id) || !manager.is_active(&id) {
                continue;
            }
            match manager.deactivate(&id) {
                Ok(true) => debug!("Profile '{}' deactivated '{id}'", self.name),
                Ok(false) => warn!("Profile '{}' could not deactivate '{id}'", self.name),
                Err(e) => warn!("Profile '{}': {e}", self.name),
            }
        }

        for id in desired {
            if manager.is_active(id) {
                continue;
            }
            if let Err(e) = manager.activate(id) {
                warn!("Profile '{}' could not activate '{id}': {e}", self.name);
            }
        }
    }

    fn subscribe(&mut self, manager: &mut PluginManager) {
        let membership = Arc::clone(&self.membership);
        let profile = self.name.clone();
        let id = manager.subscribe_all(Box::new(move |event| {
            let Ok(mut members) = membership.lock() else {
                return;
            };
            let changed = match event {
                PluginEvent::Activated { descriptor, .. } => {
                    members.add(MemberEntry::from_descriptor(descriptor))
                }
                PluginEvent::Deactivated { descriptor, .. } => members.remove(descriptor.id()),
                _ => false,
            };
            if changed {
                members.changed(&profile);
            }
        }));
        self.subscription = Some(id);
    }
}
