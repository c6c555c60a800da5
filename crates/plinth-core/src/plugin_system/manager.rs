//! # Plinth Plugin Manager
//!
//! The activation engine. Every registered descriptor is in exactly one of
//! three states:
//!
//! - **Inactive**: no instance exists.
//! - **Active**: the instance is live and receives no more activation calls.
//! - **Cached**: the instance was deactivated and is kept for fast
//!   reactivation without losing its in-memory state.
//!
//! Activation cascades walk the registry in load order and bring up the
//! requested plugin together with every transitive dependency; deactivation
//! cascades walk in reverse load order and take down the requested plugin
//! together with every active transitive dependent. A failure on one plugin
//! is recorded as a diagnostic and never aborts the rest of the walk.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::event::{
    CascadeRequest, EventDispatcher, EventHandler, EventId, EventSystemError, PluginEvent,
    RequestQueue,
};
use crate::kernel::constants::{LOADER_SECTION, SUPPORTED_LANGUAGE_KEY};
use crate::plugin_system::dependency::ResolutionReport;
use crate::plugin_system::descriptor::{Descriptor, DescriptorIdx};
use crate::plugin_system::disabled::{DisableScope, DisabledSet};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::factory::{FactoryRegistry, PluginFactory};
use crate::plugin_system::query::{Constraint, QueryEngine};
use crate::plugin_system::registry::Registry;
use crate::plugin_system::selection::{Disambiguator, RememberedSelections};
use crate::plugin_system::traits::PluginInstance;
use crate::storage::config::EngineConfig;

/// Observable activation state of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Inactive,
    Active,
    Cached,
}

/// Live instance slot; a descriptor without a slot is inactive
#[derive(Clone)]
enum InstanceSlot {
    Active(Arc<dyn PluginInstance>),
    Cached(Arc<dyn PluginInstance>),
}

/// Where the instance for a descriptor comes from
enum FactorySource {
    Registered(Arc<dyn PluginFactory>),
    Loader(Arc<dyn PluginInstance>),
}

/// Activation engine over a resolved [`Registry`]
pub struct PluginManager {
    registry: Registry,
    factories: FactoryRegistry,
    disambiguator: Box<dyn Disambiguator>,
    slots: HashMap<DescriptorIdx, InstanceSlot>,
    disabled: DisabledSet,
    remembered: RememberedSelections,
    dispatcher: EventDispatcher,
    requests: RequestQueue,
    diagnostics: Vec<PluginSystemError>,
    cascade_depth: usize,
    /// Loader plugins being activated to instantiate another plugin
    resolving_loaders: Vec<DescriptorIdx>,
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManager")
            .field("registry", &self.registry)
            .field("factories", &self.factories)
            .field("active", &self.active_plugins())
            .field("disabled", &self.disabled)
            .field("remembered", &self.remembered)
            .field("dispatcher", &self.dispatcher)
            .field("diagnostics", &self.diagnostics.len())
            .finish_non_exhaustive()
    }
}

impl PluginManager {
    /// Create a manager. The registry is expected to be resolved already.
    pub fn new(
        registry: Registry,
        factories: FactoryRegistry,
        disambiguator: Box<dyn Disambiguator>,
    ) -> Self {
        Self {
            registry,
            factories,
            disambiguator,
            slots: HashMap::new(),
            disabled: DisabledSet::new(),
            remembered: RememberedSelections::new(),
            dispatcher: EventDispatcher::new(),
            requests: RequestQueue::new(),
            diagnostics: Vec::new(),
            cascade_depth: 0,
            resolving_loaders: Vec::new(),
        }
    }

    /// Create a manager seeded from configuration: native language tags,
    /// loader capability, remembered selections and globally disabled ids.
    pub fn with_config(
        registry: Registry,
        mut factories: FactoryRegistry,
        disambiguator: Box<dyn Disambiguator>,
        config: &EngineConfig,
    ) -> Self {
        factories.set_native_languages(&config.native_languages);
        factories.set_loader_capability(&config.loader_capability);
        let mut manager = Self::new(registry, factories, disambiguator);
        manager.set_remembered_selections(&config.remembered_selections);
        for id in &config.disabled {
            manager.disabled.disable(id);
        }
        manager
    }

    /// Write remembered selections and globally disabled ids back into `config`.
    pub fn store_into(&self, config: &mut EngineConfig) {
        config.remembered_selections = self.remembered_selections_string();
        config.disabled = self
            .disabled
            .ids_in_scope(&DisableScope::Global)
            .into_iter()
            .map(str::to_string)
            .collect();
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn factories(&self) -> &FactoryRegistry {
        &self.factories
    }

    /// Re-run dependency resolution. Only allowed before any plugin has an
    /// instance, since resolution may prune descriptors.
    pub fn resolve(&mut self) -> Result<ResolutionReport, PluginSystemError> {
        if !self.slots.is_empty() {
            return Err(PluginSystemError::InvalidState(
                "resolution after activation is not supported".to_string(),
            ));
        }
        Ok(self.registry.resolve())
    }

    //--------------------------------------------------
    // Queries
    //--------------------------------------------------

    pub fn query(&self) -> QueryEngine<'_> {
        QueryEngine::new(&self.registry, &self.disabled)
    }

    pub fn list_query(&self, constraints: &[Constraint]) -> Vec<&Descriptor> {
        self.query().list_query(constraints)
    }

    pub fn state(&self, id: &str) -> Option<PluginState> {
        let idx = self.registry.index_of(id)?;
        Some(self.state_of(idx))
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.state(id) == Some(PluginState::Active)
    }

    /// Whether any active plugin exports `capability`
    pub fn is_capability_active(&self, capability: &str) -> bool {
        self.registry
            .by_capability(capability)
            .iter()
            .any(|d| self.is_active(d.id()))
    }

    /// Active ids in load order
    pub fn active_plugins(&self) -> Vec<String> {
        self.registry
            .order()
            .iter()
            .filter(|idx| self.state_of(**idx) == PluginState::Active)
            .filter_map(|idx| self.registry.get(*idx).map(|d| d.id().to_string()))
            .collect()
    }

    /// Instance of an active plugin
    pub fn instance(&self, id: &str) -> Option<Arc<dyn PluginInstance>> {
        self.registry.index_of(id).and_then(|idx| self.active_instance(idx))
    }

    //--------------------------------------------------
    // Disabled set
    //--------------------------------------------------

    /// Hide ids from query results. Active instances are not affected.
    pub fn disable<S: AsRef<str>>(&mut self, ids: &[S]) {
        for id in ids {
            self.disabled.disable(id.as_ref());
        }
    }

    pub fn enable<S: AsRef<str>>(&mut self, ids: &[S]) {
        for id in ids {
            self.disabled.enable(id.as_ref());
        }
    }

    pub fn disable_scoped(&mut self, id: &str, scope: DisableScope) {
        self.disabled.disable_scoped(id, scope);
    }

    pub fn clear_disable_scope(&mut self, scope: &DisableScope) -> Vec<String> {
        self.disabled.clear_scope(scope)
    }

    pub fn is_disabled(&self, id: &str) -> bool {
        self.disabled.is_disabled(id)
    }

    pub fn disabled(&self) -> &DisabledSet {
        &self.disabled
    }

    //--------------------------------------------------
    // Attribute overrides
    //--------------------------------------------------

    pub fn override_attribute(
        &mut self,
        id: &str,
        section: &str,
        key: &str,
        value: &str,
    ) -> Result<Option<String>, PluginSystemError> {
        self.registry.override_attribute(id, section, key, value)
    }

    pub fn remove_override(
        &mut self,
        id: &str,
        section: &str,
        key: &str,
    ) -> Result<Option<String>, PluginSystemError> {
        self.registry.remove_override(id, section, key)
    }

    pub(crate) fn restore_override(
        &mut self,
        id: &str,
        section: &str,
        key: &str,
        previous: Option<&str>,
    ) -> Result<(), PluginSystemError> {
        self.registry.restore_override(id, section, key, previous)
    }

    pub fn set_core(&mut self, id: &str, core: bool) -> Result<(), PluginSystemError> {
        self.registry.set_core(id, core)
    }

    //--------------------------------------------------
    // Events
    //--------------------------------------------------

    /// Subscribe to one event name (see [`crate::event::PLUGIN_ACTIVATED`] and friends)
    pub fn subscribe(&mut self, event_name: &'static str, handler: EventHandler) -> EventId {
        self.dispatcher.register_handler(event_name, handler)
    }

    pub fn subscribe_all(&mut self, handler: EventHandler) -> EventId {
        self.dispatcher.register_global_handler(handler)
    }

    pub fn unsubscribe(&mut self, id: EventId) -> Result<(), EventSystemError> {
        if self.dispatcher.unregister_handler(id) {
            Ok(())
        } else {
            Err(EventSystemError::HandlerUnregistrationFailed {
                id,
                reason: "no handler with this id".to_string(),
            })
        }
    }

    pub fn emit(&self, event: &PluginEvent<'_>) -> usize {
        self.dispatcher.dispatch(event)
    }

    /// Handle through which event handlers queue further activation work
    pub fn request_queue(&self) -> RequestQueue {
        self.requests.clone()
    }

    /// Per-item failures recorded by cascades since the last call
    pub fn take_diagnostics(&mut self) -> Vec<PluginSystemError> {
        std::mem::take(&mut self.diagnostics)
    }

    //--------------------------------------------------
    // Remembered selections
    //--------------------------------------------------

    pub fn remembered_selections(&self) -> &RememberedSelections {
        &self.remembered
    }

    /// Persisted `ids=chosen;` form of the remembered selections
    pub fn remembered_selections_string(&self) -> String {
        self.remembered.to_persisted_string()
    }

    /// Replace the remembered selections; entries naming unknown plugins are dropped
    pub fn set_remembered_selections(&mut self, persisted: &str) {
        let registry = &self.registry;
        self.remembered = RememberedSelections::parse(persisted, |id| registry.contains(id));
    }

    pub fn forget_selection(&mut self, key: &str) -> Option<String> {
        self.remembered.forget(key)
    }

    //--------------------------------------------------
    // Activation
    //--------------------------------------------------

    /// Activate a plugin and its dependencies, returning its instance.
    ///
    /// Already active plugins are returned as is. Failures of dependencies
    /// are recorded in the diagnostics; the returned error is the one for
    /// the requested plugin.
    pub fn activate(&mut self, id: &str) -> Result<Arc<dyn PluginInstance>, PluginSystemError> {
        let idx = self.index(id)?;
        self.begin_cascade();
        let result = self.activate_cascade(idx);
        self.end_cascade();
        result
    }

    /// Instance of a plugin, activating it first when needed
    pub fn get_by_id(&mut self, id: &str) -> Result<Arc<dyn PluginInstance>, PluginSystemError> {
        self.activate(id)
    }

    /// Activate several plugins in the given order
    pub fn activate_all<S: AsRef<str>>(
        &mut self,
        ids: &[S],
    ) -> Vec<(String, Result<Arc<dyn PluginInstance>, PluginSystemError>)> {
        self.begin_cascade();
        let outcomes = ids
            .iter()
            .map(|id| {
                let id = id.as_ref();
                let result = self.index(id).and_then(|idx| self.activate_cascade(idx));
                (id.to_string(), result)
            })
            .collect();
        self.end_cascade();
        outcomes
    }

    /// Deactivate a plugin and every active plugin depending on it.
    ///
    /// Returns whether the plugin ended up not active. Vetoes are recorded
    /// in the diagnostics.
    pub fn deactivate(&mut self, id: &str) -> Result<bool, PluginSystemError> {
        let idx = self.index(id)?;
        self.begin_cascade();
        let deactivated = self.deactivate_cascade(idx);
        self.end_cascade();
        Ok(deactivated)
    }

    /// Instance for a capability.
    ///
    /// An active provider wins. Otherwise the enabled providers are
    /// considered: a single one is activated, several go through the
    /// selection protocol. `None` when nothing provides the capability or
    /// the prompt was declined.
    pub fn get_by_capability(
        &mut self,
        capability: &str,
    ) -> Result<Option<Arc<dyn PluginInstance>>, PluginSystemError> {
        let active = self
            .registry
            .by_capability(capability)
            .iter()
            .filter_map(|d| self.registry.index_of(d.id()))
            .find_map(|idx| self.active_instance(idx));
        if let Some(instance) = active {
            return Ok(Some(instance));
        }

        let candidates = self.indexes(self.query().with_capability(capability, &[]));
        let chosen = self.select_idx(
            &format!("Select a plugin providing {capability}"),
            &format!("Several plugins provide '{capability}'. Please select one."),
            &candidates,
        );
        match chosen {
            Some(idx) => {
                self.begin_cascade();
                let result = self.activate_cascade(idx);
                self.end_cascade();
                result.map(Some)
            }
            None => Ok(None),
        }
    }

    /// Run the selection protocol over candidate ids without activating.
    ///
    /// A single candidate is returned without prompting; several use the
    /// remembered choice for the exact candidate set or prompt. Unknown ids
    /// are ignored.
    pub fn select<S: AsRef<str>>(&mut self, title: &str, description: &str, candidates: &[S]) -> Option<String> {
        let candidates: Vec<DescriptorIdx> = candidates
            .iter()
            .filter_map(|id| self.registry.index_of(id.as_ref()))
            .collect();
        self.select_idx(title, description, &candidates)
            .and_then(|idx| self.registry.get(idx))
            .map(|d| d.id().to_string())
    }

    /// [`PluginManager::select`] followed by activation of the choice
    pub fn select_and_activate<S: AsRef<str>>(
        &mut self,
        title: &str,
        description: &str,
        candidates: &[S],
    ) -> Result<Option<Arc<dyn PluginInstance>>, PluginSystemError> {
        match self.select(title, description, candidates) {
            Some(id) => self.activate(&id).map(Some),
            None => Ok(None),
        }
    }

    /// Deactivate every active plugin in reverse load order, then drop all
    /// active and cached instances.
    pub fn unload_all(&mut self) {
        self.begin_cascade();
        let order: Vec<DescriptorIdx> = self.registry.order().iter().rev().copied().collect();
        for idx in order {
            let Some(instance) = self.active_instance(idx) else {
                continue;
            };
            if instance.deactivate() {
                self.emit_deactivated(idx, &instance);
            } else {
                let plugin_id = self.id_of(idx);
                warn!("Plugin '{plugin_id}' does not want to be deactivated, unloading anyway");
                self.diagnostics
                    .push(PluginSystemError::VetoedDeactivation { plugin_id });
            }
        }
        self.slots.clear();
        info!("All plugins unloaded");
        self.end_cascade();
    }

    /// Drop a cached instance so the next activation creates a fresh one
    pub fn forget_cached(&mut self, id: &str) -> bool {
        let Some(idx) = self.registry.index_of(id) else {
            return false;
        };
        if matches!(self.slots.get(&idx), Some(InstanceSlot::Cached(_))) {
            self.slots.remove(&idx);
            debug!("Dropped cached instance of '{id}'");
            true
        } else {
            false
        }
    }

    //--------------------------------------------------
    // Internals
    //--------------------------------------------------

    fn index(&self, id: &str) -> Result<DescriptorIdx, PluginSystemError> {
        self.registry
            .index_of(id)
            .ok_or_else(|| PluginSystemError::not_found(id))
    }

    fn indexes(&self, descriptors: Vec<&Descriptor>) -> Vec<DescriptorIdx> {
        descriptors
            .into_iter()
            .filter_map(|d| self.registry.index_of(d.id()))
            .collect()
    }

    fn id_of(&self, idx: DescriptorIdx) -> String {
        self.registry
            .get(idx)
            .map(|d| d.id().to_string())
            .unwrap_or_else(|| idx.to_string())
    }

    fn state_of(&self, idx: DescriptorIdx) -> PluginState {
        match self.slots.get(&idx) {
            None => PluginState::Inactive,
            Some(InstanceSlot::Active(_)) => PluginState::Active,
            Some(InstanceSlot::Cached(_)) => PluginState::Cached,
        }
    }

    fn active_instance(&self, idx: DescriptorIdx) -> Option<Arc<dyn PluginInstance>> {
        match self.slots.get(&idx) {
            Some(InstanceSlot::Active(instance)) => Some(instance.clone()),
            _ => None,
        }
    }

    fn record(&mut self, error: PluginSystemError) -> PluginSystemError {
        self.diagnostics.push(error.clone());
        error
    }

    fn begin_cascade(&mut self) {
        self.cascade_depth += 1;
    }

    fn end_cascade(&mut self) {
        self.cascade_depth = self.cascade_depth.saturating_sub(1);
        if self.cascade_depth == 0 {
            self.drain_requests();
        }
    }

    /// Run requests queued by event handlers, FIFO, including the ones
    /// queued while draining.
    fn drain_requests(&mut self) {
        self.cascade_depth += 1;
        loop {
            match self.requests.pop() {
                Ok(Some(CascadeRequest::Activate(id))) => {
                    debug!("Running queued activation of '{id}'");
                    match self.index(&id) {
                        Ok(idx) => {
                            // failures are already in the diagnostics
                            let _ = self.activate_cascade(idx);
                        }
                        Err(e) => self.diagnostics.push(e),
                    }
                }
                Ok(Some(CascadeRequest::Deactivate(id))) => {
                    debug!("Running queued deactivation of '{id}'");
                    match self.index(&id) {
                        Ok(idx) => {
                            self.deactivate_cascade(idx);
                        }
                        Err(e) => self.diagnostics.push(e),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Dropping queued plugin requests: {e}");
                    break;
                }
            }
        }
        self.cascade_depth -= 1;
    }

    fn activate_cascade(&mut self, idx: DescriptorIdx) -> Result<Arc<dyn PluginInstance>, PluginSystemError> {
        if let Some(instance) = self.active_instance(idx) {
            return Ok(instance);
        }
        let descriptor = self
            .registry
            .get(idx)
            .ok_or_else(|| PluginSystemError::InternalError(format!("no descriptor at {idx}")))?;

        if !descriptor.can_load() {
            let missing = descriptor
                .dependency_names()
                .iter()
                .find(|name| {
                    self.registry
                        .by_id(name)
                        .is_none_or(|dependency| !dependency.can_load())
                })
                .cloned()
                .unwrap_or_default();
            let error = PluginSystemError::MissingDependency {
                plugin_id: descriptor.id().to_string(),
                missing,
            };
            warn!("{error}");
            return Err(self.record(error));
        }

        let dependencies = descriptor.dependencies().clone();
        let targets: Vec<DescriptorIdx> = self
            .registry
            .order()
            .iter()
            .filter(|i| **i == idx || dependencies.contains(i))
            .copied()
            .collect();
        debug!(
            "Activating '{}' with {} plugin(s) in cascade",
            descriptor.id(),
            targets.len()
        );

        let mut failure = None;
        for target in targets {
            if self.state_of(target) == PluginState::Active {
                continue;
            }
            let result = self.activate_single(target);
            if let Err(error) = result {
                self.diagnostics.push(error.clone());
                if target == idx {
                    failure = Some(error);
                }
            }
        }

        match self.active_instance(idx) {
            Some(instance) => Ok(instance),
            None => Err(failure.unwrap_or_else(|| {
                PluginSystemError::InternalError(format!("'{}' was not activated", self.id_of(idx)))
            })),
        }
    }

    /// Bring one plugin up, assuming the cascade handled its dependencies.
    fn activate_single(&mut self, idx: DescriptorIdx) -> Result<(), PluginSystemError> {
        let plugin_id = self.id_of(idx);

        let inactive_dependency = self.registry.get(idx).and_then(|d| {
            d.dependencies()
                .iter()
                .find(|dep| self.state_of(**dep) != PluginState::Active)
                .copied()
        });
        if let Some(dependency) = inactive_dependency {
            let error = PluginSystemError::DependencyNotActive {
                plugin_id,
                dependency: self.id_of(dependency),
            };
            warn!("{error}");
            return Err(error);
        }

        let instance = match self.slots.get(&idx) {
            Some(InstanceSlot::Cached(instance)) => {
                debug!("Reusing cached instance of '{plugin_id}'");
                instance.clone()
            }
            _ => self.instantiate(idx)?,
        };

        if !instance.activate() {
            warn!("Plugin '{plugin_id}' refused to activate");
            return Err(PluginSystemError::ActivationRefused { plugin_id });
        }

        self.slots.insert(idx, InstanceSlot::Active(instance.clone()));
        info!("Activated plugin '{plugin_id}'");
        self.emit_activated(idx, &instance);
        Ok(())
    }

    fn instantiate(&mut self, idx: DescriptorIdx) -> Result<Arc<dyn PluginInstance>, PluginSystemError> {
        let source = self.resolve_factory(idx)?;
        let descriptor = self
            .registry
            .get(idx)
            .ok_or_else(|| PluginSystemError::InternalError(format!("no descriptor at {idx}")))?;
        let host = self.factories.host();
        let result = match &source {
            FactorySource::Registered(factory) => factory.instantiate(descriptor, host),
            FactorySource::Loader(loader) => match loader.as_factory() {
                Some(factory) => factory.instantiate(descriptor, host),
                None => Err(PluginSystemError::MissingFactory {
                    plugin_id: descriptor.id().to_string(),
                    language: descriptor.language().unwrap_or_default().to_string(),
                }),
            },
        };
        if let Err(e) = &result {
            error!("Could not load '{}': {e}", descriptor.id());
        }
        result
    }

    /// Find the factory able to instantiate a descriptor's language.
    fn resolve_factory(&mut self, idx: DescriptorIdx) -> Result<FactorySource, PluginSystemError> {
        let plugin_id = self.id_of(idx);
        let language = self
            .registry
            .get(idx)
            .and_then(|d| d.language())
            .map(str::to_string);

        let missing = |language: &str| PluginSystemError::MissingFactory {
            plugin_id: plugin_id.clone(),
            language: language.to_string(),
        };

        let Some(language) = language.filter(|l| !self.factories.is_native(Some(l.as_str()))) else {
            return self
                .factories
                .native()
                .cloned()
                .map(FactorySource::Registered)
                .ok_or_else(|| missing("native"));
        };
        if let Some(factory) = self.factories.for_language(&language) {
            return Ok(FactorySource::Registered(factory.clone()));
        }

        let loaders: Vec<DescriptorIdx> = self
            .registry
            .by_capability(self.factories.loader_capability())
            .into_iter()
            .filter(|d| {
                d.attributes()
                    .get_list(LOADER_SECTION, SUPPORTED_LANGUAGE_KEY)
                    .iter()
                    .any(|supported| supported.eq_ignore_ascii_case(&language))
            })
            .filter_map(|d| self.registry.index_of(d.id()))
            .collect();

        if let Some(loader) = loaders.iter().find_map(|l| self.active_instance(*l)) {
            return Ok(FactorySource::Loader(loader));
        }

        let chosen = self
            .select_idx(
                &format!("Select a plugin loader for {language}"),
                &format!("Several plugins can load '{language}' plugins. Please select one."),
                &loaders,
            )
            .ok_or_else(|| missing(&language))?;
        if chosen == idx || self.resolving_loaders.contains(&chosen) {
            warn!("Plugin loader '{}' would be needed to load itself", self.id_of(chosen));
            return Err(missing(&language));
        }

        self.resolving_loaders.push(chosen);
        let loader = self.activate_cascade(chosen);
        self.resolving_loaders.pop();
        Ok(FactorySource::Loader(loader?))
    }

    fn deactivate_cascade(&mut self, idx: DescriptorIdx) -> bool {
        let Some(dependents) = self.registry.get(idx).map(|d| d.dependents().clone()) else {
            return true;
        };
        let targets: Vec<DescriptorIdx> = self
            .registry
            .order()
            .iter()
            .rev()
            .filter(|i| (**i == idx || dependents.contains(i)) && self.state_of(**i) == PluginState::Active)
            .copied()
            .collect();

        for target in targets {
            let plugin_id = self.id_of(target);
            let still_required = self.registry.get(target).and_then(|d| {
                d.dependents()
                    .iter()
                    .find(|dependent| self.state_of(**dependent) == PluginState::Active)
                    .copied()
            });
            if let Some(dependent) = still_required {
                let error = PluginSystemError::StillRequired {
                    plugin_id,
                    dependent: self.id_of(dependent),
                };
                warn!("{error}");
                self.diagnostics.push(error);
                continue;
            }

            let Some(instance) = self.active_instance(target) else {
                continue;
            };
            if instance.deactivate() {
                self.slots.insert(target, InstanceSlot::Cached(instance.clone()));
                info!("Deactivated plugin '{plugin_id}'");
                self.emit_deactivated(target, &instance);
            } else {
                let error = PluginSystemError::VetoedDeactivation { plugin_id };
                warn!("{error}");
                self.diagnostics.push(error);
            }
        }

        self.state_of(idx) != PluginState::Active
    }

    /// Selection protocol shared by capability lookup, loader lookup and profiles.
    pub(crate) fn select_idx(
        &mut self,
        title: &str,
        description: &str,
        candidates: &[DescriptorIdx],
    ) -> Option<DescriptorIdx> {
        match candidates {
            [] => return None,
            [only] => return Some(*only),
            _ => {}
        }

        let ids: Vec<&str> = candidates
            .iter()
            .filter_map(|idx| self.registry.get(*idx).map(Descriptor::id))
            .collect();
        let key = RememberedSelections::key_for(&ids);
        if let Some(remembered) = self.remembered.get(&key) {
            if let Some(idx) = candidates
                .iter()
                .find(|idx| self.registry.get(**idx).is_some_and(|d| d.id() == remembered))
            {
                debug!("Using remembered selection '{remembered}' for [{key}]");
                return Some(*idx);
            }
        }

        let descriptors: Vec<&Descriptor> = candidates
            .iter()
            .filter_map(|idx| self.registry.get(*idx))
            .collect();
        let selection = self.disambiguator.select_one(title, description, &descriptors);
        let Some(chosen) = selection.chosen else {
            warn!("No plugin selected among [{key}]");
            return None;
        };
        let Some(idx) = candidates
            .iter()
            .find(|idx| self.registry.get(**idx).is_some_and(|d| d.id() == chosen))
            .copied()
        else {
            warn!("Selected plugin '{chosen}' is not one of [{key}]");
            return None;
        };
        if selection.remember {
            self.remembered.remember(&key, &chosen);
        }
        Some(idx)
    }

    fn emit_activated(&self, idx: DescriptorIdx, instance: &Arc<dyn PluginInstance>) {
        if let Some(descriptor) = self.registry.get(idx) {
            self.dispatcher
                .dispatch(&PluginEvent::Activated { descriptor, instance });
        }
    }

    fn emit_deactivated(&self, idx: DescriptorIdx, instance: &Arc<dyn PluginInstance>) {
        if let Some(descriptor) = self.registry.get(idx) {
            self.dispatcher
                .dispatch(&PluginEvent::Deactivated { descriptor, instance });
        }
    }
}
