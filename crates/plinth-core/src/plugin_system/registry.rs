//! # Plinth Plugin Registry
//!
//! Holds every discovered [`Descriptor`] in an arena indexed by
//! [`DescriptorIdx`], with lookup indexes by id and by exported capability
//! and an ordered list that becomes the load order once the resolver has run.
use std::collections::HashMap;

use log::{debug, warn};

use crate::plugin_system::dependency::{ResolutionReport, Resolver};
use crate::plugin_system::descriptor::{Descriptor, DescriptorIdx};
use crate::plugin_system::error::PluginSystemError;

/// Registry of plugin descriptors
#[derive(Debug, Default)]
pub struct Registry {
    /// Arena; removed descriptors leave an empty slot so indexes stay stable
    slots: Vec<Option<Descriptor>>,
    by_id: HashMap<String, DescriptorIdx>,
    by_capability: HashMap<String, Vec<DescriptorIdx>>,
    /// Registration order until resolution, load order afterwards
    order: Vec<DescriptorIdx>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor.
    ///
    /// The first registration of an id wins; later descriptors with the same
    /// id are dropped and `None` is returned.
    pub fn register(&mut self, descriptor: Descriptor) -> Option<DescriptorIdx> {
        if self.by_id.contains_key(descriptor.id()) {
            warn!(
                "Plugin '{}' is already registered, dropping duplicate descriptor",
                descriptor.id()
            );
            return None;
        }

        let idx = DescriptorIdx(self.slots.len());
        for capability in descriptor.capabilities() {
            self.by_capability
                .entry(capability.clone())
                .or_default()
                .push(idx);
        }
        self.by_id.insert(descriptor.id().to_string(), idx);
        self.order.push(idx);
        debug!("Registered plugin descriptor '{}' at {}", descriptor.id(), idx);
        self.slots.push(Some(descriptor));
        Some(idx)
    }

    /// Register several descriptors, returning how many were accepted
    pub fn register_all<I: IntoIterator<Item = Descriptor>>(&mut self, descriptors: I) -> usize {
        descriptors
            .into_iter()
            .filter_map(|descriptor| self.register(descriptor))
            .count()
    }

    pub fn index_of(&self, id: &str) -> Option<DescriptorIdx> {
        self.by_id.get(id).copied()
    }

    pub fn by_id(&self, id: &str) -> Option<&Descriptor> {
        self.index_of(id).and_then(|idx| self.get(idx))
    }

    pub fn get(&self, idx: DescriptorIdx) -> Option<&Descriptor> {
        self.slots.get(idx.0).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, idx: DescriptorIdx) -> Option<&mut Descriptor> {
        self.slots.get_mut(idx.0).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Descriptors exporting `capability`, in registry order
    pub fn by_capability(&self, capability: &str) -> Vec<&Descriptor> {
        self.by_capability
            .get(capability)
            .map(|idxs| idxs.iter().filter_map(|idx| self.get(*idx)).collect())
            .unwrap_or_default()
    }

    /// All descriptors in registry order (load order after resolution)
    pub fn all(&self) -> Vec<&Descriptor> {
        self.order.iter().filter_map(|idx| self.get(*idx)).collect()
    }

    /// Registry order as indexes
    pub fn order(&self) -> &[DescriptorIdx] {
        &self.order
    }

    /// Ids in registry order
    pub fn ids(&self) -> Vec<String> {
        self.all().iter().map(|d| d.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Remove every listed descriptor from the registry and all indexes.
    ///
    /// Unknown ids are ignored. Used by the resolver when pruning cycles.
    pub fn remove_all<S: AsRef<str>>(&mut self, ids: &[S]) -> Vec<Descriptor> {
        let mut removed = Vec::new();
        for id in ids {
            let Some(idx) = self.by_id.remove(id.as_ref()) else {
                continue;
            };
            self.order.retain(|i| *i != idx);
            for list in self.by_capability.values_mut() {
                list.retain(|i| *i != idx);
            }
            if let Some(descriptor) = self.slots.get_mut(idx.0).and_then(Option::take) {
                removed.push(descriptor);
            }
        }
        self.by_capability.retain(|_, list| !list.is_empty());
        removed
    }

    /// Run dependency resolution over the current contents.
    pub fn resolve(&mut self) -> ResolutionReport {
        Resolver::new().resolve(self)
    }

    /// Replace the registry order. Capability lists follow the new order.
    pub(crate) fn set_order(&mut self, order: Vec<DescriptorIdx>) {
        let position: HashMap<DescriptorIdx, usize> =
            order.iter().enumerate().map(|(pos, idx)| (*idx, pos)).collect();
        for list in self.by_capability.values_mut() {
            list.sort_by_key(|idx| position.get(idx).copied().unwrap_or(usize::MAX));
        }
        self.order = order;
    }

    /// Install a temporary attribute override on a descriptor.
    ///
    /// Returns the shadow value that was replaced, if any.
    pub fn override_attribute(
        &mut self,
        id: &str,
        section: &str,
        key: &str,
        value: &str,
    ) -> Result<Option<String>, PluginSystemError> {
        let idx = self
            .index_of(id)
            .ok_or_else(|| PluginSystemError::not_found(id))?;
        let descriptor = self
            .get_mut(idx)
            .ok_or_else(|| PluginSystemError::not_found(id))?;
        debug!("Overriding [{section}] {key} = '{value}' on plugin '{id}'");
        Ok(descriptor.attributes_mut().override_value(section, key, value))
    }

    /// Remove an attribute override, reverting to the stored value.
    pub fn remove_override(
        &mut self,
        id: &str,
        section: &str,
        key: &str,
    ) -> Result<Option<String>, PluginSystemError> {
        let idx = self
            .index_of(id)
            .ok_or_else(|| PluginSystemError::not_found(id))?;
        let descriptor = self
            .get_mut(idx)
            .ok_or_else(|| PluginSystemError::not_found(id))?;
        Ok(descriptor.attributes_mut().remove_override(section, key))
    }

    /// Restore a shadow value exactly as it was, `None` meaning no override.
    pub(crate) fn restore_override(
        &mut self,
        id: &str,
        section: &str,
        key: &str,
        previous: Option<&str>,
    ) -> Result<(), PluginSystemError> {
        match previous {
            Some(value) => self.override_attribute(id, section, key, value).map(|_| ()),
            None => self.remove_override(id, section, key).map(|_| ()),
        }
    }

    /// Mark a descriptor as core (never deactivated by profile reconciliation)
    pub fn set_core(&mut self, id: &str, core: bool) -> Result<(), PluginSystemError> {
        let idx = self
            .index_of(id)
            .ok_or_else(|| PluginSystemError::not_found(id))?;
        if let Some(descriptor) = self.get_mut(idx) {
            descriptor.set_core(core);
        }
        Ok(())
    }
}
