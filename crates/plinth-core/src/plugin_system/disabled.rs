//! # Plinth Disabled Set
//!
//! Ids hidden from query results. Each id carries the set of scopes that
//! disabled it: the global scope used by explicit `disable` / `enable`
//! calls, and one scope per loaded profile. An id stays disabled while any
//! scope still holds it, so one profile clearing its contribution never
//! re-enables an id another scope wants hidden.
use std::collections::{BTreeMap, BTreeSet};

/// Owner of a disable entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DisableScope {
    Global,
    Profile(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisabledSet {
    entries: BTreeMap<String, BTreeSet<DisableScope>>,
}

impl DisabledSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable in the global scope
    pub fn disable(&mut self, id: &str) {
        self.disable_scoped(id, DisableScope::Global);
    }

    /// Drop the global scope's entry
    pub fn enable(&mut self, id: &str) {
        self.enable_scoped(id, &DisableScope::Global);
    }

    pub fn disable_scoped(&mut self, id: &str, scope: DisableScope) {
        self.entries.entry(id.to_string()).or_default().insert(scope);
    }

    pub fn enable_scoped(&mut self, id: &str, scope: &DisableScope) {
        if let Some(scopes) = self.entries.get_mut(id) {
            scopes.remove(scope);
            if scopes.is_empty() {
                self.entries.remove(id);
            }
        }
    }

    /// Remove every entry owned by `scope`; returns the ids that became enabled.
    pub fn clear_scope(&mut self, scope: &DisableScope) -> Vec<String> {
        let mut enabled = Vec::new();
        self.entries.retain(|id, scopes| {
            if scopes.remove(scope) && scopes.is_empty() {
                enabled.push(id.clone());
                return false;
            }
            !scopes.is_empty()
        });
        enabled
    }

    pub fn is_disabled(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Disabled ids in sorted order
    pub fn ids(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn ids_in_scope(&self, scope: &DisableScope) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, scopes)| scopes.contains(scope))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
