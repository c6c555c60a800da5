//! # Plinth Candidate Selection
//!
//! When several descriptors satisfy a request the engine asks an external
//! [`Disambiguator`] to pick one. Choices can be remembered under a key made
//! of the sorted candidate ids, so the same exact candidate set never
//! prompts twice. The remembered map persists as `key=chosen;` entries.
use std::collections::BTreeMap;

use log::debug;

use crate::plugin_system::descriptor::Descriptor;

/// Answer of a disambiguation prompt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Chosen descriptor id, `None` when the prompt was declined
    pub chosen: Option<String>,
    /// Whether the choice should be remembered for the same candidate set
    pub remember: bool,
}

impl Selection {
    pub fn chosen(id: &str, remember: bool) -> Self {
        Self { chosen: Some(id.to_string()), remember }
    }

    pub fn declined() -> Self {
        Self::default()
    }
}

/// External, blocking candidate chooser.
pub trait Disambiguator {
    fn select_one(&mut self, title: &str, description: &str, candidates: &[&Descriptor]) -> Selection;
}

/// Always picks the first candidate without remembering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstCandidate;

impl Disambiguator for FirstCandidate {
    fn select_one(&mut self, _title: &str, _description: &str, candidates: &[&Descriptor]) -> Selection {
        candidates
            .first()
            .map(|d| Selection::chosen(d.id(), false))
            .unwrap_or_default()
    }
}

/// Declines every prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclineAll;

impl Disambiguator for DeclineAll {
    fn select_one(&mut self, _title: &str, _description: &str, _candidates: &[&Descriptor]) -> Selection {
        Selection::declined()
    }
}

/// Memoized choices keyed by canonical candidate set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RememberedSelections {
    entries: BTreeMap<String, String>,
}

impl RememberedSelections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical key of a candidate set: ids sorted and comma joined
    pub fn key_for<S: AsRef<str>>(ids: &[S]) -> String {
        let mut ids: Vec<&str> = ids.iter().map(AsRef::as_ref).collect();
        ids.sort_unstable();
        ids.join(",")
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn remember(&mut self, key: &str, chosen: &str) {
        debug!("Remembering selection '{key}' -> '{chosen}'");
        self.entries.insert(key.to_string(), chosen.to_string());
    }

    pub fn forget(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize as repeated `key=chosen;` entries, keys in sorted order.
    pub fn to_persisted_string(&self) -> String {
        self.entries
            .iter()
            .map(|(key, chosen)| format!("{key}={chosen};"))
            .collect()
    }

    /// Parse the persisted form. Malformed entries and entries whose chosen
    /// id `is_known` rejects are dropped.
    pub fn parse<F: Fn(&str) -> bool>(persisted: &str, is_known: F) -> Self {
        let mut selections = Self::new();
        for entry in persisted.split(';') {
            let mut parts = entry.split('=');
            let (Some(key), Some(chosen)) = (parts.next(), parts.next()) else {
                continue;
            };
            let (key, chosen) = (key.trim(), chosen.trim());
            if key.is_empty() || chosen.is_empty() {
                continue;
            }
            if is_known(chosen) {
                selections.entries.insert(key.to_string(), chosen.to_string());
            } else {
                debug!("Dropping remembered selection '{key}': unknown plugin '{chosen}'");
            }
        }
        selections
    }
}
