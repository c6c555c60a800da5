//! # Plinth Query Engine
//!
//! Attribute predicate filtering over the registry. A query is a list of
//! [`Constraint`]s that must all hold. The stored attribute value is treated
//! as a comma separated list and a constraint holds when any element
//! matches the queried value:
//!
//! - an element containing `*` is a glob: its non-empty segments must occur
//!   in the queried value in order (case sensitive);
//! - any other element must equal the queried value, ignoring ASCII case.
//!
//! Disabled descriptors never appear in results.
use log::trace;
use serde::{Deserialize, Serialize};

use crate::plugin_system::descriptor::{split_list, Descriptor};
use crate::plugin_system::disabled::DisabledSet;
use crate::plugin_system::registry::Registry;

/// A single `(section, attribute, value)` equality constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(rename = "group", alias = "section")]
    pub section: String,
    pub attribute: String,
    pub value: String,
}

impl Constraint {
    pub fn new(section: &str, attribute: &str, value: &str) -> Self {
        Self {
            section: section.to_string(),
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }

    /// Build constraints from a flat `section, attribute, value, ...` sequence.
    ///
    /// The sequence ends at the first empty section or at an incomplete
    /// trailing triple, whichever comes first. An empty result means
    /// "no filter".
    pub fn from_flat<S: AsRef<str>>(flat: &[S]) -> Vec<Constraint> {
        flat.chunks(3)
            .take_while(|triple| triple.len() == 3 && !triple[0].as_ref().is_empty())
            .map(|triple| {
                Constraint::new(triple[0].as_ref(), triple[1].as_ref(), triple[2].as_ref())
            })
            .collect()
    }

    /// Whether the descriptor's current attribute value satisfies this constraint
    pub fn matches(&self, descriptor: &Descriptor) -> bool {
        descriptor
            .attributes()
            .get(&self.section, &self.attribute)
            .is_some_and(|stored| value_matches(stored, &self.value))
    }
}

/// Match a stored (comma separated) attribute value against a queried value.
pub fn value_matches(stored: &str, queried: &str) -> bool {
    split_list(stored).iter().any(|element| {
        if element.contains('*') {
            glob_matches(element, queried)
        } else {
            element.eq_ignore_ascii_case(queried)
        }
    })
}

/// Ordered, unanchored segment search.
fn glob_matches(pattern: &str, queried: &str) -> bool {
    let mut rest = queried;
    for segment in pattern.split('*').filter(|s| !s.is_empty()) {
        match rest.find(segment) {
            Some(pos) => rest = &rest[pos + segment.len()..],
            None => return false,
        }
    }
    true
}

/// Read-only query view over a registry and a disabled set.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    registry: &'a Registry,
    disabled: &'a DisabledSet,
}

impl<'a> QueryEngine<'a> {
    pub fn new(registry: &'a Registry, disabled: &'a DisabledSet) -> Self {
        Self { registry, disabled }
    }

    /// Descriptors satisfying every constraint, in registry order.
    ///
    /// An empty constraint list selects every enabled descriptor.
    pub fn list_query(&self, constraints: &[Constraint]) -> Vec<&'a Descriptor> {
        self.registry
            .all()
            .into_iter()
            .filter(|d| !self.disabled.is_disabled(d.id()))
            .filter(|d| Self::satisfies(d, constraints))
            .collect()
    }

    /// Same as [`QueryEngine::list_query`] but disabled descriptors are kept.
    pub fn list_query_including_disabled(&self, constraints: &[Constraint]) -> Vec<&'a Descriptor> {
        self.registry
            .all()
            .into_iter()
            .filter(|d| Self::satisfies(d, constraints))
            .collect()
    }

    /// Flat form: `query(&["Section", "Attr", "Value", "Section2", ...])`.
    pub fn query<S: AsRef<str>>(&self, flat: &[S]) -> Vec<&'a Descriptor> {
        self.list_query(&Constraint::from_flat(flat))
    }

    /// Enabled descriptors that export `capability` and satisfy the constraints
    pub fn with_capability(&self, capability: &str, constraints: &[Constraint]) -> Vec<&'a Descriptor> {
        self.list_query(constraints)
            .into_iter()
            .filter(|d| d.exports(capability))
            .collect()
    }

    fn satisfies(descriptor: &Descriptor, constraints: &[Constraint]) -> bool {
        let satisfied = constraints.iter().all(|c| c.matches(descriptor));
        trace!("Query on '{}' satisfied: {}", descriptor.id(), satisfied);
        satisfied
    }
}
