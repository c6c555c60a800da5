//! # Plinth Dependency Resolution
//!
//! Builds the dense dependency and dependent sets of every registered
//! descriptor, prunes dependency cycles and computes the load order.
//!
//! Traversal is an explicit stack based depth-first search over a visit
//! state map. Reaching a node that is still in progress on the current path
//! means a cycle; every member of the cycle is removed from the registry and
//! resolution restarts from scratch until a full pass finds no cycle.
//! Missing dependencies never fail resolution: the descriptor (and everything
//! depending on it) is marked as unable to load.
use std::collections::{BTreeSet, HashMap};

use log::{debug, warn};
use thiserror::Error;

use crate::plugin_system::descriptor::DescriptorIdx;
use crate::plugin_system::registry::Registry;

/// Error that can occur when resolving dependencies
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    /// A declared dependency is not registered
    #[error("Plugin '{plugin_id}' requires '{missing}' which is not registered")]
    MissingPlugin { plugin_id: String, missing: String },

    /// Dependency cycle detected
    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),
}

/// Outcome of a resolution run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    /// Ids in load order, dependencies first
    pub load_order: Vec<String>,
    /// Groups of ids removed because they formed a cycle
    pub pruned_cycles: Vec<Vec<String>>,
    /// Missing dependency and cycle diagnostics, for logging
    pub diagnostics: Vec<DependencyError>,
}

impl ResolutionReport {
    /// (plugin, missing dependency) pairs found by the final pass
    pub fn missing(&self) -> impl Iterator<Item = (&str, &str)> {
        self.diagnostics.iter().filter_map(|d| match d {
            DependencyError::MissingPlugin { plugin_id, missing } => {
                Some((plugin_id.as_str(), missing.as_str()))
            }
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    /// On the current traversal path; the value is the root's pass number
    InProgress(u32),
    Done,
}

struct Frame {
    idx: DescriptorIdx,
    next_dependency: usize,
}

/// Dependency resolver
#[derive(Debug, Default)]
pub struct Resolver {
    pass: u32,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the registry in place and return the load order and pruned cycles.
    pub fn resolve(&mut self, registry: &mut Registry) -> ResolutionReport {
        let mut report = ResolutionReport::default();

        let diagnostics = loop {
            for idx in registry.order().to_vec() {
                if let Some(descriptor) = registry.get_mut(idx) {
                    descriptor.reset_resolution();
                }
            }

            match self.traverse(registry) {
                Ok(diagnostics) => break diagnostics,
                Err(cycle) => {
                    warn!(
                        "Pruning plugins in dependency cycle: {}",
                        cycle.join(" -> ")
                    );
                    registry.remove_all(&cycle);
                    report
                        .diagnostics
                        .push(DependencyError::CyclicDependency(cycle.clone()));
                    report.pruned_cycles.push(cycle);
                }
            }
        };
        report.diagnostics.extend(diagnostics);

        compute_dependents(registry);
        let order = load_order(registry);
        report.load_order = order
            .iter()
            .filter_map(|idx| registry.get(*idx).map(|d| d.id().to_string()))
            .collect();
        registry.set_order(order);

        debug!("Resolved load order: {:?}", report.load_order);
        report
    }

    /// One full traversal of every root. Returns the first cycle found.
    fn traverse(&mut self, registry: &mut Registry) -> Result<Vec<DependencyError>, Vec<String>> {
        let mut state: HashMap<DescriptorIdx, VisitState> = HashMap::new();
        let mut diagnostics = Vec::new();

        let mut roots: Vec<DescriptorIdx> = registry.order().to_vec();
        roots.sort();

        for root in roots {
            if state.contains_key(&root) {
                continue;
            }
            self.pass += 1;
            let pass = self.pass;
            state.insert(root, VisitState::InProgress(pass));
            let mut stack = vec![Frame { idx: root, next_dependency: 0 }];

            while let Some(frame) = stack.last_mut() {
                let idx = frame.idx;
                let next = frame.next_dependency;
                let dependency = registry
                    .get(idx)
                    .and_then(|d| d.dependency_names().get(next).cloned());

                let Some(name) = dependency else {
                    state.insert(idx, VisitState::Done);
                    stack.pop();
                    if let Some(parent) = stack.last() {
                        merge_child(registry, parent.idx, idx);
                    }
                    continue;
                };
                frame.next_dependency += 1;

                let Some(child) = registry.index_of(&name) else {
                    if let Some(descriptor) = registry.get_mut(idx) {
                        descriptor.can_load = false;
                        warn!(
                            "Plugin '{}' depends on '{}' which is not registered, it can't be loaded",
                            descriptor.id(),
                            name
                        );
                        diagnostics.push(DependencyError::MissingPlugin {
                            plugin_id: descriptor.id().to_string(),
                            missing: name,
                        });
                    }
                    continue;
                };

                match state.get(&child) {
                    Some(VisitState::InProgress(child_pass)) => {
                        debug!("Cycle closed at {child} during traversal pass {child_pass}");
                        let start = stack.iter().position(|f| f.idx == child).unwrap_or(0);
                        let cycle = stack[start..]
                            .iter()
                            .filter_map(|f| registry.get(f.idx).map(|d| d.id().to_string()))
                            .collect();
                        return Err(cycle);
                    }
                    Some(VisitState::Done) => merge_child(registry, idx, child),
                    None => {
                        state.insert(child, VisitState::InProgress(pass));
                        stack.push(Frame { idx: child, next_dependency: 0 });
                    }
                }
            }
        }

        Ok(diagnostics)
    }
}

/// Fold a resolved child into its parent: dense dependencies and can-load flag.
fn merge_child(registry: &mut Registry, parent: DescriptorIdx, child: DescriptorIdx) {
    let Some((mut inherited, child_can_load)) = registry
        .get(child)
        .map(|c| (c.dependencies.clone(), c.can_load))
    else {
        return;
    };
    inherited.insert(child);
    if let Some(descriptor) = registry.get_mut(parent) {
        descriptor.dependencies.append(&mut inherited);
        if !child_can_load && descriptor.can_load {
            debug!(
                "Plugin '{}' can't load because dependency {child} can't load",
                descriptor.id()
            );
            descriptor.can_load = false;
        }
    }
}

/// Fill every descriptor's dense dependent set from the dense dependency sets.
fn compute_dependents(registry: &mut Registry) {
    let edges: Vec<(DescriptorIdx, BTreeSet<DescriptorIdx>)> = registry
        .order()
        .iter()
        .filter_map(|idx| registry.get(*idx).map(|d| (*idx, d.dependencies.clone())))
        .collect();
    for (dependent, dependencies) in edges {
        for dependency in dependencies {
            if let Some(descriptor) = registry.get_mut(dependency) {
                descriptor.dependents.insert(dependent);
            }
        }
    }
}

/// Kahn's algorithm over direct edges; among ready nodes the earliest
/// registered goes first.
fn load_order(registry: &Registry) -> Vec<DescriptorIdx> {
    let mut nodes: Vec<DescriptorIdx> = registry.order().to_vec();
    nodes.sort();

    let mut in_degree: HashMap<DescriptorIdx, usize> = HashMap::new();
    let mut dependents: HashMap<DescriptorIdx, Vec<DescriptorIdx>> = HashMap::new();
    for idx in &nodes {
        let direct: BTreeSet<DescriptorIdx> = registry
            .get(*idx)
            .map(|d| {
                d.dependency_names()
                    .iter()
                    .filter_map(|name| registry.index_of(name))
                    .collect()
            })
            .unwrap_or_default();
        in_degree.insert(*idx, direct.len());
        for dependency in direct {
            dependents.entry(dependency).or_default().push(*idx);
        }
    }

    let mut ready: BTreeSet<DescriptorIdx> = nodes
        .iter()
        .filter(|idx| in_degree.get(idx).copied() == Some(0))
        .copied()
        .collect();
    let mut sorted = Vec::with_capacity(nodes.len());

    while let Some(idx) = ready.pop_first() {
        sorted.push(idx);
        for dependent in dependents.get(&idx).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(*dependent);
                }
            }
        }
    }

    if sorted.len() != nodes.len() {
        // Only reachable if a cycle escaped pruning
        warn!("Load order is incomplete, appending unsorted plugins in registration order");
        for idx in nodes {
            if !sorted.contains(&idx) {
                sorted.push(idx);
            }
        }
    }
    sorted
}
