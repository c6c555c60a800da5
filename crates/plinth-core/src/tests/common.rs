#![cfg(test)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::event::PluginEvent;
use crate::plugin_system::descriptor::Descriptor;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::factory::{FactoryRegistry, PluginFactory, PluginHost};
use crate::plugin_system::manager::PluginManager;
use crate::plugin_system::registry::Registry;
use crate::plugin_system::selection::{Disambiguator, FirstCandidate, Selection};
use crate::plugin_system::traits::PluginInstance;

// ===== JOURNAL =====

/// Shared, ordered record of what happened during a test
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Entries starting with `prefix`, prefix stripped
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .iter()
            .filter_map(|e| e.strip_prefix(prefix).map(str::to_string))
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

// ===== MOCK PLUGINS =====

/// Instance that records its lifecycle hooks
pub struct RecordingInstance {
    id: String,
    journal: Journal,
    refuse_activation: bool,
    veto: Arc<AtomicBool>,
}

impl PluginInstance for RecordingInstance {
    fn activate(&self) -> bool {
        self.journal.push(format!("activate:{}", self.id));
        !self.refuse_activation
    }

    fn deactivate(&self) -> bool {
        self.journal.push(format!("deactivate:{}", self.id));
        !self.veto.load(Ordering::SeqCst)
    }
}

/// Factory producing [`RecordingInstance`]s, with per-id failure switches
#[derive(Clone, Default)]
pub struct RecordingFactory {
    pub journal: Journal,
    broken: Arc<Mutex<HashSet<String>>>,
    refusing: Arc<Mutex<HashSet<String>>>,
    vetoes: Arc<Mutex<HashMap<String, Arc<AtomicBool>>>>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_instantiation(&self, id: &str) {
        self.broken.lock().unwrap().insert(id.to_string());
    }

    pub fn refuse_activation(&self, id: &str) {
        self.refusing.lock().unwrap().insert(id.to_string());
    }

    /// Toggle the deactivate veto; applies to existing instances too
    pub fn veto_deactivation(&self, id: &str, veto: bool) {
        self.veto_flag(id).store(veto, Ordering::SeqCst);
    }

    /// How many instances were created for `id`
    pub fn instantiated(&self, id: &str) -> usize {
        self.journal
            .with_prefix("new:")
            .iter()
            .filter(|created| *created == id)
            .count()
    }

    fn veto_flag(&self, id: &str) -> Arc<AtomicBool> {
        self.vetoes
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .clone()
    }
}

impl PluginFactory for RecordingFactory {
    fn instantiate(
        &self,
        descriptor: &Descriptor,
        _host: &PluginHost,
    ) -> Result<Arc<dyn PluginInstance>, PluginSystemError> {
        let id = descriptor.id().to_string();
        if self.broken.lock().unwrap().contains(&id) {
            return Err(PluginSystemError::InstantiationFailed {
                plugin_id: id,
                message: "broken on purpose".to_string(),
            });
        }
        self.journal.push(format!("new:{id}"));
        Ok(Arc::new(RecordingInstance {
            refuse_activation: self.refusing.lock().unwrap().contains(&id),
            veto: self.veto_flag(&id),
            journal: self.journal.clone(),
            id,
        }))
    }
}

// ===== DISAMBIGUATION =====

/// Answers prompts from a script and counts them; declines once the script is exhausted
pub struct ScriptedDisambiguator {
    answers: VecDeque<Selection>,
    prompts: Arc<AtomicUsize>,
    candidates: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedDisambiguator {
    pub fn new(answers: Vec<Selection>) -> Self {
        Self {
            answers: answers.into(),
            prompts: Arc::new(AtomicUsize::new(0)),
            candidates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn prompts(&self) -> Arc<AtomicUsize> {
        self.prompts.clone()
    }

    /// Candidate ids of every prompt, in prompt order
    pub fn seen(&self) -> Arc<Mutex<Vec<Vec<String>>>> {
        self.candidates.clone()
    }
}

impl Disambiguator for ScriptedDisambiguator {
    fn select_one(&mut self, _title: &str, _description: &str, candidates: &[&Descriptor]) -> Selection {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.candidates
            .lock()
            .unwrap()
            .push(candidates.iter().map(|d| d.id().to_string()).collect());
        self.answers.pop_front().unwrap_or_default()
    }
}

// ===== HARNESS =====

/// Registered and resolved registry
pub fn resolved_registry(descriptors: Vec<Descriptor>) -> Registry {
    let mut registry = Registry::new();
    registry.register_all(descriptors);
    registry.resolve();
    registry
}

/// Descriptor exporting capabilities and depending on other ids
pub fn plugin(id: &str, capabilities: &[&str], dependencies: &[&str]) -> Descriptor {
    Descriptor::new(id)
        .with_capabilities(capabilities)
        .with_dependencies(dependencies)
}

pub fn manager_with(
    descriptors: Vec<Descriptor>,
    disambiguator: Box<dyn Disambiguator>,
) -> (PluginManager, RecordingFactory) {
    let factory = RecordingFactory::new();
    let factories = FactoryRegistry::new(Arc::new(factory.clone()));
    let manager = PluginManager::new(resolved_registry(descriptors), factories, disambiguator);
    (manager, factory)
}

/// Manager whose disambiguator picks the first candidate
pub fn manager_of(descriptors: Vec<Descriptor>) -> (PluginManager, RecordingFactory) {
    manager_with(descriptors, Box::new(FirstCandidate))
}

/// Record every plugin event as `<event-name>:<plugin or profile>`
pub fn record_events(manager: &mut PluginManager) -> Journal {
    let journal = Journal::default();
    let sink = journal.clone();
    manager.subscribe_all(Box::new(move |event| {
        let subject = match event {
            PluginEvent::ProfileScoped { profile } | PluginEvent::ProfileDescoped { profile } => {
                profile.to_string()
            }
            other => other.plugin_id().unwrap_or_default().to_string(),
        };
        sink.push(format!("{}:{subject}", event.name()));
    }));
    journal
}
