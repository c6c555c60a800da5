use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};

use log::trace;

use crate::event::{CascadeRequest, EventHandler, EventId, EventSystemError, PluginEvent};

//--------------------------------------------------
// EventDispatcher
//--------------------------------------------------

/// Ordered observer list.
///
/// Handlers run synchronously in registration order: handlers registered
/// for every event first, then handlers registered for the event's name.
pub struct EventDispatcher {
    global_handlers: Vec<(EventId, EventHandler)>,
    handlers: HashMap<&'static str, Vec<(EventId, EventHandler)>>,
    next_handler_id: EventId,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_handler_count: usize = self.handlers.values().map(|v| v.len()).sum();
        f.debug_struct("EventDispatcher")
            .field("global_handlers_count", &self.global_handlers.len())
            .field("name_handlers_count", &name_handler_count)
            .field("next_handler_id", &self.next_handler_id)
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            global_handlers: Vec::new(),
            handlers: HashMap::new(),
            next_handler_id: 1,
        }
    }

    /// Subscribe to events with the given name (see [`PluginEvent::name`])
    pub fn register_handler(&mut self, event_name: &'static str, handler: EventHandler) -> EventId {
        let id = self.next_id();
        self.handlers.entry(event_name).or_default().push((id, handler));
        id
    }

    /// Subscribe to every event
    pub fn register_global_handler(&mut self, handler: EventHandler) -> EventId {
        let id = self.next_id();
        self.global_handlers.push((id, handler));
        id
    }

    pub fn unregister_handler(&mut self, id: EventId) -> bool {
        let len_before = self.global_handlers.len();
        self.global_handlers.retain(|(h_id, _)| *h_id != id);
        let mut found = self.global_handlers.len() < len_before;
        for handlers in self.handlers.values_mut() {
            let len_before = handlers.len();
            handlers.retain(|(h_id, _)| *h_id != id);
            if handlers.len() < len_before {
                found = true;
            }
        }
        found
    }

    /// Deliver an event to every matching handler, returning how many ran
    pub fn dispatch(&self, event: &PluginEvent<'_>) -> usize {
        trace!("Dispatching {event:?}");
        let named = self.handlers.get(event.name()).into_iter().flatten();
        let mut count = 0;
        for (_, handler) in self.global_handlers.iter().chain(named) {
            handler(event);
            count += 1;
        }
        count
    }

    pub fn handler_count(&self) -> usize {
        self.global_handlers.len() + self.handlers.values().map(Vec::len).sum::<usize>()
    }

    fn next_id(&mut self) -> EventId {
        let id = self.next_handler_id;
        self.next_handler_id += 1;
        id
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

//--------------------------------------------------
// RequestQueue
//--------------------------------------------------

/// Shared FIFO of activation work requested from event handlers.
///
/// Handlers cannot call back into the plugin manager while a cascade is
/// running; they push requests here and the manager drains the queue once
/// the outermost cascade has returned.
#[derive(Clone, Default)]
pub struct RequestQueue {
    queue: Arc<Mutex<VecDeque<CascadeRequest>>>,
}

impl fmt::Debug for RequestQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestQueue").finish_non_exhaustive()
    }
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, request: CascadeRequest) -> Result<(), EventSystemError> {
        self.queue
            .lock()
            .map_err(|_| EventSystemError::DispatcherPoisoned {
                component: "request_queue".to_string(),
            })?
            .push_back(request);
        Ok(())
    }

    pub fn activate(&self, id: &str) -> Result<(), EventSystemError> {
        self.push(CascadeRequest::Activate(id.to_string()))
    }

    pub fn deactivate(&self, id: &str) -> Result<(), EventSystemError> {
        self.push(CascadeRequest::Deactivate(id.to_string()))
    }

    pub fn pop(&self) -> Result<Option<CascadeRequest>, EventSystemError> {
        Ok(self
            .queue
            .lock()
            .map_err(|_| EventSystemError::DispatcherPoisoned {
                component: "request_queue".to_string(),
            })?
            .pop_front())
    }

    pub fn len(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
