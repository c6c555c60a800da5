//! # Plinth Event System Errors
//!
//! Defines [`EventSystemError`], covering handler bookkeeping and the shared
//! request queue used by handlers to ask for more activation work.
use thiserror::Error;

use crate::event::EventId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventSystemError {
    #[error("Failed to unregister event handler with ID {id}: {reason}")]
    HandlerUnregistrationFailed { id: EventId, reason: String },

    #[error("Attempted to operate on a poisoned event system component: {component}")]
    DispatcherPoisoned { component: String },

    #[error("Internal event system error: {0}")]
    InternalError(String),
}
