//! # Plinth Event System
//!
//! Synchronous notifications emitted by the plugin manager and the profile
//! reconciler.
//!
//! ## Key Components
//!
//! - **[`PluginEvent`]**: activation, deactivation and profile scope
//!   notifications. Events borrow the descriptor and instance they describe.
//! - **[`EventDispatcher`]** (`dispatcher` submodule): ordered observer list.
//!   Handlers run in registration order on the caller's thread, in the same
//!   order as the cascade that produced the events.
//! - **[`RequestQueue`]**: cloneable FIFO through which handlers ask for
//!   further activations or deactivations, processed after the running
//!   cascade completes.
//! - **[`EventSystemError`]** (`error` submodule): errors of this subsystem.
pub mod dispatcher;
pub mod error;
pub mod types;

pub use dispatcher::{EventDispatcher, RequestQueue};
pub use error::EventSystemError;
pub use types::{
    CascadeRequest, PLUGIN_ACTIVATED, PLUGIN_DEACTIVATED, PROFILE_DESCOPED, PROFILE_SCOPED,
    PluginEvent,
};

/// Unique identifier for registered event handlers
pub type EventId = u64;

/// Event handler callback
pub type EventHandler = Box<dyn Fn(&PluginEvent<'_>) + Send + Sync>;
