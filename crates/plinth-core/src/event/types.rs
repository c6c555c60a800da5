use std::fmt;
use std::sync::Arc;

use crate::plugin_system::descriptor::Descriptor;
use crate::plugin_system::traits::PluginInstance;

/// Event names used for handler registration
pub const PLUGIN_ACTIVATED: &str = "plugin-activated";
pub const PLUGIN_DEACTIVATED: &str = "plugin-deactivated";
pub const PROFILE_SCOPED: &str = "profile-scoped";
pub const PROFILE_DESCOPED: &str = "profile-descoped";

/// Notification emitted synchronously, in cascade order
#[derive(Clone)]
pub enum PluginEvent<'a> {
    Activated {
        descriptor: &'a Descriptor,
        instance: &'a Arc<dyn PluginInstance>,
    },
    Deactivated {
        descriptor: &'a Descriptor,
        instance: &'a Arc<dyn PluginInstance>,
    },
    /// A profile finished loading
    ProfileScoped { profile: &'a str },
    /// A profile was unloaded
    ProfileDescoped { profile: &'a str },
}

impl PluginEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            PluginEvent::Activated { .. } => PLUGIN_ACTIVATED,
            PluginEvent::Deactivated { .. } => PLUGIN_DEACTIVATED,
            PluginEvent::ProfileScoped { .. } => PROFILE_SCOPED,
            PluginEvent::ProfileDescoped { .. } => PROFILE_DESCOPED,
        }
    }

    /// Id of the plugin the event is about
    pub fn plugin_id(&self) -> Option<&str> {
        match self {
            PluginEvent::Activated { descriptor, .. } | PluginEvent::Deactivated { descriptor, .. } => {
                Some(descriptor.id())
            }
            _ => None,
        }
    }
}

impl fmt::Debug for PluginEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginEvent::Activated { descriptor, .. } | PluginEvent::Deactivated { descriptor, .. } => f
                .debug_struct(self.name())
                .field("plugin", &descriptor.id())
                .finish_non_exhaustive(),
            PluginEvent::ProfileScoped { profile } | PluginEvent::ProfileDescoped { profile } => f
                .debug_struct(self.name())
                .field("profile", profile)
                .finish(),
        }
    }
}

/// Activation work requested from inside an event handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeRequest {
    Activate(String),
    Deactivate(String),
}
