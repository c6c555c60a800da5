use crate::plugin_system::factory::PluginFactory;

/// A live plugin object produced by a [`PluginFactory`].
///
/// Instances are shared (`Arc`) between the activation engine and event
/// subscribers, so lifecycle hooks take `&self`; implementors needing state
/// changes use interior mutability.
pub trait PluginInstance: Send + Sync {
    /// Called once the instance becomes active. Returning `false` refuses
    /// activation and the plugin stays inactive.
    fn activate(&self) -> bool {
        true
    }

    /// Called before the instance is moved to the cache. Returning `false`
    /// vetoes the deactivation and the plugin stays active.
    fn deactivate(&self) -> bool {
        true
    }

    /// Plugins exporting the loader capability hand out their factory here.
    fn as_factory(&self) -> Option<&dyn PluginFactory> {
        None
    }
}
