//! # Plinth Plugin Factories
//!
//! Instantiation is delegated to [`PluginFactory`] implementations keyed by
//! implementation language. The [`FactoryRegistry`] is handed to the plugin
//! manager at construction: it holds the built-in native factory, optional
//! factories registered up front for other languages, and the settings used
//! to discover loader plugins at activation time.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::kernel::constants::{APP_NAME, LOADER_CAPABILITY, NATIVE_LANGUAGES};
use crate::plugin_system::descriptor::Descriptor;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::traits::PluginInstance;

/// Environment handed to factories when instantiating a plugin
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginHost {
    app_name: String,
    settings: BTreeMap<String, String>,
}

impl PluginHost {
    pub fn new(app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            settings: BTreeMap::new(),
        }
    }

    pub fn with_setting(mut self, key: &str, value: &str) -> Self {
        self.settings.insert(key.to_string(), value.to_string());
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }
}

/// Creates plugin instances from descriptors
pub trait PluginFactory: Send + Sync {
    fn instantiate(
        &self,
        descriptor: &Descriptor,
        host: &PluginHost,
    ) -> Result<Arc<dyn PluginInstance>, PluginSystemError>;
}

/// Closures work as factories
impl<F> PluginFactory for F
where
    F: Fn(&Descriptor, &PluginHost) -> Result<Arc<dyn PluginInstance>, PluginSystemError>
        + Send
        + Sync,
{
    fn instantiate(
        &self,
        descriptor: &Descriptor,
        host: &PluginHost,
    ) -> Result<Arc<dyn PluginInstance>, PluginSystemError> {
        self(descriptor, host)
    }
}

/// Factories available to the plugin manager
pub struct FactoryRegistry {
    native: Option<Arc<dyn PluginFactory>>,
    by_language: BTreeMap<String, Arc<dyn PluginFactory>>,
    native_languages: Vec<String>,
    loader_capability: String,
    host: PluginHost,
}

impl FactoryRegistry {
    /// Registry whose native entry is `native`
    pub fn new(native: Arc<dyn PluginFactory>) -> Self {
        Self {
            native: Some(native),
            ..Self::empty()
        }
    }

    /// Registry without a native factory; every native plugin fails to instantiate
    pub fn empty() -> Self {
        Self {
            native: None,
            by_language: BTreeMap::new(),
            native_languages: NATIVE_LANGUAGES.iter().map(|l| l.to_string()).collect(),
            loader_capability: LOADER_CAPABILITY.to_string(),
            host: PluginHost::new(APP_NAME),
        }
    }

    /// Register a factory for a non-native language, bypassing loader discovery
    pub fn register_language(&mut self, language: &str, factory: Arc<dyn PluginFactory>) {
        self.by_language.insert(language.to_ascii_lowercase(), factory);
    }

    pub fn with_language(mut self, language: &str, factory: Arc<dyn PluginFactory>) -> Self {
        self.register_language(language, factory);
        self
    }

    pub fn set_native_languages<S: AsRef<str>>(&mut self, languages: &[S]) {
        self.native_languages = languages.iter().map(|l| l.as_ref().to_string()).collect();
    }

    pub fn set_loader_capability(&mut self, capability: &str) {
        self.loader_capability = capability.to_string();
    }

    pub fn set_host(&mut self, host: PluginHost) {
        self.host = host;
    }

    pub fn host(&self) -> &PluginHost {
        &self.host
    }

    pub fn loader_capability(&self) -> &str {
        &self.loader_capability
    }

    /// `None` and any configured native tag (case-insensitive) are native
    pub fn is_native(&self, language: Option<&str>) -> bool {
        match language {
            None => true,
            Some(language) => self
                .native_languages
                .iter()
                .any(|native| native.eq_ignore_ascii_case(language)),
        }
    }

    pub fn native(&self) -> Option<&Arc<dyn PluginFactory>> {
        self.native.as_ref()
    }

    pub fn for_language(&self, language: &str) -> Option<&Arc<dyn PluginFactory>> {
        self.by_language.get(&language.to_ascii_lowercase())
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("native", &self.native.is_some())
            .field("languages", &self.by_language.keys().collect::<Vec<_>>())
            .field("native_languages", &self.native_languages)
            .field("loader_capability", &self.loader_capability)
            .field("host", &self.host)
            .finish()
    }
}
