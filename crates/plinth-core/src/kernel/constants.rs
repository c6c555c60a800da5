/// Application name
pub const APP_NAME: &str = "plinth";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Attribute section holding a descriptor's identity data
pub const IDENTITY_SECTION: &str = "identity";

/// Identity key carrying the unique descriptor id
pub const LOCATION_KEY: &str = "Location";

/// Identity key carrying the display name
pub const NAME_KEY: &str = "Name";

/// Identity key carrying the human readable description
pub const DESCRIPTION_KEY: &str = "Description";

/// Identity key carrying the icon path
pub const ICON_KEY: &str = "Icon";

/// Identity key carrying the implementation language tag
pub const LANGUAGE_KEY: &str = "Language";

/// Identity key listing exported capabilities (comma separated)
pub const INTERFACES_KEY: &str = "Interfaces";

/// Identity key listing dependency ids (comma separated)
pub const DEPENDENCIES_KEY: &str = "Dependencies";

/// Identity key telling whether the user may toggle the plugin
pub const USER_ACTIVATABLE_KEY: &str = "UserActivatable";

/// Capability exported by plugins able to instantiate other plugins
pub const LOADER_CAPABILITY: &str = "IPluginLoader";

/// Section of a loader plugin describing what it can load
pub const LOADER_SECTION: &str = "Plugin Loader";

/// Loader key listing supported languages (comma separated)
pub const SUPPORTED_LANGUAGE_KEY: &str = "SupportedLanguage";

/// Language tags handled by the built-in native factory
pub const NATIVE_LANGUAGES: &[&str] = &["native", "c"];

/// Url reported for mandatory requirements that do not declare one
pub const DEFAULT_PLUGIN_URL: &str = "https://plinth.invalid/plugins/";

/// Suffix identifying descriptor manifest files
pub const MANIFEST_SUFFIX: &str = ".plugin";
