use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{LazyLock, OnceLock};
use tracing::{info, warn};
use unic_langid::LanguageIdentifier;

/// English messages compiled into the binary
const EN_MESSAGES: &str = include_str!("../locales/en/main.ftl");

/// Localization manager for the Lyrics Bot
pub struct LocalizationManager {
    bundle: FluentBundle<FluentResource>,
}

impl LocalizationManager {
    /// Create a localization manager from the built-in English messages
    pub fn new() -> Result<Self> {
        Self::from_source(EN_MESSAGES)
    }

    /// Create a localization manager from raw Fluent source
    pub fn from_source(source: &str) -> Result<Self> {
        let locale: LanguageIdentifier = "en".parse()?;
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("Invalid Fluent resource: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Conflicting Fluent messages: {errors:?}"))?;

        Ok(Self { bundle })
    }

    /// Load a `main.ftl` override from a locale directory (e.g. `./locales/en`)
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let content = fs::read_to_string(dir.join("main.ftl"))?;
        Self::from_source(&content)
    }

    /// Get a localized message
    pub fn get_message(&self, key: &str, args: Option<&HashMap<&str, &str>>) -> String {
        let msg = match self.bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {}", key),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {}", key),
        };

        let fluent_args = args.map(|args| {
            FluentArgs::from_iter(
                args.iter()
                    .map(|(k, v)| (*k, FluentValue::from(v.to_string()))),
            )
        });

        let mut errors = vec![];
        let value = self
            .bundle
            .format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            warn!(key = %key, errors = ?errors, "Fluent formatting reported errors");
        }
        value.into_owned()
    }

    /// Get a localized message with simple string arguments
    pub fn get_message_with_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
        self.get_message(key, Some(&args_map))
    }

    /// Whether a message key exists
    pub fn has_message(&self, key: &str) -> bool {
        self.bundle.has_message(key)
    }
}

/// Messages loaded from `LOCALES_DIR` at startup, when configured
static LOADED_MANAGER: OnceLock<LocalizationManager> = OnceLock::new();

/// Built-in messages, used when nothing was loaded from disk
static BUILTIN_MANAGER: LazyLock<Result<LocalizationManager, String>> =
    LazyLock::new(|| LocalizationManager::new().map_err(|e| e.to_string()));

/// Initialize the global localization manager, surfacing resource errors early.
/// With a directory, its `main.ftl` replaces the built-in messages.
pub fn init_localization(dir: Option<&Path>) -> Result<()> {
    let Some(dir) = dir else {
        return get_localization_manager().map(|_| ());
    };

    let manager = LocalizationManager::from_dir(dir)
        .map_err(|e| anyhow!("Failed to load messages from {}: {e}", dir.display()))?;
    if LOADED_MANAGER.set(manager).is_err() {
        warn!("Localization already initialized, keeping the first messages");
    } else {
        info!(dir = %dir.display(), "Loaded messages from locale directory");
    }
    Ok(())
}

/// Get the global localization manager
pub fn get_localization_manager() -> Result<&'static LocalizationManager> {
    if let Some(manager) = LOADED_MANAGER.get() {
        return Ok(manager);
    }
    BUILTIN_MANAGER
        .as_ref()
        .map_err(|e| anyhow!("Localization unavailable: {e}"))
}

/// Convenience function to get a localized message
pub fn t(key: &str) -> String {
    t_args(key, &[])
}

/// Convenience function to get a localized message with arguments
pub fn t_args(key: &str, args: &[(&str, &str)]) -> String {
    match get_localization_manager() {
        Ok(manager) => manager.get_message_with_args(key, args),
        Err(_) => key.to_string(),
    }
}
