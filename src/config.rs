//! Configuration for injector defaults.
//!
//! Values come from layered sources (environment, in-memory maps, JSON files
//! with the `config` feature) and are folded into [`InjectorOptions`].

use std::collections::HashMap;
use std::env;

use parking_lot::RwLock;
#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::{DiError, DiResult};

/// Key for [`InjectorOptions::retain_on_restart`].
pub const RETAIN_ON_RESTART: &str = "retain_on_restart";
/// Key for [`InjectorOptions::log_events`].
pub const LOG_EVENTS: &str = "log_events";

/// Defaults applied by an [`Injector`](crate::Injector).
///
/// # Examples
///
/// ```
/// use ferrous_components::{ConfigProvider, InjectorOptions, MapConfigSource};
///
/// let mut provider = ConfigProvider::new();
/// provider.add_source(Box::new(
///     MapConfigSource::new().with("retain_on_restart", "true"),
/// ));
///
/// let options = InjectorOptions::from_provider(&provider).unwrap();
/// assert!(options.retain_on_restart);
/// assert!(!options.log_events);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct InjectorOptions {
    /// Default retain-on-restart policy for new requests
    pub retain_on_restart: bool,
    /// Attach a [`LoggingObserver`](crate::LoggingObserver) to the cache
    pub log_events: bool,
}

impl InjectorOptions {
    /// Reads options from `provider`; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// [`DiError::TypeMismatch`] if a key is present but not a boolean.
    pub fn from_provider(provider: &ConfigProvider) -> DiResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            retain_on_restart: provider.get_bool_opt(RETAIN_ON_RESTART)?.unwrap_or(defaults.retain_on_restart),
            log_events: provider.get_bool_opt(LOG_EVENTS)?.unwrap_or(defaults.log_events),
        })
    }

    /// Reads options from environment variables named `{PREFIX}_{KEY}`,
    /// e.g. `APP_RETAIN_ON_RESTART=true`.
    pub fn from_env(prefix: &str) -> DiResult<Self> {
        let mut provider = ConfigProvider::new();
        provider.add_source(Box::new(EnvironmentConfigSource::with_prefix(prefix.to_string())));
        Self::from_provider(&provider)
    }
}

/// A configuration value that can be various types
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(untagged))]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl ConfigValue {
    /// Parses a raw string, trying integer, float and boolean before
    /// falling back to a string.
    pub fn parse(raw: &str) -> Self {
        if let Ok(int_val) = raw.parse::<i64>() {
            ConfigValue::Integer(int_val)
        } else if let Ok(float_val) = raw.parse::<f64>() {
            ConfigValue::Float(float_val)
        } else if let Ok(bool_val) = raw.parse::<bool>() {
            ConfigValue::Boolean(bool_val)
        } else {
            ConfigValue::String(raw.to_string())
        }
    }

    pub fn as_str(&self) -> DiResult<&str> {
        match self {
            ConfigValue::String(s) => Ok(s),
            _ => Err(DiError::TypeMismatch("Config value is not a string")),
        }
    }

    /// Booleans, plus `0`/`1` for environments that prefer numbers.
    pub fn as_bool(&self) -> DiResult<bool> {
        match self {
            ConfigValue::Boolean(b) => Ok(*b),
            ConfigValue::Integer(0) => Ok(false),
            ConfigValue::Integer(1) => Ok(true),
            _ => Err(DiError::TypeMismatch("Config value is not a boolean")),
        }
    }
}

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    /// Get a configuration value by key
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// List all available keys
    fn keys(&self) -> Vec<String>;
}

/// Environment variable configuration source
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    /// Prefix to filter environment variables
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: String) -> Self {
        Self { prefix: Some(prefix) }
    }

    fn env_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        env::var(self.env_key(key)).ok().map(|value| ConfigValue::parse(&value))
    }

    fn keys(&self) -> Vec<String> {
        env::vars()
            .filter_map(|(key, _)| match &self.prefix {
                Some(prefix) => {
                    let prefix_upper = format!("{}_", prefix.to_uppercase());
                    key.strip_prefix(&prefix_upper).map(str::to_lowercase)
                }
                None => Some(key.to_lowercase()),
            })
            .collect()
    }
}

/// In-memory configuration source, handy for tests and embedded defaults.
#[derive(Debug, Default, Clone)]
pub struct MapConfigSource {
    values: HashMap<String, ConfigValue>,
}

impl MapConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `key`, parsing `raw` like an environment value.
    pub fn with(mut self, key: impl Into<String>, raw: &str) -> Self {
        self.values.insert(key.into(), ConfigValue::parse(raw));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ConfigValue) {
        self.values.insert(key.into(), value);
    }
}

impl ConfigSource for MapConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// JSON file configuration source
#[cfg(feature = "config")]
#[derive(Debug)]
pub struct JsonConfigSource {
    /// File path to JSON configuration
    file_path: std::path::PathBuf,
    /// Cached parsed configuration
    config: RwLock<Option<HashMap<String, ConfigValue>>>,
}

#[cfg(feature = "config")]
impl JsonConfigSource {
    pub fn new(file_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            config: RwLock::new(None),
        }
    }

    /// Reload configuration from file
    pub fn reload(&self) -> DiResult<()> {
        let content = std::fs::read_to_string(&self.file_path)
            .map_err(|_| DiError::NotFound("Configuration file not found"))?;

        let parsed: HashMap<String, ConfigValue> = serde_json::from_str(&content)
            .map_err(|_| DiError::TypeMismatch("Invalid JSON configuration"))?;

        *self.config.write() = Some(parsed);
        Ok(())
    }
}

#[cfg(feature = "config")]
impl ConfigSource for JsonConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        if self.config.read().is_none() {
            if let Err(err) = self.reload() {
                tracing::warn!(path = %self.file_path.display(), %err, "failed to load configuration");
                return None;
            }
        }
        self.config.read().as_ref()?.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.config
            .read()
            .as_ref()
            .map(|cfg| cfg.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Configuration provider checking sources in priority order
#[derive(Debug, Default)]
pub struct ConfigProvider {
    /// Configuration sources in priority order
    sources: Vec<Box<dyn ConfigSource>>,
    /// Cached configuration values
    cache: RwLock<HashMap<String, ConfigValue>>,
}

impl ConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configuration source (higher priority sources should be added first)
    pub fn add_source(&mut self, source: Box<dyn ConfigSource>) {
        self.sources.push(source);
    }

    /// Get a configuration value, checking sources in priority order
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        if let Some(value) = self.cache.read().get(key) {
            return Some(value.clone());
        }

        let value = self.sources.iter().find_map(|source| source.get(key))?;
        self.cache.write().insert(key.to_string(), value.clone());
        Some(value)
    }

    /// Get a boolean configuration value
    pub fn get_bool(&self, key: &str) -> DiResult<bool> {
        self.get(key)
            .ok_or(DiError::NotFound("Configuration key not found"))?
            .as_bool()
    }

    /// Get a boolean configuration value, `None` if no source has the key
    pub fn get_bool_opt(&self, key: &str) -> DiResult<Option<bool>> {
        self.get(key).map(|value| value.as_bool()).transpose()
    }

    /// Get a boolean configuration value with default
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    /// Clear the configuration cache (forces reload from sources)
    pub fn invalidate_cache(&self) {
        self.cache.write().clear();
    }

    /// Get all configuration keys from all sources
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sources.iter().flat_map(|source| source.keys()).collect();
        keys.sort();
        keys.dedup();
        keys
    }
}
