//! Application configuration service.
//!
//! [`Config`] is an ordinary injectable value: register it with a
//! [`ValueProvider`](crate::ValueProvider) and resolve it where needed.
//! Values are looked up in explicit overrides first, then in each
//! [`ConfigSource`] in the order the sources were added.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

/// Environment variable selecting the [`Mode`].
pub const MODE_VARIABLE: &str = "APP_ENV";

/// Configuration key holding the log level.
pub const LOG_LEVEL_KEY: &str = "logger.level";

/// Deployment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Development,
    Production,
    Test,
}

impl Mode {
    /// Reads [`MODE_VARIABLE`]; unset or unknown values mean development.
    pub fn from_env() -> Self {
        env::var(MODE_VARIABLE)
            .ok()
            .and_then(|value| Self::parse(&value))
            .unwrap_or_default()
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "development" => Some(Mode::Development),
            "production" => Some(Mode::Production),
            "test" => Some(Mode::Test),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
            Mode::Test => "test",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configuration value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(untagged))]
pub enum ConfigValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<ConfigValue>),
    Object(HashMap<String, ConfigValue>),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Follows a dotted `path` through nested objects.
    pub fn lookup(&self, path: &str) -> Option<&ConfigValue> {
        path.split('.').try_fold(self, |value, segment| match value {
            ConfigValue::Object(entries) => entries.get(segment),
            _ => None,
        })
    }

    /// Parses an environment-style string, trying integer, float and boolean
    /// before falling back to a string.
    pub fn parse(raw: &str) -> Self {
        if let Ok(value) = raw.parse::<i64>() {
            ConfigValue::Integer(value)
        } else if let Ok(value) = raw.parse::<f64>() {
            ConfigValue::Float(value)
        } else if let Ok(value) = raw.parse::<bool>() {
            ConfigValue::Boolean(value)
        } else {
            ConfigValue::String(raw.to_string())
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Integer(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Boolean(value)
    }
}

/// A read-only source of configuration values.
pub trait ConfigSource: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Option<ConfigValue>;

    fn keys(&self) -> Vec<String>;
}

/// Reads values from environment variables.
///
/// Key `database.url` maps to variable `DATABASE_URL`, or `MYAPP_DATABASE_URL`
/// with prefix `myapp`.
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn variable(&self, key: &str) -> String {
        let key = key.replace('.', "_").to_uppercase();
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key),
            None => key,
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        env::var(self.variable(key)).ok().map(|raw| ConfigValue::parse(&raw))
    }

    fn keys(&self) -> Vec<String> {
        let prefix = self.prefix.as_ref().map(|prefix| format!("{}_", prefix.to_uppercase()));
        env::vars()
            .filter_map(|(name, _)| match &prefix {
                Some(prefix) => name.strip_prefix(prefix.as_str()).map(str::to_lowercase),
                None => Some(name.to_lowercase()),
            })
            .collect()
    }
}

/// Reads values from a JSON document.
///
/// Keys are looked up verbatim first, then as dotted paths through nested
/// objects.
#[cfg(feature = "config")]
#[derive(Debug)]
pub struct JsonConfigSource {
    root: ConfigValue,
}

#[cfg(feature = "config")]
impl JsonConfigSource {
    pub fn from_file(path: impl AsRef<std::path::Path>) -> DiResult<Self> {
        let content = std::fs::read_to_string(path).map_err(DiError::other)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> DiResult<Self> {
        let root: ConfigValue = serde_json::from_str(content).map_err(DiError::other)?;
        match root {
            ConfigValue::Object(_) => Ok(Self { root }),
            _ => Err(DiError::type_mismatch("json", "configuration root must be an object")),
        }
    }
}

#[cfg(feature = "config")]
impl ConfigSource for JsonConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        match &self.root {
            ConfigValue::Object(entries) => entries.get(key).or_else(|| self.root.lookup(key)).cloned(),
            _ => None,
        }
    }

    fn keys(&self) -> Vec<String> {
        match &self.root {
            ConfigValue::Object(entries) => entries.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }
}

type ChangeListener = Arc<dyn Fn(&str, &ConfigValue) + Send + Sync>;

/// Configuration service.
///
/// ```rust
/// use ferrous_ioc::config::{Config, ConfigValue};
///
/// let config = Config::new();
/// config.set("logger.level", "debug");
/// config.update([("http.port", ConfigValue::from(8080))]);
///
/// assert_eq!(config.get_i64("http.port").unwrap(), 8080);
/// assert_eq!(config.log_level(), tracing::Level::DEBUG);
/// assert_eq!(config.get_or("http.host", "localhost"), ConfigValue::from("localhost"));
/// ```
pub struct Config {
    mode: Mode,
    overrides: RwLock<HashMap<String, ConfigValue>>,
    sources: Vec<Box<dyn ConfigSource>>,
    listeners: RwLock<Vec<ChangeListener>>,
}

impl Config {
    /// Empty configuration in the mode selected by the environment.
    pub fn new() -> Self {
        Self {
            mode: Mode::from_env(),
            overrides: RwLock::new(HashMap::new()),
            sources: Vec::new(),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.add_source(Box::new(source));
        self
    }

    /// Adds a source consulted after every source added before it.
    pub fn add_source(&mut self, source: Box<dyn ConfigSource>) {
        self.sources.push(source);
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        if let Some(value) = self.overrides.read().get(key) {
            return Some(value.clone());
        }
        self.sources.iter().find_map(|source| source.get(key))
    }

    pub fn get_or(&self, key: &str, default: impl Into<ConfigValue>) -> ConfigValue {
        self.get(key).unwrap_or_else(|| default.into())
    }

    fn require(&self, key: &str) -> DiResult<ConfigValue> {
        self.get(key)
            .ok_or_else(|| DiError::type_mismatch(key, "configuration value is not set"))
    }

    pub fn get_string(&self, key: &str) -> DiResult<String> {
        match self.require(key)? {
            ConfigValue::String(value) => Ok(value),
            _ => Err(DiError::type_mismatch(key, "configuration value is not a string")),
        }
    }

    pub fn get_i64(&self, key: &str) -> DiResult<i64> {
        self.require(key)?
            .as_i64()
            .ok_or_else(|| DiError::type_mismatch(key, "configuration value is not an integer"))
    }

    pub fn get_bool(&self, key: &str) -> DiResult<bool> {
        self.require(key)?
            .as_bool()
            .ok_or_else(|| DiError::type_mismatch(key, "configuration value is not a boolean"))
    }

    /// Reads a millisecond count as a [`Duration`].
    pub fn get_duration_ms(&self, key: &str) -> DiResult<Duration> {
        let millis = self.get_i64(key)?;
        u64::try_from(millis)
            .map(Duration::from_millis)
            .map_err(|_| DiError::type_mismatch(key, "duration cannot be negative"))
    }

    /// Sets an override and notifies listeners.
    pub fn set(&self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        let key = key.into();
        let value = value.into();
        self.overrides.write().insert(key.clone(), value.clone());
        self.notify(&key, &value);
    }

    /// Sets several overrides at once.
    pub fn update<I, K, V>(&self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ConfigValue>,
    {
        for (key, value) in values {
            self.set(key, value);
        }
    }

    pub fn get_env(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    pub fn get_env_or(&self, key: &str, default: &str) -> String {
        self.get_env(key).unwrap_or_else(|| default.to_string())
    }

    pub fn set_env(&self, key: &str, value: &str) {
        env::set_var(key, value);
    }

    /// Every key known to the overrides and the sources, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.overrides.read().keys().cloned().collect();
        for source in &self.sources {
            keys.extend(source.keys());
        }
        keys.sort();
        keys.dedup();
        keys
    }

    /// Calls `listener` with every key set from now on.
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(&str, &ConfigValue) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    fn notify(&self, key: &str, value: &ConfigValue) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener(key, value);
        }
    }

    /// Log level from [`LOG_LEVEL_KEY`], defaulting to `INFO`.
    pub fn log_level(&self) -> tracing::Level {
        self.get(LOG_LEVEL_KEY)
            .and_then(|value| value.as_str().and_then(|level| level.parse().ok()))
            .unwrap_or(tracing::Level::INFO)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("mode", &self.mode)
            .field("overrides", &*self.overrides.read())
            .field("sources", &self.sources)
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct MockSource;

    impl ConfigSource for MockSource {
        fn get(&self, key: &str) -> Option<ConfigValue> {
            match key {
                "name" => Some(ConfigValue::from("mock")),
                "timeout" => Some(ConfigValue::Integer(1500)),
                _ => None,
            }
        }

        fn keys(&self) -> Vec<String> {
            vec!["name".to_string(), "timeout".to_string()]
        }
    }

    #[test]
    #[serial]
    fn mode_follows_app_env() {
        env::set_var(MODE_VARIABLE, "production");
        assert_eq!(Mode::from_env(), Mode::Production);
        env::set_var(MODE_VARIABLE, "staging");
        assert_eq!(Mode::from_env(), Mode::Development);
        env::remove_var(MODE_VARIABLE);
        assert_eq!(Config::new().mode(), Mode::Development);
    }

    #[test]
    #[serial]
    fn environment_source_with_prefix() {
        env::set_var("IOCTEST_DATABASE_URL", "postgres://localhost");
        env::set_var("IOCTEST_POOL", "8");

        let source = EnvironmentConfigSource::with_prefix("ioctest");
        assert_eq!(source.get("database.url"), Some(ConfigValue::from("postgres://localhost")));
        assert_eq!(source.get("pool"), Some(ConfigValue::Integer(8)));
        assert!(source.keys().contains(&"pool".to_string()));

        env::remove_var("IOCTEST_DATABASE_URL");
        env::remove_var("IOCTEST_POOL");
    }

    #[test]
    fn overrides_shadow_sources() {
        let config = Config::new().with_source(MockSource);
        assert_eq!(config.get_string("name").unwrap(), "mock");
        assert_eq!(config.get_duration_ms("timeout").unwrap(), Duration::from_millis(1500));

        config.set("name", "override");
        assert_eq!(config.get_string("name").unwrap(), "override");
        assert_eq!(config.keys(), ["name", "timeout"]);
    }

    #[test]
    fn typed_getters_report_mismatches() {
        let config = Config::new();
        config.update([("flag", ConfigValue::Boolean(true)), ("count", ConfigValue::Integer(-1))]);

        assert!(config.get_bool("flag").unwrap());
        assert!(config.get_i64("flag").is_err());
        assert!(config.get_duration_ms("count").is_err());
        assert!(config.get_string("missing").is_err());
    }

    #[test]
    fn listeners_see_every_set() {
        let config = Config::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        config.add_listener(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        config.set("a", 1i64);
        config.update([("b", 2i64), ("c", 3i64)]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn log_level_defaults_to_info() {
        let config = Config::new();
        assert_eq!(config.log_level(), tracing::Level::INFO);
        config.set(LOG_LEVEL_KEY, "warn");
        assert_eq!(config.log_level(), tracing::Level::WARN);
        config.set(LOG_LEVEL_KEY, "loud");
        assert_eq!(config.log_level(), tracing::Level::INFO);
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_source_reads_nested_keys() {
        let source = JsonConfigSource::parse(r#"{"logger": {"level": "trace"}, "port": 80}"#).unwrap();
        let config = Config::new().with_source(source);
        assert_eq!(config.log_level(), tracing::Level::TRACE);
        assert_eq!(config.get_i64("port").unwrap(), 80);
        assert!(JsonConfigSource::parse("[1, 2]").is_err());
    }
}
