use crate::Error;
use std::{
    fmt::Debug,
    sync::{Arc, RwLock},
};
use tracing::warn;

const DEFAULT_BUFFER_LIMIT: i64 = 10;
const DEFAULT_ROLE_NAME: &str = "stellar-app";

const ENV_CONNECTION_STRING: [&str; 3] = [
    "STELLAR_AI_CONNECTION_STRING",
    "APPLICATIONINSIGHTS_CONNECTION_STRING",
    "APPINSIGHTS_CONNECTION_STRING",
];
const ENV_INSTRUMENTATION_KEY: [&str; 3] = [
    "STELLAR_AI_INSTRUMENTATION_KEY",
    "APPINSIGHTS_INSTRUMENTATIONKEY",
    "APPINSIGHTS_INSTRUMENTATION_KEY",
];
const ENV_BUFFER_LIMIT: &str = "STELLAR_AI_BUFFER_LIMIT";
const ENV_USE_QUEUE: &str = "STELLAR_AI_USE_QUEUE";
const ENV_AUTO_FLUSH: &str = "STELLAR_AI_AUTO_FLUSH";
const ENV_TRACE_PER_REQUEST: &str = "STELLAR_AI_TRACE_PER_REQUEST";
const ENV_ROLE_NAME: [&str; 2] = ["STELLAR_AI_ROLE_NAME", "APP_NAME"];

/// Telemetry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Connection string, e.g. `InstrumentationKey=...;IngestionEndpoint=...`.
    pub connection_string: String,
    /// Instrumentation key used when the connection string does not carry one.
    pub instrumentation_key: String,
    /// Number of buffered items that triggers a flush. Values below 1 are treated as 1.
    ///
    /// Default: 10
    pub buffer_limit: i64,
    /// Hand batches to an attached delivery queue instead of sending them inline.
    ///
    /// Default: false
    pub use_queue: bool,
    /// Flush at the end of every tracked HTTP request.
    ///
    /// Default: true
    pub auto_flush: bool,
    /// Emit a trace message alongside every tracked request.
    ///
    /// Default: true
    pub trace_per_request: bool,
    /// Cloud role name attached to all telemetry as `ai.cloud.role`.
    pub role_name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            instrumentation_key: String::new(),
            buffer_limit: DEFAULT_BUFFER_LIMIT,
            use_queue: false,
            auto_flush: true,
            trace_per_request: true,
            role_name: None,
        }
    }
}

impl Config {
    /// Configuration with the given connection string and defaults for everything else.
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            ..Self::default()
        }
    }

    /// Read configuration from environment variables.
    ///
    /// | Setting               | Environment variables, first one set wins                                                                |
    /// | --------------------- | -------------------------------------------------------------------------------------------------------- |
    /// | `connection_string`   | `STELLAR_AI_CONNECTION_STRING`, `APPLICATIONINSIGHTS_CONNECTION_STRING`, `APPINSIGHTS_CONNECTION_STRING` |
    /// | `instrumentation_key` | `STELLAR_AI_INSTRUMENTATION_KEY`, `APPINSIGHTS_INSTRUMENTATIONKEY`, `APPINSIGHTS_INSTRUMENTATION_KEY`     |
    /// | `buffer_limit`        | `STELLAR_AI_BUFFER_LIMIT`                                                                                |
    /// | `use_queue`           | `STELLAR_AI_USE_QUEUE`                                                                                   |
    /// | `auto_flush`          | `STELLAR_AI_AUTO_FLUSH`                                                                                  |
    /// | `trace_per_request`   | `STELLAR_AI_TRACE_PER_REQUEST`                                                                           |
    /// | `role_name`           | `STELLAR_AI_ROLE_NAME`, `APP_NAME`                                                                       |
    ///
    /// Values that fail to parse are logged and replaced by their default. Without any role name
    /// variable the role is `stellar-app`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first_of = |keys: &[&str]| keys.iter().find_map(|key| lookup(key));
        let defaults = Self::default();

        Self {
            connection_string: first_of(&ENV_CONNECTION_STRING).unwrap_or_default(),
            instrumentation_key: first_of(&ENV_INSTRUMENTATION_KEY).unwrap_or_default(),
            buffer_limit: setting(ENV_BUFFER_LIMIT, lookup(ENV_BUFFER_LIMIT), parse_int)
                .unwrap_or(defaults.buffer_limit),
            use_queue: setting(ENV_USE_QUEUE, lookup(ENV_USE_QUEUE), parse_bool)
                .unwrap_or(defaults.use_queue),
            auto_flush: setting(ENV_AUTO_FLUSH, lookup(ENV_AUTO_FLUSH), parse_bool)
                .unwrap_or(defaults.auto_flush),
            trace_per_request: setting(
                ENV_TRACE_PER_REQUEST,
                lookup(ENV_TRACE_PER_REQUEST),
                parse_bool,
            )
            .unwrap_or(defaults.trace_per_request),
            role_name: Some(
                first_of(&ENV_ROLE_NAME)
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_ROLE_NAME.to_string()),
            ),
        }
    }

    /// Set the fallback instrumentation key.
    pub fn with_instrumentation_key(mut self, instrumentation_key: impl Into<String>) -> Self {
        self.instrumentation_key = instrumentation_key.into();
        self
    }

    /// Set the buffer limit.
    pub fn with_buffer_limit(mut self, buffer_limit: i64) -> Self {
        self.buffer_limit = buffer_limit;
        self
    }

    /// Enable or disable hand-off to the delivery queue.
    pub fn with_use_queue(mut self, use_queue: bool) -> Self {
        self.use_queue = use_queue;
        self
    }

    /// Enable or disable flushing at the end of each tracked request.
    pub fn with_auto_flush(mut self, auto_flush: bool) -> Self {
        self.auto_flush = auto_flush;
        self
    }

    /// Enable or disable the per-request trace message.
    pub fn with_trace_per_request(mut self, trace_per_request: bool) -> Self {
        self.trace_per_request = trace_per_request;
        self
    }

    /// Set the cloud role name.
    pub fn with_role_name(mut self, role_name: impl Into<String>) -> Self {
        self.role_name = Some(role_name.into());
        self
    }

    /// Buffer limit clamped to at least one item.
    pub(crate) fn effective_buffer_limit(&self) -> usize {
        usize::try_from(self.buffer_limit.max(1)).unwrap_or(usize::MAX)
    }
}

fn setting<T>(
    key: &'static str,
    value: Option<String>,
    parse: impl Fn(&'static str, &str) -> Result<T, Error>,
) -> Option<T> {
    let value = value?;
    match parse(key, &value) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!("{}; using default", err);
            None
        }
    }
}

fn parse_int(key: &'static str, value: &str) -> Result<i64, Error> {
    value.trim().parse().map_err(|_| Error::InvalidConfig {
        key,
        value: value.to_string(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, Error> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(Error::InvalidConfig {
            key,
            value: value.to_string(),
        }),
    }
}

/// Where the sender reads its configuration from.
///
/// Connection details and the queue flag are read again on every flush, so a source backed by
/// mutable state lets long-running workers pick up changes without recreating the sender.
pub trait ConfigSource: Debug + Send + Sync {
    /// Current configuration.
    fn config(&self) -> Config;
}

impl ConfigSource for Config {
    fn config(&self) -> Config {
        self.clone()
    }
}

impl ConfigSource for RwLock<Config> {
    fn config(&self) -> Config {
        match self.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for Arc<T> {
    fn config(&self) -> Config {
        self.as_ref().config()
    }
}

/// Reads the process environment every time, see [`Config::from_env`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl ConfigSource for EnvConfig {
    fn config(&self) -> Config {
        Config::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_case::test_case;

    fn from_map(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = from_map(&[]);
        assert_eq!(Config::default().with_role_name("stellar-app"), config);
        assert_eq!(10, config.buffer_limit);
        assert!(!config.use_queue);
        assert!(config.auto_flush);
        assert!(config.trace_per_request);
    }

    #[test]
    fn reads_all_settings() {
        let config = from_map(&[
            ("STELLAR_AI_CONNECTION_STRING", "InstrumentationKey=ABC"),
            ("STELLAR_AI_INSTRUMENTATION_KEY", "XYZ"),
            ("STELLAR_AI_BUFFER_LIMIT", " 25 "),
            ("STELLAR_AI_USE_QUEUE", "true"),
            ("STELLAR_AI_AUTO_FLUSH", "off"),
            ("STELLAR_AI_TRACE_PER_REQUEST", "0"),
            ("STELLAR_AI_ROLE_NAME", "checkout"),
            ("APP_NAME", "shop"),
            ("APPLICATIONINSIGHTS_CONNECTION_STRING", "InstrumentationKey=OTHER"),
            ("APPINSIGHTS_INSTRUMENTATIONKEY", "OTHER"),
        ]);
        assert_eq!(
            Config::new("InstrumentationKey=ABC")
                .with_instrumentation_key("XYZ")
                .with_buffer_limit(25)
                .with_use_queue(true)
                .with_auto_flush(false)
                .with_trace_per_request(false)
                .with_role_name("checkout"),
            config
        );
    }

    #[test_case("APPLICATIONINSIGHTS_CONNECTION_STRING", "APPINSIGHTS_INSTRUMENTATIONKEY" ; "application insights names")]
    #[test_case("APPINSIGHTS_CONNECTION_STRING", "APPINSIGHTS_INSTRUMENTATION_KEY" ; "legacy names")]
    fn fallback_variable_names(connection_string: &str, instrumentation_key: &str) {
        let config = from_map(&[
            (connection_string, "InstrumentationKey=ABC"),
            (instrumentation_key, "XYZ"),
        ]);
        assert_eq!("InstrumentationKey=ABC", config.connection_string);
        assert_eq!("XYZ", config.instrumentation_key);
    }

    #[test]
    fn role_name_falls_back_to_app_name() {
        let config = from_map(&[
            ("STELLAR_AI_CONNECTION_STRING", "InstrumentationKey=ABC"),
            ("STELLAR_AI_BUFFER_LIMIT", "3"),
            ("STELLAR_AI_USE_QUEUE", "true"),
            ("APP_NAME", "shop"),
        ]);
        assert_eq!("InstrumentationKey=ABC", config.connection_string);
        assert_eq!(3, config.buffer_limit);
        assert!(config.use_queue);
        assert_eq!(Some("shop"), config.role_name.as_deref());
    }

    #[test]
    fn invalid_values_use_defaults() {
        let config = from_map(&[
            ("STELLAR_AI_BUFFER_LIMIT", "ten"),
            ("STELLAR_AI_AUTO_FLUSH", "maybe"),
        ]);
        assert_eq!(10, config.buffer_limit);
        assert!(config.auto_flush);
    }

    #[test_case(10, 10 ; "unchanged")]
    #[test_case(1, 1 ; "one")]
    #[test_case(0, 1 ; "zero is clamped")]
    #[test_case(-5, 1 ; "negative is clamped")]
    fn effective_buffer_limit(configured: i64, expected: usize) {
        assert_eq!(
            expected,
            Config::default()
                .with_buffer_limit(configured)
                .effective_buffer_limit()
        );
    }

    #[test]
    fn shared_config_is_reread() {
        let shared = Arc::new(RwLock::new(Config::new("InstrumentationKey=A")));
        let source: Arc<dyn ConfigSource> = shared.clone();
        assert_eq!("InstrumentationKey=A", source.config().connection_string);

        shared.write().unwrap().connection_string = "InstrumentationKey=B".into();
        assert_eq!("InstrumentationKey=B", source.config().connection_string);
    }
}
