use crate::{models::Properties, Error};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Replacement for the value of a sensitive property.
pub const REDACTED: &str = "[REDACTED]";

const DEFAULT_SENSITIVE_KEYS: &str = r"(?i)(password|passwd|pwd|secret|token|authorization|api[_-]?key|cookie|credit_card|card_number|ssn)";

static DEFAULT_SENSITIVE_KEYS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_SENSITIVE_KEYS).expect("default pattern is valid"));

/// Masks property values whose key looks sensitive.
///
/// Keys are matched by regular expression anywhere in the key name, so `db.password` and
/// `X-Api-Key` are both caught by the default pattern. Nested objects are masked the same way.
/// `null` values are left as they are.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    sensitive_keys: Regex,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self {
            sensitive_keys: DEFAULT_SENSITIVE_KEYS_REGEX.clone(),
        }
    }
}

impl Sanitizer {
    /// Sanitizer with a custom key pattern, replacing the default one.
    ///
    /// ```
    /// use app_insights_sender::Sanitizer;
    ///
    /// let sanitizer = Sanitizer::with_pattern(r"(?i)^(email|phone)$").unwrap();
    /// assert!(sanitizer.is_sensitive("Email"));
    /// assert!(!sanitizer.is_sensitive("password"));
    /// ```
    pub fn with_pattern(pattern: &str) -> Result<Self, Error> {
        Ok(Self {
            sensitive_keys: Regex::new(pattern).map_err(Error::InvalidPattern)?,
        })
    }

    /// Whether a property with this key gets masked.
    pub fn is_sensitive(&self, key: &str) -> bool {
        self.sensitive_keys.is_match(key)
    }

    /// Returns a copy of `properties` with sensitive values replaced by [`REDACTED`].
    pub fn sanitize(&self, properties: &Properties) -> Properties {
        properties
            .iter()
            .map(|(key, value)| (key.clone(), self.sanitize_entry(key, value)))
            .collect()
    }

    fn sanitize_entry(&self, key: &str, value: &Value) -> Value {
        if value.is_null() {
            Value::Null
        } else if self.is_sensitive(key) {
            Value::String(REDACTED.to_string())
        } else {
            self.sanitize_value(value)
        }
    }

    fn sanitize_value(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), self.sanitize_entry(key, value)))
                    .collect::<Map<_, _>>(),
            ),
            Value::Array(values) => {
                Value::Array(values.iter().map(|v| self.sanitize_value(v)).collect())
            }
            _ => value.clone(),
        }
    }
}
