use std::collections::HashMap;

pub(crate) const DEFAULT_BREEZE_ENDPOINT: &str = "https://dc.services.visualstudio.com";
const TRACK_PATH: &str = "/v2/track";
const FIELDS_SEPARATOR: char = ';';
const FIELD_KEY_VALUE_SEPARATOR: char = '=';
const INSTRUMENTATION_KEY: &str = "instrumentationkey";
const INGESTION_ENDPOINT: &str = "ingestionendpoint";

/// Ingestion endpoint and instrumentation key a batch is sent with.
///
/// This is derived from configuration on every flush and never cached, so configuration changes
/// in long-running workers take effect on the next batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Full track URL, e.g. `https://dc.services.visualstudio.com/v2/track`.
    pub endpoint: String,
    /// Instrumentation key. Empty if neither the connection string nor the fallback has one.
    pub instrumentation_key: String,
}

impl ConnectionDescriptor {
    /// Resolve endpoint and instrumentation key from a connection string and a fallback key.
    ///
    /// A non-empty `InstrumentationKey` in the connection string wins over `fallback_key`. A
    /// non-empty `IngestionEndpoint` replaces the default ingestion host. Field names are matched
    /// case-insensitively; segments without `=` are skipped.
    ///
    /// ```
    /// use app_insights_sender::ConnectionDescriptor;
    ///
    /// let resolved = ConnectionDescriptor::resolve(
    ///     "InstrumentationKey=ABC;IngestionEndpoint=https://eu.example.com/",
    ///     "",
    /// );
    /// assert_eq!("https://eu.example.com/v2/track", resolved.endpoint);
    /// assert_eq!("ABC", resolved.instrumentation_key);
    /// ```
    pub fn resolve(connection_string: &str, fallback_key: &str) -> Self {
        let mut instrumentation_key = fallback_key.trim().to_string();
        let mut ingestion_endpoint = None;

        if !connection_string.trim().is_empty() {
            let mut fields = parse_fields(connection_string);

            if let Some(key) = fields.remove(INSTRUMENTATION_KEY).filter(|k| !k.is_empty()) {
                instrumentation_key = key;
            }

            ingestion_endpoint = fields
                .remove(INGESTION_ENDPOINT)
                .map(|endpoint| endpoint.trim_end_matches('/').to_string())
                .filter(|endpoint| !endpoint.is_empty());
        }

        let base = ingestion_endpoint.unwrap_or_else(|| DEFAULT_BREEZE_ENDPOINT.to_string());
        ConnectionDescriptor {
            endpoint: format!("{}{}", base, TRACK_PATH),
            instrumentation_key,
        }
    }
}

/// Split `Key=Value;Key2=Value2` into a map with lowercase keys.
///
/// Only the first `=` separates key and value, so values may contain `=` themselves.
fn parse_fields(connection_string: &str) -> HashMap<String, String> {
    connection_string
        .split(FIELDS_SEPARATOR)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| segment.split_once(FIELD_KEY_VALUE_SEPARATOR))
        .map(|(key, value)| (key.trim().to_lowercase(), value.trim().to_string()))
        .collect()
}
