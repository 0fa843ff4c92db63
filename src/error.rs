use std::{error::Error as StdError, fmt::Debug, time::Duration};

/// Errors that occurred while delivering telemetry.
///
/// None of these ever reach code that calls the `track_*` operations. They are produced inside
/// the batch sender and logged at debug level before the batch is dropped.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Application Insights telemetry data failed to serialize to JSON. Telemetry reporting failed
    /// because of this.
    ///
    /// Note: This is an error in this crate. If you spot this, please open an issue.
    #[error("serializing upload request failed with {0}")]
    UploadSerializeRequest(serde_json::Error),

    /// The resolved ingestion endpoint is not a valid URI.
    #[error("invalid ingestion endpoint: {0}")]
    InvalidEndpoint(http::uri::InvalidUri),

    /// Could not complete the HTTP request to Application Insights to send telemetry data.
    /// Telemetry reporting failed because of this.
    #[error("sending upload request failed with {0}")]
    UploadConnection(Box<dyn StdError + Send + Sync + 'static>),

    /// The ingestion endpoint did not answer within the send timeout.
    #[error("upload request timed out after {0:?}")]
    UploadTimeout(Duration),

    /// Application Insights returned at least one error for the reported telemetry data.
    #[error("upload failed with {0}")]
    Upload(String),

    /// A sensitive key pattern is not a valid regular expression.
    #[error("invalid sensitive key pattern: {0}")]
    InvalidPattern(regex::Error),

    /// A configuration value could not be parsed.
    #[error("invalid value {value:?} for configuration key {key}")]
    InvalidConfig {
        /// Name of the configuration key (environment variable).
        key: &'static str,
        /// Raw value that failed to parse.
        value: String,
    },
}
