use crate::models::{Data, Tags};
use serde::Serialize;

/// Envelope name for custom events.
pub const EVENT_ENVELOPE_NAME: &str = "Microsoft.ApplicationInsights.Event";
/// Envelope name for trace messages.
pub const MESSAGE_ENVELOPE_NAME: &str = "Microsoft.ApplicationInsights.Message";
/// Envelope name for incoming requests.
pub const REQUEST_ENVELOPE_NAME: &str = "Microsoft.ApplicationInsights.Request";

/// System variables for a telemetry item.
///
/// `time` and `i_key` may be left empty while the item sits in the buffer. The batch sender fills
/// them in with the current time and the resolved instrumentation key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Type name of the telemetry, e.g. `Microsoft.ApplicationInsights.Request`.
    pub name: String,
    /// Event timestamp in ISO-8601 UTC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Instrumentation key of the receiving resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub i_key: Option<String>,
    /// Context tags, e.g. `ai.cloud.role`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    /// Typed payload.
    pub data: Data,
}
