use crate::models::{EventData, MessageData, RequestData};
use serde::Serialize;

/// Data struct to contain both B and C sections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "baseType", content = "baseData")]
pub enum Data {
    /// Custom event.
    #[serde(rename = "EventData")]
    Event(EventData),
    /// Trace message.
    #[serde(rename = "MessageData")]
    Message(MessageData),
    /// Incoming request.
    #[serde(rename = "RequestData")]
    Request(RequestData),
}
