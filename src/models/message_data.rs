use crate::models::{Properties, SeverityLevel};
use serde::Serialize;

/// Instances of Message represent printf-like trace statements that are text-searched. The
/// message does not have measurements.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    /// Schema version
    pub ver: i32,

    /// Trace message
    pub message: String,

    /// Trace severity level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_level: Option<SeverityLevel>,

    /// Collection of custom properties.
    pub properties: Properties,
}
