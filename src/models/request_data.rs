use crate::models::Properties;
use serde::Serialize;

/// An instance of Request represents completion of an external request to the application to do
/// work and contains a summary of that request execution and the results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestData {
    /// Schema version
    pub ver: i32,
    /// Identifier of a request call instance. 16 lowercase hex characters.
    pub id: String,
    /// Name of the request, e.g. `GET /users/index`.
    pub name: String,
    /// Request duration in format `HH:MM:SS.mmm`.
    pub duration: String,
    /// Result of a request execution. HTTP status code for HTTP requests.
    pub response_code: String,
    /// Indication of successful or unsuccessful call.
    pub success: bool,
    /// Request URL with all query string parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Collection of custom properties.
    pub properties: Properties,
}
