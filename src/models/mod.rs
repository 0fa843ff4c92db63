//! Wire types of the Application Insights ingestion API.

mod data;
mod envelope;
mod event_data;
mod limits;
mod message_data;
mod request_data;
mod severity_level;

pub use data::*;
pub use envelope::*;
pub use event_data::*;
pub(crate) use limits::*;
pub use message_data::*;
pub use request_data::*;
pub use severity_level::*;

use std::collections::BTreeMap;

/// Custom properties of a telemetry item. Values are JSON scalars or strings.
pub type Properties = BTreeMap<String, serde_json::Value>;

/// Context tags of an envelope.
pub type Tags = BTreeMap<String, String>;

/// Name of the cloud role the telemetry originates from.
pub const CLOUD_ROLE: &str = "ai.cloud.role";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serialization_format() {
        let envelope = Envelope {
            name: "Test".into(),
            time: Some("2020-06-21T10:40:00.000Z".into()),
            i_key: None,
            tags: None,
            data: Data::Message(MessageData {
                ver: 2,
                message: "hello world".into(),
                severity_level: Some(SeverityLevel::Error),
                properties: Properties::new(),
            }),
        };
        let serialized = serde_json::to_string(&envelope).unwrap();
        insta::assert_snapshot!(serialized, @r#"{"name":"Test","time":"2020-06-21T10:40:00.000Z","data":{"baseType":"MessageData","baseData":{"ver":2,"message":"hello world","severityLevel":3,"properties":{}}}}"#);
    }

    #[test]
    fn request_serialization() {
        let envelope = Envelope {
            name: REQUEST_ENVELOPE_NAME.into(),
            time: None,
            i_key: Some("ikey".into()),
            tags: Some(Tags::from([(CLOUD_ROLE.to_string(), "api".to_string())])),
            data: Data::Request(RequestData {
                ver: 2,
                id: "0123456789abcdef".into(),
                name: "GET /a".into(),
                duration: "00:00:00.010".into(),
                response_code: "200".into(),
                success: true,
                url: Some("http://x/a".into()),
                properties: Properties::from([("request.status_code".into(), json!(200))]),
            }),
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json!({
                "name": "Microsoft.ApplicationInsights.Request",
                "iKey": "ikey",
                "tags": { "ai.cloud.role": "api" },
                "data": {
                    "baseType": "RequestData",
                    "baseData": {
                        "ver": 2,
                        "id": "0123456789abcdef",
                        "name": "GET /a",
                        "duration": "00:00:00.010",
                        "responseCode": "200",
                        "success": true,
                        "url": "http://x/a",
                        "properties": { "request.status_code": 200 }
                    }
                }
            }),
            value
        );
    }

    #[test]
    fn limits() {
        let mut envelope = Envelope {
            name: "x".repeat(2000),
            time: None,
            i_key: None,
            tags: None,
            data: Data::Message(MessageData {
                ver: 2,
                message: "m".repeat(33000),
                severity_level: None,
                properties: Properties::new(),
            }),
        };
        envelope.limit_length();
        assert_eq!(1024, envelope.name.len());
        match envelope.data {
            Data::Message(data) => assert_eq!(32768, data.message.len()),
            _ => panic!("we should not get here"),
        }
    }
}
