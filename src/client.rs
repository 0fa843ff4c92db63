use crate::{
    convert::{duration_to_string, now_string, random_id},
    item::RawItem,
    models::{
        Data, Envelope, MessageData, Properties, RequestData, SeverityLevel,
        MESSAGE_ENVELOPE_NAME, REQUEST_ENVELOPE_NAME,
    },
    sender::PendingBatch,
    Config, ConfigSource, DeliveryQueue, Sanitizer, TelemetrySender,
};
use http::Uri;
use opentelemetry_http::HttpClient;
use serde_json::{json, Value};
use std::{error::Error as StdError, panic::Location};

const REQUEST_TRACE_MESSAGE: &str = "HTTP request processed";

/// Records telemetry and forwards it to Application Insights in batches.
///
/// Every `track_*` call shapes one or more telemetry items, masks sensitive properties and adds
/// them to the buffer. Reaching the buffer limit sends the batch within the same call. Delivery
/// problems are logged and never surface to the caller.
///
/// ```no_run
/// # async fn run(http_client: impl opentelemetry_http::HttpClient + 'static) {
/// use app_insights_sender::{Config, TelemetryClient};
///
/// let mut telemetry = TelemetryClient::new(http_client, Config::from_env());
/// telemetry
///     .track_request("GET", "https://example.com/users?page=2", 200, 12.5, Default::default())
///     .await;
/// telemetry.flush().await;
/// # }
/// ```
#[derive(Debug)]
pub struct TelemetryClient<C> {
    sender: TelemetrySender<C>,
    sanitizer: Sanitizer,
}

impl<C> TelemetryClient<C>
where
    C: HttpClient + 'static,
{
    /// Create a client that sends with `client` and reads configuration from `config`.
    pub fn new(client: C, config: impl ConfigSource + 'static) -> Self {
        Self::from_sender(TelemetrySender::new(client, config))
    }

    /// Create a client on top of an existing sender.
    pub fn from_sender(sender: TelemetrySender<C>) -> Self {
        Self {
            sender,
            sanitizer: Sanitizer::default(),
        }
    }

    /// Replace the default sanitizer.
    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Attach an asynchronous delivery queue, see [`TelemetrySender::with_queue`].
    pub fn with_queue(mut self, queue: impl DeliveryQueue + 'static) -> Self {
        self.sender = self.sender.with_queue(queue);
        self
    }

    /// The underlying buffer.
    pub fn sender(&self) -> &TelemetrySender<C> {
        &self.sender
    }

    /// Current configuration.
    pub fn config(&self) -> Config {
        self.sender.config()
    }

    /// Track a custom event.
    pub async fn track_event(&mut self, name: &str, properties: Properties) {
        let properties = self.sanitizer.sanitize(&properties);
        self.sender
            .enqueue(RawItem {
                kind: "event".into(),
                name: Some(name.into()),
                time: Some(now_string()),
                properties,
            })
            .await;
    }

    /// Track an error.
    ///
    /// Adds `exception.type`, `exception.message`, `exception.file` and `exception.line` (the
    /// location this method was called from) and `exception.source` if the error has a cause.
    #[track_caller]
    pub fn track_exception<'a, E>(
        &'a mut self,
        error: &'a E,
        properties: Properties,
    ) -> impl std::future::Future<Output = ()> + 'a
    where
        E: StdError + ?Sized + 'static,
    {
        let location = Location::caller();
        async move {
            let mut properties = properties;
            properties.insert("exception.type".into(), json!(std::any::type_name::<E>()));
            properties.insert("exception.message".into(), json!(error.to_string()));
            properties.insert("exception.file".into(), json!(location.file()));
            properties.insert("exception.line".into(), json!(location.line()));
            if let Some(source) = error.source() {
                properties.insert("exception.source".into(), json!(source.to_string()));
            }

            let properties = self.sanitizer.sanitize(&properties);
            self.sender
                .enqueue(RawItem {
                    kind: "exception".into(),
                    name: None,
                    time: Some(now_string()),
                    properties,
                })
                .await;
        }
    }

    /// Track an incoming HTTP request.
    ///
    /// Emits a `RequestData` envelope named `"<METHOD> <path>"` and, unless `trace_per_request`
    /// is disabled, a `MessageData` trace before it. Status codes from 400 on count as failed.
    pub async fn track_request(
        &mut self,
        method: &str,
        url: &str,
        status_code: u16,
        duration_ms: f64,
        properties: Properties,
    ) {
        let name = format!("{} {}", method.to_uppercase(), url_path(url));
        let success = status_code < 400;
        let properties = self.sanitizer.sanitize(&properties);

        if self.sender.config().trace_per_request {
            let mut trace_properties = properties.clone();
            trace_properties.extend([
                ("request.name".to_string(), json!(name)),
                ("request.method".to_string(), json!(method)),
                ("request.full_url".to_string(), json!(url)),
                ("request.status_code".to_string(), json!(status_code)),
                (
                    "request.duration_ms".to_string(),
                    json!(duration_ms.round() as i64),
                ),
            ]);
            self.sender
                .enqueue(Envelope {
                    name: MESSAGE_ENVELOPE_NAME.into(),
                    time: Some(now_string()),
                    i_key: None,
                    tags: None,
                    data: Data::Message(MessageData {
                        ver: 2,
                        message: REQUEST_TRACE_MESSAGE.into(),
                        severity_level: Some(if success {
                            SeverityLevel::Information
                        } else {
                            SeverityLevel::Error
                        }),
                        properties: trace_properties,
                    }),
                })
                .await;
        }

        let mut request_properties = properties;
        request_properties.extend([
            ("request.method".to_string(), json!(method)),
            ("request.full_url".to_string(), json!(url)),
            ("request.status_code".to_string(), json!(status_code)),
            ("request.duration_ms".to_string(), number(duration_ms)),
        ]);
        self.sender
            .enqueue(Envelope {
                name: REQUEST_ENVELOPE_NAME.into(),
                time: None,
                i_key: None,
                tags: None,
                data: Data::Request(RequestData {
                    ver: 2,
                    id: random_id(),
                    name,
                    duration: duration_to_string(duration_ms),
                    response_code: status_code.to_string(),
                    success,
                    url: Some(url.into()),
                    properties: request_properties,
                }),
            })
            .await;
    }

    /// Track a call to a remote dependency.
    ///
    /// Properties are sanitized like in every other `track_*` operation.
    pub async fn track_dependency(
        &mut self,
        target: &str,
        name: &str,
        duration_ms: f64,
        success: bool,
        properties: Properties,
    ) {
        let mut properties = properties;
        properties.extend([
            ("dependency.target".to_string(), json!(target)),
            ("dependency.name".to_string(), json!(name)),
            ("dependency.duration_ms".to_string(), number(duration_ms)),
            ("dependency.success".to_string(), json!(success)),
        ]);
        let properties = self.sanitizer.sanitize(&properties);
        self.sender
            .enqueue(RawItem {
                kind: "dependency".into(),
                name: None,
                time: Some(now_string()),
                properties,
            })
            .await;
    }

    /// Track a database query. Properties are sanitized, see [`track_dependency`].
    ///
    /// [`track_dependency`]: TelemetryClient::track_dependency
    pub async fn track_db_query(&mut self, sql: &str, duration_ms: f64, properties: Properties) {
        let mut properties = properties;
        properties.extend([
            ("db.sql".to_string(), json!(sql)),
            ("db.duration_ms".to_string(), number(duration_ms)),
        ]);
        let properties = self.sanitizer.sanitize(&properties);
        self.sender
            .enqueue(RawItem {
                kind: "db".into(),
                name: None,
                time: Some(now_string()),
                properties,
            })
            .await;
    }

    /// Send everything buffered so far.
    pub async fn flush(&mut self) {
        self.sender.flush().await;
    }

    pub(crate) fn take_batch(&mut self) -> Option<PendingBatch<C>> {
        self.sender.take_batch()
    }
}

/// Path component of `url`, or `/` if there is none or the URL does not parse.
///
/// Query and fragment are cut off first. Paths the strict URI grammar rejects (spaces, quotes)
/// are still taken from after the authority.
fn url_path(url: &str) -> String {
    let url = url.split(|c| c == '?' || c == '#').next().unwrap_or_default();
    let path = match url.parse::<Uri>() {
        Ok(uri) => uri.path().to_string(),
        Err(_) => match url.split_once("://") {
            Some((_, rest)) => rest.find('/').map(|i| rest[i..].to_string()).unwrap_or_default(),
            None if url.starts_with('/') => url.to_string(),
            None => String::new(),
        },
    };
    if path.is_empty() {
        "/".into()
    } else {
        path
    }
}

/// JSON number for a float; non-finite values become `null`.
fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("http://x/a/b?q=1", "/a/b" ; "path and query")]
    #[test_case("https://example.com", "/" ; "no path")]
    #[test_case("/relative/path?x", "/relative/path" ; "origin form")]
    #[test_case("http://x/search?q=\"x\"", "/search" ; "quotes in query")]
    #[test_case("http://x/a/b?q=1#top", "/a/b" ; "fragment")]
    #[test_case("http://x/a b/c", "/a b/c" ; "space in path")]
    #[test_case("http://x/café/menu", "/café/menu" ; "non ascii path")]
    #[test_case("/a b?q=<x>", "/a b" ; "origin form with space")]
    #[test_case("not a url at all", "/" ; "unparseable")]
    #[test_case("", "/" ; "empty")]
    fn path(url: &'static str, expected: &'static str) {
        assert_eq!(expected, url_path(url));
    }

    #[test]
    fn numbers() {
        assert_eq!(json!(1500.0), number(1500.0));
        assert_eq!(Value::Null, number(f64::INFINITY));
    }
}
