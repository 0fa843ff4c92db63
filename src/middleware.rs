//! Request lifecycle tracking for HTTP servers.
//!
//! Framework integrations wrap their handler call in [`track_request_lifecycle`]. It tracks the
//! request once the handler completes or panics, flushes when `auto_flush` is enabled and hands
//! the handler's outcome back untouched.

use crate::{models::Properties, TelemetryClient};
use futures_util::FutureExt;
use http::{Method, Response, Uri};
use opentelemetry_http::HttpClient;
use serde_json::json;
use std::{any::Any, fmt::Display, future::Future, panic::AssertUnwindSafe, time::Instant};
use tokio::sync::Mutex;

/// Run `handler` and record it as an incoming request.
///
/// - `Ok(response)` is tracked with the response status code.
/// - `Err(error)` is tracked as a `500` with `exception.type` and `exception.message`.
/// - A panic in `handler` is tracked as a `500` with `exception.type = "panic"`, then the
///   panic resumes.
///
/// `properties` are merged into the request properties. Telemetry never changes the outcome:
/// the handler's result is returned as-is, including its error.
///
/// The lock is held only while the request is recorded. With `auto_flush` enabled the batch is
/// taken out under the lock and sent after it is released, so concurrent requests do not wait
/// for the upload. A flush triggered by reaching the buffer limit still sends under the lock.
///
/// ```no_run
/// # async fn run(telemetry: tokio::sync::Mutex<app_insights_sender::TelemetryClient<impl opentelemetry_http::HttpClient + 'static>>) {
/// use app_insights_sender::middleware::track_request_lifecycle;
/// use http::{Method, Response, Uri};
///
/// let uri: Uri = "/users/42".parse().unwrap();
/// let result = track_request_lifecycle(
///     &telemetry,
///     &Method::GET,
///     &uri,
///     Default::default(),
///     async { Ok::<_, std::io::Error>(Response::new("hello")) },
/// )
/// .await;
/// # }
/// ```
pub async fn track_request_lifecycle<C, F, B, E>(
    telemetry: &Mutex<TelemetryClient<C>>,
    method: &Method,
    uri: &Uri,
    properties: Properties,
    handler: F,
) -> Result<Response<B>, E>
where
    C: HttpClient + 'static,
    F: Future<Output = Result<Response<B>, E>>,
    E: Display,
{
    let start = Instant::now();
    let outcome = AssertUnwindSafe(handler).catch_unwind().await;
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

    let (status_code, failure) = match &outcome {
        Ok(Ok(response)) => (response.status().as_u16(), None),
        Ok(Err(error)) => (
            500,
            Some((std::any::type_name::<E>().to_string(), error.to_string())),
        ),
        Err(panic) => (500, Some(("panic".to_string(), panic_message(panic.as_ref())))),
    };

    let mut request_properties = properties;
    request_properties.extend([
        ("success".to_string(), json!(status_code < 500)),
        ("http.method".to_string(), json!(method.as_str())),
        ("http.path".to_string(), json!(uri.path())),
        ("http.status".to_string(), json!(status_code)),
    ]);
    if let Some((kind, message)) = failure {
        request_properties.extend([
            ("exception.type".to_string(), json!(kind)),
            ("exception.message".to_string(), json!(message)),
        ]);
    }

    let batch = {
        let mut telemetry = telemetry.lock().await;
        telemetry
            .track_request(
                method.as_str(),
                &uri.to_string(),
                status_code,
                duration_ms,
                request_properties,
            )
            .await;
        if telemetry.config().auto_flush {
            telemetry.take_batch()
        } else {
            None
        }
    };
    if let Some(batch) = batch {
        batch.deliver().await;
    }

    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}
