use crate::{
    models::{Envelope, LimitLength},
    Config, ConnectionDescriptor, Error, TelemetryItem,
};
use bytes::Bytes;
use http::{Request, Response, Uri};
use opentelemetry_http::HttpClient;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, trace};

/// Upper bound for a single upload, so telemetry never stalls the host application for long.
pub(crate) const SEND_TIMEOUT: Duration = Duration::from_secs(2);

const STATUS_OK: u16 = 200;
const STATUS_PARTIAL_CONTENT: u16 = 206;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Transmission {
    items_received: usize,
    items_accepted: usize,
    errors: Vec<TransmissionItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransmissionItem {
    index: usize,
    status_code: u16,
    #[serde(default)]
    message: String,
}

/// Send a batch of telemetry items.
///
/// Connection details are resolved from `config`. Without an instrumentation key the batch is
/// dropped without any network call. Delivery errors are logged at debug level and the batch is
/// dropped; they are never returned.
pub async fn send_batch<C>(client: &C, config: &Config, items: Vec<TelemetryItem>)
where
    C: HttpClient + ?Sized,
{
    if let Err(err) = try_send_batch(client, config, items).await {
        debug!("Application Insights telemetry send failed: {}", err);
    }
}

pub(crate) async fn try_send_batch<C>(
    client: &C,
    config: &Config,
    items: Vec<TelemetryItem>,
) -> Result<(), Error>
where
    C: HttpClient + ?Sized,
{
    let connection =
        ConnectionDescriptor::resolve(&config.connection_string, &config.instrumentation_key);
    if connection.instrumentation_key.is_empty() {
        trace!(
            "No instrumentation key configured; dropping {} telemetry items",
            items.len()
        );
        return Ok(());
    }

    let envelopes = finalize(
        items,
        &connection.instrumentation_key,
        config.role_name.as_deref(),
    );
    send(client, &connection.endpoint, envelopes).await
}

fn finalize(
    items: Vec<TelemetryItem>,
    instrumentation_key: &str,
    role_name: Option<&str>,
) -> Vec<Envelope> {
    items
        .into_iter()
        .map(|item| {
            let mut envelope = item.into_envelope(instrumentation_key, role_name);
            envelope.limit_length();
            envelope
        })
        .collect()
}

/// Sends telemetry items to the server as one JSON array.
async fn send<C>(client: &C, endpoint: &str, items: Vec<Envelope>) -> Result<(), Error>
where
    C: HttpClient + ?Sized,
{
    if items.is_empty() {
        return Ok(());
    }

    let endpoint = Uri::try_from(endpoint).map_err(Error::InvalidEndpoint)?;
    let payload = serde_json::to_vec(&items).map_err(Error::UploadSerializeRequest)?;
    let request = Request::post(endpoint)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Bytes::from(payload))
        .map_err(|err| Error::UploadConnection(err.into()))?;

    let response = tokio::time::timeout(SEND_TIMEOUT, client.send_bytes(request))
        .await
        .map_err(|_| Error::UploadTimeout(SEND_TIMEOUT))?
        .map_err(Error::UploadConnection)?;
    handle_response(response)
}

fn handle_response(response: Response<Bytes>) -> Result<(), Error> {
    match response.status().as_u16() {
        STATUS_OK => Ok(()),
        status @ STATUS_PARTIAL_CONTENT => {
            let content: Transmission = serde_json::from_slice(response.body())
                .map_err(|err| Error::Upload(format!("{}: unreadable response: {}", status, err)))?;
            if content.items_received == content.items_accepted {
                Ok(())
            } else {
                let rejected = content
                    .errors
                    .iter()
                    .map(|item| format!("#{} {} {}", item.index, item.status_code, item.message))
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(Error::Upload(format!(
                    "{}: {} of {} items accepted; rejected: {}",
                    status, content.items_accepted, content.items_received, rejected
                )))
            }
        }
        status => Err(Error::Upload(format!(
            "{}: {}",
            status,
            String::from_utf8_lossy(response.body())
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn response(status: u16, body: &'static str) -> Response<Bytes> {
        Response::builder()
            .status(status)
            .body(Bytes::from(body))
            .expect("response is well formed")
    }

    #[test_case(200, "{}" ; "ok")]
    #[test_case(206, r#"{"itemsReceived":2,"itemsAccepted":2,"errors":[]}"# ; "partial but all accepted")]
    fn accepted(status: u16, body: &'static str) {
        handle_response(response(status, body)).unwrap();
    }

    #[test_case(206, r#"{"itemsReceived":2,"itemsAccepted":1,"errors":[{"index":1,"statusCode":400,"message":"bad"}]}"#, "206: 1 of 2 items accepted; rejected: #1 400 bad" ; "partial")]
    #[test_case(206, "nope", "206: unreadable response" ; "partial unreadable")]
    #[test_case(400, "invalid ikey", "400: invalid ikey" ; "bad request")]
    #[test_case(503, "", "503: " ; "unavailable")]
    fn rejected(status: u16, body: &'static str, expected: &'static str) {
        match handle_response(response(status, body)) {
            Err(Error::Upload(message)) => assert!(
                message.starts_with(expected),
                "{:?} does not start with {:?}",
                message,
                expected
            ),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
