//! Buffered [Azure Application Insights] telemetry sender.
//!
//! [Azure Application Insights]: https://docs.microsoft.com/en-us/azure/azure-monitor/app/app-insights-overview
//!
//! **Disclaimer**: This is not an official Microsoft product.
//!
//! # Usage
//!
//! Create a [`TelemetryClient`] with any [`opentelemetry_http::HttpClient`] and a configuration
//! source, then track events, exceptions, requests, dependencies and database queries:
//!
//! ```rust,no_run
//! # #[cfg(feature = "reqwest-client")]
//! # async fn run() {
//! use app_insights_sender::{Config, TelemetryClient};
//!
//! let config = Config::new("InstrumentationKey=...;IngestionEndpoint=https://westeurope-5.in.applicationinsights.azure.com/")
//!     .with_buffer_limit(20);
//! let mut telemetry = TelemetryClient::new(reqwest::Client::new(), config);
//!
//! telemetry.track_event("user signed up", Default::default()).await;
//! telemetry.track_db_query("SELECT 1", 0.8, Default::default()).await;
//! telemetry.flush().await;
//! # }
//! ```
//!
//! Items are buffered in memory. The buffer is sent as one batch once it holds `buffer_limit`
//! items, or when [`TelemetryClient::flush`] is called. Delivery is best effort: there are no
//! retries and nothing is persisted. A failed upload is logged at debug level through `tracing`
//! and the batch is dropped. Nothing is sent when no instrumentation key is configured.
//!
//! # Configuration
//!
//! [`Config::from_env`] reads `STELLAR_AI_*` variables, falling back to the usual Application
//! Insights ones for the connection string and instrumentation key. The sender
//! reads its [`ConfigSource`] again on every flush, so connection details can change at runtime.
//!
//! # Telemetry mapping
//!
//! | Operation          | Telemetry type                        | Envelope                         |
//! | ------------------ | ------------------------------------- | -------------------------------- |
//! | `track_event`      | Custom event named after the event    | `EventData`                      |
//! | `track_exception`  | Custom event `exception`              | `EventData`                      |
//! | `track_dependency` | Custom event `dependency`             | `EventData`                      |
//! | `track_db_query`   | Custom event `db`                     | `EventData`                      |
//! | `track_request`    | Request, plus a trace if enabled      | `RequestData` (+ `MessageData`)  |
//!
//! Property keys matching the [`Sanitizer`] pattern (`password`, `secret`, `token`,
//! `authorization`, ...) are masked in all of them.
//!
//! # Asynchronous delivery
//!
//! With `use_queue` enabled and a [`DeliveryQueue`] attached, flushed batches are handed to the
//! queue instead of being sent inline. [`spawn_delivery_worker`] creates a tokio-backed queue.
#![doc(html_root_url = "https://docs.rs/app-insights-sender/0.1.0")]
#![deny(missing_docs, unreachable_pub, missing_debug_implementations)]

mod client;
mod config;
mod connection_string;
mod convert;
mod error;
mod item;
pub mod middleware;
pub mod models;
mod queue;
mod sanitizer;
mod sender;
mod uploader;

pub use client::TelemetryClient;
pub use config::{Config, ConfigSource, EnvConfig};
pub use connection_string::ConnectionDescriptor;
pub use error::Error;
pub use item::{RawItem, TelemetryItem};
pub use queue::{spawn_delivery_worker, ChannelQueue, DeliveryQueue};
pub use sanitizer::{Sanitizer, REDACTED};
pub use sender::TelemetrySender;
pub use uploader::send_batch;
