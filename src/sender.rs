use crate::{uploader::send_batch, Config, ConfigSource, DeliveryQueue, TelemetryItem};
use opentelemetry_http::HttpClient;
use std::sync::Arc;
use tracing::trace;

/// In-memory telemetry buffer that flushes in batches.
///
/// The buffer flushes as soon as it holds `buffer_limit` items, or when [`flush`] is called.
/// A sender is meant to be owned by one logical flow. Share it between tasks only behind a lock.
///
/// [`flush`]: TelemetrySender::flush
#[derive(Debug)]
pub struct TelemetrySender<C> {
    client: Arc<C>,
    config: Arc<dyn ConfigSource>,
    queue: Option<Arc<dyn DeliveryQueue>>,
    buffer: Vec<TelemetryItem>,
    buffer_limit: usize,
}

impl<C> TelemetrySender<C>
where
    C: HttpClient + 'static,
{
    /// Create a sender.
    ///
    /// The buffer limit is read from `config` once, here. Everything else is read again on every
    /// flush.
    pub fn new(client: C, config: impl ConfigSource + 'static) -> Self {
        let buffer_limit = config.config().effective_buffer_limit();
        Self {
            client: Arc::new(client),
            config: Arc::new(config),
            queue: None,
            buffer: Vec::with_capacity(buffer_limit),
            buffer_limit,
        }
    }

    /// Attach an asynchronous delivery queue. Used when `use_queue` is enabled.
    pub fn with_queue(mut self, queue: impl DeliveryQueue + 'static) -> Self {
        self.queue = Some(Arc::new(queue));
        self
    }

    /// HTTP client used for inline sends.
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Current configuration as read from the configuration source.
    pub fn config(&self) -> Config {
        self.config.config()
    }

    /// Number of items that triggers a flush.
    pub fn buffer_limit(&self) -> usize {
        self.buffer_limit
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Append an item; flushes within this call when the buffer limit is reached.
    pub async fn enqueue(&mut self, item: impl Into<TelemetryItem>) {
        self.buffer.push(item.into());
        if self.buffer.len() >= self.buffer_limit {
            self.flush().await;
        }
    }

    /// Hand all buffered items to the delivery path.
    ///
    /// Does nothing if the buffer is empty. The buffer is swapped out before delivery starts, so
    /// it is empty again when this returns, whatever happened to the batch.
    pub async fn flush(&mut self) {
        if let Some(batch) = self.take_batch() {
            batch.deliver().await;
        }
    }

    /// Swap out the buffer without delivering it yet.
    ///
    /// Lets callers that share the sender behind a lock release it before the upload starts.
    pub(crate) fn take_batch(&mut self) -> Option<PendingBatch<C>> {
        if self.buffer.is_empty() {
            return None;
        }

        let items = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.buffer_limit));
        Some(PendingBatch {
            client: Arc::clone(&self.client),
            config: self.config.config(),
            queue: self.queue.clone(),
            items,
        })
    }
}

/// Batch taken out of the buffer, together with what is needed to deliver it.
#[derive(Debug)]
pub(crate) struct PendingBatch<C> {
    client: Arc<C>,
    config: Config,
    queue: Option<Arc<dyn DeliveryQueue>>,
    items: Vec<TelemetryItem>,
}

impl<C> PendingBatch<C>
where
    C: HttpClient + 'static,
{
    pub(crate) async fn deliver(self) {
        if self.config.use_queue {
            if let Some(queue) = self.queue.as_ref() {
                trace!("Queueing {} telemetry items", self.items.len());
                queue.push(self.items);
                return;
            }
        }

        trace!("Sending {} telemetry items", self.items.len());
        send_batch(self.client.as_ref(), &self.config, self.items).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{item::RawItem, models::Properties, ChannelQueue};
    use async_trait::async_trait;
    use bytes::Bytes;
    use http::{Request, Response};
    use opentelemetry_http::HttpError;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };
    use test_case::test_case;

    #[derive(Debug, Default)]
    struct CountingClient {
        requests: AtomicUsize,
        items: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl HttpClient for CountingClient {
        async fn send_bytes(&self, req: Request<Bytes>) -> Result<Response<Bytes>, HttpError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let body: Vec<serde_json::Value> = serde_json::from_slice(req.body())?;
            self.items.lock().unwrap().push(body.len());
            Ok(Response::builder().status(200).body(Bytes::from("{}"))?)
        }
    }

    fn config(buffer_limit: i64) -> Config {
        Config::new("InstrumentationKey=ABC").with_buffer_limit(buffer_limit)
    }

    fn item(n: usize) -> RawItem {
        RawItem {
            kind: "event".into(),
            name: Some(format!("event {}", n)),
            time: None,
            properties: Properties::new(),
        }
    }

    #[test_case(3, 7, &[3, 3] ; "two full batches")]
    #[test_case(1, 3, &[1, 1, 1] ; "limit of one")]
    #[test_case(0, 2, &[1, 1] ; "zero is clamped to one")]
    #[test_case(-3, 2, &[1, 1] ; "negative is clamped to one")]
    #[test_case(10, 9, &[] ; "below limit")]
    #[tokio::test]
    async fn flushes_when_limit_is_reached(limit: i64, count: usize, expected: &[usize]) {
        let mut sender = TelemetrySender::new(CountingClient::default(), config(limit));
        for n in 0..count {
            sender.enqueue(item(n)).await;
            assert!(sender.len() < sender.buffer_limit());
        }
        assert_eq!(expected, sender.client().items.lock().unwrap().as_slice());
        assert_eq!(count % sender.buffer_limit(), sender.len());
    }

    #[tokio::test]
    async fn explicit_flush_sends_remainder() {
        let mut sender = TelemetrySender::new(CountingClient::default(), config(10));
        sender.enqueue(item(0)).await;
        sender.enqueue(item(1)).await;
        sender.flush().await;
        assert!(sender.is_empty());
        assert_eq!(&[2], sender.client().items.lock().unwrap().as_slice());
    }

    #[tokio::test]
    async fn flush_of_empty_buffer_is_noop() {
        let mut sender = TelemetrySender::new(CountingClient::default(), config(10));
        sender.flush().await;
        assert_eq!(0, sender.client().requests.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn missing_key_drops_batch_without_request() {
        let mut sender =
            TelemetrySender::new(CountingClient::default(), Config::default().with_buffer_limit(1));
        sender.enqueue(item(0)).await;
        assert!(sender.is_empty());
        assert_eq!(0, sender.client().requests.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn queue_takes_batch_when_enabled() {
        let (queue, mut receiver) = ChannelQueue::channel();
        let mut sender =
            TelemetrySender::new(CountingClient::default(), config(2).with_use_queue(true))
                .with_queue(queue);
        sender.enqueue(item(0)).await;
        sender.enqueue(item(1)).await;
        assert!(sender.is_empty());
        assert_eq!(2, receiver.recv().await.unwrap().len());
        assert_eq!(0, sender.client().requests.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn queue_is_ignored_when_disabled() {
        let (queue, mut receiver) = ChannelQueue::channel();
        let mut sender =
            TelemetrySender::new(CountingClient::default(), config(1)).with_queue(queue);
        sender.enqueue(item(0)).await;
        assert_eq!(1, sender.client().requests.load(Ordering::SeqCst));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn use_queue_without_queue_sends_inline() {
        let mut sender =
            TelemetrySender::new(CountingClient::default(), config(1).with_use_queue(true));
        sender.enqueue(item(0)).await;
        assert_eq!(1, sender.client().requests.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn config_is_reread_on_flush() {
        let shared = Arc::new(std::sync::RwLock::new(Config::default().with_buffer_limit(1)));
        let mut sender = TelemetrySender::new(CountingClient::default(), Arc::clone(&shared));

        sender.enqueue(item(0)).await;
        assert_eq!(0, sender.client().requests.load(Ordering::SeqCst));

        shared.write().unwrap().connection_string = "InstrumentationKey=ABC".into();
        sender.enqueue(item(1)).await;
        assert_eq!(1, sender.client().requests.load(Ordering::SeqCst));
    }
}
