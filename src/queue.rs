use crate::{uploader::send_batch, ConfigSource, TelemetryItem};
use opentelemetry_http::HttpClient;
use std::{fmt::Debug, sync::Arc};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::debug;

/// Asynchronous delivery path for flushed batches.
///
/// The queue takes ownership of the batch. There is no way to observe or await the outcome; the
/// queue is responsible for eventually sending it with [`send_batch`](crate::send_batch).
pub trait DeliveryQueue: Debug + Send + Sync {
    /// Hand off a batch.
    fn push(&self, batch: Vec<TelemetryItem>);
}

/// [`DeliveryQueue`] backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelQueue {
    sender: mpsc::UnboundedSender<Vec<TelemetryItem>>,
}

impl ChannelQueue {
    /// Create a queue and the receiving end a worker drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Vec<TelemetryItem>>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl DeliveryQueue for ChannelQueue {
    fn push(&self, batch: Vec<TelemetryItem>) {
        if let Err(err) = self.sender.send(batch) {
            debug!(
                "Telemetry delivery worker is gone; dropping {} items",
                err.0.len()
            );
        }
    }
}

/// Spawn a tokio task that sends every batch pushed to the returned queue.
///
/// Configuration is read from `config` once per batch. The task ends after all clones of the
/// queue have been dropped and the remaining batches are sent.
pub fn spawn_delivery_worker<C, S>(client: Arc<C>, config: S) -> (ChannelQueue, JoinHandle<()>)
where
    C: HttpClient + 'static,
    S: ConfigSource + 'static,
{
    let (queue, mut receiver) = ChannelQueue::channel();
    let handle = tokio::spawn(async move {
        while let Some(batch) = receiver.recv().await {
            send_batch(client.as_ref(), &config.config(), batch).await;
        }
    });
    (queue, handle)
}
