use super::broker::{Delivery, DeliveryAcker, IBroker, IBrokerSession};
use anyhow::{anyhow, bail};
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

struct MemoryQueue {
    sender: mpsc::UnboundedSender<Vec<u8>>,
    receiver: AsyncMutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    depth: AtomicUsize,
}

impl MemoryQueue {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: AsyncMutex::new(receiver),
            depth: AtomicUsize::new(0),
        }
    }

    fn push(&self, payload: Vec<u8>) -> anyhow::Result<()> {
        // Counted before sending so a fast consumer never takes the depth below zero
        self.depth.fetch_add(1, Ordering::SeqCst);
        self.sender.send(payload).map_err(|_| {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            anyhow!("queue receiver is gone")
        })
    }

    async fn pop(&self) -> Option<Vec<u8>> {
        let payload = self.receiver.lock().await.recv().await?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(payload)
    }
}

/// Puts a rejected message back at the end of its queue
struct Requeue {
    queue: Arc<MemoryQueue>,
    payload: Vec<u8>,
}

impl DeliveryAcker for Requeue {
    fn ack(self: Box<Self>) {}

    fn reject(self: Box<Self>) {
        let Requeue { queue, payload } = *self;
        if let Err(e) = queue.push(payload) {
            debug!("Unable to requeue rejected delivery: {:?}", e);
        }
    }
}

#[derive(Default)]
struct BrokerState {
    queues: Mutex<HashMap<String, Arc<MemoryQueue>>>,
    /// Cancelled when the broker goes away, which ends every session
    lost: CancellationToken,
}

/// In-process broker with work-queue semantics: every message published to a
/// queue is handed to exactly one of its consumers. Clones share the same
/// queues, so gateways of different services can meet on one instance.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<BrokerState>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages waiting in `queue` that no consumer has taken yet
    pub fn queue_depth(&self, queue: &str) -> usize {
        self.state
            .queues
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(queue)
            .map(|q| q.depth.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Simulates losing the broker: open sessions end and new connections
    /// are refused
    pub fn shut_down(&self) {
        self.state.lost.cancel();
    }
}

#[async_trait::async_trait]
impl IBroker for InMemoryBroker {
    async fn connect(&self, dsn: &str) -> anyhow::Result<Box<dyn IBrokerSession>> {
        let url = Url::parse(dsn)?;
        if !matches!(url.scheme(), "amqp" | "amqps") {
            bail!("unsupported broker scheme `{}`", url.scheme());
        }
        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => bail!("broker DSN is missing a host"),
        };
        if self.state.lost.is_cancelled() {
            bail!("broker at {} is unreachable", host);
        }

        Ok(Box::new(InMemorySession {
            state: self.state.clone(),
            closed: self.state.lost.child_token(),
        }))
    }
}

struct InMemorySession {
    state: Arc<BrokerState>,
    closed: CancellationToken,
}

impl InMemorySession {
    fn ensure_open(&self) -> anyhow::Result<()> {
        if self.closed.is_cancelled() {
            bail!("broker session is closed");
        }
        Ok(())
    }

    fn queue(&self, name: &str) -> anyhow::Result<Arc<MemoryQueue>> {
        self.ensure_open()?;
        self.state
            .queues
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("queue `{}` is not declared", name))
    }
}

#[async_trait::async_trait]
impl IBrokerSession for InMemorySession {
    async fn declare_queue(&self, name: &str) -> anyhow::Result<()> {
        self.ensure_open()?;
        self.state
            .queues
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryQueue::new()));
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> anyhow::Result<()> {
        self.queue(queue)?.push(payload.to_vec())
    }

    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> anyhow::Result<BoxStream<'static, Delivery>> {
        let memory_queue = self.queue(queue)?;
        debug!(queue, consumer_tag, "Consumer attached");

        let deliveries = stream::unfold(
            (memory_queue, self.closed.clone()),
            |(queue, closed)| async move {
                let payload = tokio::select! {
                    biased;
                    _ = closed.cancelled() => None,
                    payload = queue.pop() => payload,
                }?;
                let acker = Requeue {
                    queue: queue.clone(),
                    payload: payload.clone(),
                };
                Some((Delivery::new(payload, Box::new(acker)), (queue, closed)))
            },
        );
        Ok(deliveries.boxed())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.closed.cancel();
        Ok(())
    }
}
