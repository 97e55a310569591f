mod amqp;
mod broker;
mod inmemory;

use crate::config::BrokerConfig;
pub use amqp::AmqpBroker;
pub use broker::{Delivery, DeliveryAcker, IBroker, IBrokerSession};
use calendar_reminders_utils::create_consumer_tag;
use futures::stream::BoxStream;
pub use inmemory::InMemoryBroker;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("the queue gateway is not connected to a broker")]
    NotConnected,
    #[error("`{0}` is already connected")]
    AlreadyConnected(String),
    #[error("unable to connect to the broker: {0:#}")]
    Connection(anyhow::Error),
    #[error("broker operation failed: {0:#}")]
    Broker(anyhow::Error),
}

/// Which transport carries the queues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerKind {
    /// Only reaches gateways of the same process
    Memory,
    Amqp,
}

#[derive(Debug, Error)]
#[error("invalid broker value in config: `{0}`, expected `memory` or `amqp`")]
pub struct InvalidBrokerValue(pub String);

impl FromStr for BrokerKind {
    type Err = InvalidBrokerValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "amqp" => Ok(Self::Amqp),
            other => Err(InvalidBrokerValue(other.to_string())),
        }
    }
}

impl BrokerKind {
    pub fn create_broker(self) -> Arc<dyn IBroker> {
        match self {
            Self::Memory => Arc::new(InMemoryBroker::new()),
            Self::Amqp => Arc::new(AmqpBroker::new()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Gateway to the message broker. Queues are addressed by name and every
/// name can be declared once per connection.
pub struct QueueManager {
    broker: Arc<dyn IBroker>,
    config: BrokerConfig,
    session: Mutex<Option<Arc<dyn IBrokerSession>>>,
    queues: Mutex<HashSet<String>>,
}

impl QueueManager {
    pub fn new(broker: Arc<dyn IBroker>, config: BrokerConfig) -> Self {
        Self {
            broker,
            config,
            session: Mutex::new(None),
            queues: Mutex::new(HashSet::new()),
        }
    }

    fn current_session(&self) -> Option<Arc<dyn IBrokerSession>> {
        lock(&self.session).clone()
    }

    /// Opens the broker session. A failure is returned as is, retrying is
    /// left to the caller.
    pub async fn connect(&self) -> Result<(), QueueError> {
        if self.current_session().is_some() {
            return Err(QueueError::AlreadyConnected("broker session".into()));
        }
        let session = self
            .broker
            .connect(&self.config.connection_string())
            .await
            .map_err(QueueError::Connection)?;
        info!(
            host = %self.config.host,
            port = self.config.port,
            "Connected to message broker"
        );
        *lock(&self.session) = Some(Arc::from(session));
        Ok(())
    }

    /// Declares `name` on the broker and returns a handle to it
    pub async fn create_queue(&self, name: &str) -> Result<QueueHandle, QueueError> {
        let session = self.current_session().ok_or(QueueError::NotConnected)?;
        if !lock(&self.queues).insert(name.to_string()) {
            return Err(QueueError::AlreadyConnected(name.to_string()));
        }
        if let Err(e) = session.declare_queue(name).await {
            lock(&self.queues).remove(name);
            return Err(QueueError::Broker(e));
        }
        Ok(QueueHandle {
            name: name.to_string(),
            session,
        })
    }

    /// Closes the session and forgets every declared queue
    pub async fn close(&self) -> Result<(), QueueError> {
        let session = lock(&self.session).take().ok_or(QueueError::NotConnected)?;
        lock(&self.queues).clear();
        if let Err(e) = session.close().await {
            warn!("Closing the broker session failed: {:?}", e);
            return Err(QueueError::Broker(e));
        }
        Ok(())
    }
}

/// A declared queue
#[derive(Clone)]
pub struct QueueHandle {
    name: String,
    session: Arc<dyn IBrokerSession>,
}

impl QueueHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Publishes `payload`. Nothing is kept locally when the broker refuses it.
    pub async fn produce(&self, payload: &[u8]) -> Result<(), QueueError> {
        self.session
            .publish(&self.name, payload)
            .await
            .map_err(QueueError::Broker)
    }

    /// Stream of deliveries that only ends when the session does
    pub async fn consume(&self) -> Result<BoxStream<'static, Delivery>, QueueError> {
        let consumer_tag = create_consumer_tag(&self.name);
        self.session
            .consume(&self.name, &consumer_tag)
            .await
            .map_err(QueueError::Broker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;
    use tokio::time::timeout;

    fn broker_config() -> BrokerConfig {
        BrokerConfig {
            host: "localhost".into(),
            port: 5672,
            login: "guest".into(),
            password: "guest".into(),
        }
    }

    async fn connected(broker: &InMemoryBroker) -> QueueManager {
        let manager = QueueManager::new(Arc::new(broker.clone()), broker_config());
        manager.connect().await.expect("To connect");
        manager
    }

    async fn next(stream: &mut BoxStream<'static, Delivery>) -> Option<Delivery> {
        timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("Delivery to arrive in time")
    }

    #[tokio::test]
    async fn queues_need_a_connection_and_unique_names() {
        let broker = InMemoryBroker::new();
        let manager = QueueManager::new(Arc::new(broker.clone()), broker_config());
        assert!(matches!(
            manager.create_queue("scheduler").await,
            Err(QueueError::NotConnected)
        ));

        manager.connect().await.expect("To connect");
        assert!(matches!(
            manager.connect().await,
            Err(QueueError::AlreadyConnected(_))
        ));

        let queue = manager.create_queue("scheduler").await.expect("To create");
        assert_eq!(queue.name(), "scheduler");
        assert!(matches!(
            manager.create_queue("scheduler").await,
            Err(QueueError::AlreadyConnected(name)) if name == "scheduler"
        ));

        // A new connection starts with a clean slate
        manager.close().await.expect("To close");
        manager.connect().await.expect("To reconnect");
        assert!(manager.create_queue("scheduler").await.is_ok());
    }

    #[tokio::test]
    async fn connection_failures_are_reported() {
        let broker = InMemoryBroker::new();
        let mut config = broker_config();
        config.host = String::new();
        let manager = QueueManager::new(Arc::new(broker.clone()), config);
        assert!(matches!(
            manager.connect().await,
            Err(QueueError::Connection(_))
        ));

        broker.shut_down();
        let manager = QueueManager::new(Arc::new(broker), broker_config());
        assert!(matches!(
            manager.connect().await,
            Err(QueueError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn messages_cross_between_managers() {
        let broker = InMemoryBroker::new();
        let producer = connected(&broker).await;
        let consumer = connected(&broker).await;

        let out = producer.create_queue("scheduler").await.unwrap();
        let inbox = consumer.create_queue("scheduler").await.unwrap();

        out.produce(b"first").await.expect("To produce");
        out.produce(b"second").await.expect("To produce");
        assert_eq!(broker.queue_depth("scheduler"), 2);

        let mut deliveries = inbox.consume().await.expect("To consume");
        let first = next(&mut deliveries).await.unwrap();
        assert_eq!(first.payload(), b"first");
        first.ack();
        let second = next(&mut deliveries).await.unwrap();
        assert_eq!(second.payload(), b"second");
        second.ack();
        assert_eq!(broker.queue_depth("scheduler"), 0);
    }

    #[tokio::test]
    async fn unacked_deliveries_are_redelivered() {
        let broker = InMemoryBroker::new();
        let manager = connected(&broker).await;
        let queue = manager.create_queue("scheduler").await.unwrap();
        queue.produce(b"reminder").await.unwrap();

        let mut deliveries = queue.consume().await.unwrap();
        let lost = next(&mut deliveries).await.unwrap();
        drop(lost);
        assert_eq!(broker.queue_depth("scheduler"), 1);

        let again = next(&mut deliveries).await.unwrap();
        assert_eq!(again.payload(), b"reminder");
        again.ack();
        assert_eq!(broker.queue_depth("scheduler"), 0);
    }

    #[tokio::test]
    async fn closing_ends_consumption() {
        let broker = InMemoryBroker::new();
        let manager = connected(&broker).await;
        let queue = manager.create_queue("scheduler").await.unwrap();
        let mut deliveries = queue.consume().await.unwrap();

        manager.close().await.expect("To close");
        assert!(next(&mut deliveries).await.is_none());
        assert!(matches!(
            queue.produce(b"late").await,
            Err(QueueError::Broker(_))
        ));
        assert!(matches!(manager.close().await, Err(QueueError::NotConnected)));
    }

    #[tokio::test]
    async fn losing_the_broker_ends_consumption() {
        let broker = InMemoryBroker::new();
        let manager = connected(&broker).await;
        let queue = manager.create_queue("scheduler").await.unwrap();
        let mut deliveries = queue.consume().await.unwrap();

        broker.shut_down();
        assert!(next(&mut deliveries).await.is_none());
    }

    #[test]
    fn it_parses_broker_kind() {
        assert_eq!("memory".parse::<BrokerKind>().unwrap(), BrokerKind::Memory);
        assert_eq!("amqp".parse::<BrokerKind>().unwrap(), BrokerKind::Amqp);
        let err = "kafka".parse::<BrokerKind>().unwrap_err();
        assert_eq!(err.0, "kafka");
    }
}
