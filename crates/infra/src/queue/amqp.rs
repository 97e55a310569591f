use super::broker::{Delivery, DeliveryAcker, IBroker, IBrokerSession};
use futures::{future, stream::BoxStream, Future, StreamExt};
use lapin::{
    acker::Acker,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
        QueueDeclareOptions,
    },
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use tracing::{debug, warn};

/// Broker reached over AMQP 0-9-1, e.g. RabbitMQ
#[derive(Debug, Clone, Copy, Default)]
pub struct AmqpBroker;

impl AmqpBroker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl IBroker for AmqpBroker {
    async fn connect(&self, dsn: &str) -> anyhow::Result<Box<dyn IBrokerSession>> {
        let connection = Connection::connect(dsn, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        Ok(Box::new(AmqpSession {
            connection,
            channel,
        }))
    }
}

struct AmqpSession {
    connection: Connection,
    channel: Channel,
}

#[async_trait::async_trait]
impl IBrokerSession for AmqpSession {
    async fn declare_queue(&self, name: &str) -> anyhow::Result<()> {
        self.channel
            .queue_declare(name, QueueDeclareOptions::default(), FieldTable::default())
            .await?;
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> anyhow::Result<()> {
        let properties = BasicProperties::default().with_content_type("application/json".into());
        self.channel
            .basic_publish("", queue, BasicPublishOptions::default(), payload, properties)
            .await?
            .await?;
        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> anyhow::Result<BoxStream<'static, Delivery>> {
        let consumer = self
            .channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        debug!(queue, consumer_tag, "Consumer attached");

        // The stream ends with the first consumer error, a closed channel
        // included
        let deliveries = consumer.scan((), |_, delivery| {
            future::ready(match delivery {
                Ok(delivery) => Some(Delivery::new(
                    delivery.data,
                    Box::new(AmqpAcker(delivery.acker)),
                )),
                Err(e) => {
                    warn!("AMQP consumer stopped: {:?}", e);
                    None
                }
            })
        });
        Ok(deliveries.boxed())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.channel.close(200, "Bye").await?;
        self.connection.close(200, "Bye").await?;
        Ok(())
    }
}

struct AmqpAcker(Acker);

/// Sends the settlement in the background. Without a runtime the message
/// stays unacknowledged and the broker requeues it once the channel closes.
fn settle<F, T>(action: &'static str, settlement: F)
where
    F: Future<Output = Result<T, lapin::Error>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(async move {
                if let Err(e) = settlement.await {
                    warn!("Unable to {} AMQP delivery: {:?}", action, e);
                }
            });
        }
        Err(_) => warn!("No runtime to {} AMQP delivery on", action),
    }
}

impl DeliveryAcker for AmqpAcker {
    fn ack(self: Box<Self>) {
        let acker = self.0;
        settle("ack", async move { acker.ack(BasicAckOptions::default()).await });
    }

    fn reject(self: Box<Self>) {
        let acker = self.0;
        let options = BasicNackOptions {
            requeue: true,
            ..Default::default()
        };
        settle("requeue", async move { acker.nack(options).await });
    }
}
