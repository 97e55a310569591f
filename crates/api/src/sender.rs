use calendar_reminders_domain::EventMsg;
use calendar_reminders_infra::{Delivery, QueueError, QueueHandle, QueueManager, SchedulerConfig};
use futures::{stream::BoxStream, StreamExt};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Delivers a reminder to the user
#[async_trait::async_trait]
pub trait INotifier: Send + Sync {
    async fn notify(&self, msg: &EventMsg) -> anyhow::Result<()>;
}

/// Notifier that only writes the reminder to the log
pub struct LogNotifier;

#[async_trait::async_trait]
impl INotifier for LogNotifier {
    async fn notify(&self, msg: &EventMsg) -> anyhow::Result<()> {
        info!(
            event_id = %msg.id,
            "Sending reminder about \"{}\" event to #{} user. Event time: {}.",
            msg.title,
            msg.user_id,
            msg.date_time.to_rfc2822()
        );
        Ok(())
    }
}

/// Consumes pending reminders, notifies the user and acknowledges every
/// delivered reminder back to the scheduler
pub struct NotificationSender {
    notifier: Arc<dyn INotifier>,
    pending: QueueHandle,
    acks: QueueHandle,
}

impl NotificationSender {
    pub async fn new(
        config: &SchedulerConfig,
        queues: &QueueManager,
        notifier: Arc<dyn INotifier>,
    ) -> Result<Self, QueueError> {
        let pending = queues.create_queue(&config.queue).await.map_err(|e| {
            error!("Error declaring scheduler queue: {:?}", e);
            e
        })?;
        let acks = queues.create_queue(&config.ack_queue()).await.map_err(|e| {
            error!("Error declaring scheduler ack queue: {:?}", e);
            e
        })?;

        Ok(Self {
            notifier,
            pending,
            acks,
        })
    }

    /// Subscribes to the pending queue and spawns the consume loop, which
    /// stops when `shutdown` is cancelled or the stream ends
    pub async fn start(self, shutdown: CancellationToken) -> Result<JoinHandle<()>, QueueError> {
        let deliveries = self.pending.consume().await.map_err(|e| {
            error!("Error registering reminder consumer: {:?}", e);
            e
        })?;
        Ok(tokio::spawn(self.run(deliveries, shutdown)))
    }

    async fn run(self, mut deliveries: BoxStream<'static, Delivery>, shutdown: CancellationToken) {
        info!("Waiting for reminders...");
        loop {
            let delivery = tokio::select! {
                _ = shutdown.cancelled() => break,
                delivery = deliveries.next() => delivery,
            };
            let Some(delivery) = delivery else {
                warn!("Reminder stream ended");
                break;
            };
            self.handle(delivery.payload()).await;
            // A failed reminder is discarded here, the event stays unmarked
            // and the next poll publishes it again
            delivery.ack();
        }
        info!("Notification sender stopped");
    }

    /// Notifies about a single pending reminder and forwards it to the
    /// acknowledgement queue. Returns whether it was forwarded.
    pub async fn handle(&self, payload: &[u8]) -> bool {
        let msg = match EventMsg::from_bytes(payload) {
            Ok(msg) => msg,
            Err(e) => {
                error!("Error reading reminder: {:?}", e);
                return false;
            }
        };

        if let Err(e) = self.notifier.notify(&msg).await {
            error!(event_id = %msg.id, "Error sending reminder: {:?}", e);
            return false;
        }

        if let Err(e) = self.acks.produce(payload).await {
            error!(event_id = %msg.id, "Error acknowledging reminder: {:?}", e);
            return false;
        }
        true
    }
}
