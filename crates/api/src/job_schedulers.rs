use crate::{
    event::{DeleteEventsOlderThanUseCase, GetEventsForRemindUseCase, MarkEventAsRemindedUseCase},
    shared::usecase::execute,
};
use calendar_reminders_domain::EventMsg;
use calendar_reminders_infra::{CalendarContext, Delivery, QueueError, QueueHandle, QueueManager};
use futures::{stream::BoxStream, StreamExt};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Publishes due reminders to the pending queue and marks events as
/// reminded once the sender acknowledges them.
pub struct ReminderScheduler {
    ctx: CalendarContext,
    pending: QueueHandle,
    acks: QueueHandle,
}

impl ReminderScheduler {
    /// Declares the pending and the acknowledgement queue
    pub async fn new(ctx: CalendarContext, queues: &QueueManager) -> Result<Self, QueueError> {
        let config = &ctx.config.scheduler;
        let pending = queues.create_queue(&config.queue).await.map_err(|e| {
            error!("Error declaring scheduler queue: {:?}", e);
            e
        })?;
        let acks = queues.create_queue(&config.ack_queue()).await.map_err(|e| {
            error!("Error declaring scheduler ack queue: {:?}", e);
            e
        })?;

        Ok(Self { ctx, pending, acks })
    }

    /// Subscribes to acknowledgements and spawns the poll and the ack loop.
    /// Both stop when `shutdown` is cancelled.
    pub async fn start(self, shutdown: CancellationToken) -> Result<Vec<JoinHandle<()>>, QueueError> {
        let acks = self.acks.consume().await.map_err(|e| {
            error!("Error registering ack consumer: {:?}", e);
            e
        })?;
        let scheduler = Arc::new(self);

        Ok(vec![
            tokio::spawn(scheduler.clone().poll_loop(shutdown.clone())),
            tokio::spawn(scheduler.ack_loop(acks, shutdown)),
        ])
    }

    async fn poll_loop(self: Arc<Self>, shutdown: CancellationToken) {
        let period = self.ctx.config.scheduler.period;
        let mut ticks = interval_at(Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticks.tick() => {
                    self.dispatch_due_reminders().await;
                }
            }
        }
        info!("Reminder scheduler stopped");
    }

    /// Runs a single poll. Every due event is published to the pending queue,
    /// an event that fails to publish stays due for the next poll. Returns
    /// the number of published reminders.
    pub async fn dispatch_due_reminders(&self) -> usize {
        let events = match execute(GetEventsForRemindUseCase, &self.ctx).await {
            Ok(events) => events,
            Err(_) => return 0,
        };
        if events.is_empty() {
            return 0;
        }

        let mut dispatched = 0;
        for event in events {
            let payload = match event.to_msg().to_bytes() {
                Ok(payload) => payload,
                Err(e) => {
                    error!(event_id = %event.id, "Error serializing reminder: {:?}", e);
                    continue;
                }
            };
            if let Err(e) = self.pending.produce(&payload).await {
                error!(event_id = %event.id, "Error publishing reminder: {:?}", e);
                continue;
            }
            info!(event_id = %event.id, "Reminder dispatched");
            dispatched += 1;
        }
        dispatched
    }

    async fn ack_loop(
        self: Arc<Self>,
        mut acks: BoxStream<'static, Delivery>,
        shutdown: CancellationToken,
    ) {
        loop {
            let delivery = tokio::select! {
                _ = shutdown.cancelled() => break,
                delivery = acks.next() => delivery,
            };
            let Some(delivery) = delivery else {
                warn!("Acknowledgement stream ended");
                break;
            };
            self.handle_ack(delivery.payload()).await;
            // Malformed and failed acknowledgements are dropped as well
            delivery.ack();
        }
        info!("Reminder acknowledgement consumer stopped");
    }

    async fn handle_ack(&self, payload: &[u8]) {
        let msg = match EventMsg::from_bytes(payload) {
            Ok(msg) => msg,
            Err(e) => {
                error!("Error reading acknowledgement: {:?}", e);
                return;
            }
        };
        let usecase = MarkEventAsRemindedUseCase { event_id: msg.id };
        if execute(usecase, &self.ctx).await.is_ok() {
            info!(event_id = %msg.id, "Event marked as reminded");
        }
    }
}

/// Deletes the events that took place more than the retention period ago.
/// Returns the number of deleted events, `None` when the sweep did not run.
pub async fn sweep_old_events(ctx: &CalendarContext) -> Option<u64> {
    let retention = match chrono::Duration::from_std(ctx.config.scheduler.retention_period) {
        Ok(retention) => retention,
        Err(_) => {
            warn!("Retention period is out of range, skipping sweep");
            return None;
        }
    };
    let Some(cutoff) = ctx.sys.now().checked_sub_signed(retention) else {
        warn!("Retention period reaches before the start of time, skipping sweep");
        return None;
    };

    let deleted = execute(DeleteEventsOlderThanUseCase { time: cutoff }, ctx)
        .await
        .ok()?;
    if deleted > 0 {
        info!(deleted, %cutoff, "Old events deleted");
    }
    Some(deleted)
}

pub fn start_retention_sweep_job(ctx: CalendarContext, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = interval(ctx.config.scheduler.retention_interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticks.tick() => {
                    sweep_old_events(&ctx).await;
                }
            }
        }
        info!("Retention sweep stopped");
    })
}
