mod error;
mod event;
mod job_schedulers;
mod sender;
mod shared;

pub use error::CalendarError;
pub use event::*;
pub use job_schedulers::{start_retention_sweep_job, sweep_old_events, ReminderScheduler};
pub use sender::{INotifier, LogNotifier, NotificationSender};
pub use shared::usecase::{execute, UseCase};

use calendar_reminders_infra::{CalendarContext, Config, IBroker, QueueError, QueueManager};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Runs the reminder pipeline, or one side of it. The scheduler side holds
/// the poll and acknowledgement loops and the retention sweep, the sender
/// side the notification sender. Each side owns its own gateway to the
/// broker.
pub struct Application {
    shutdown: CancellationToken,
    jobs: Vec<JoinHandle<()>>,
    gateways: Vec<QueueManager>,
    shutdown_timeout: Duration,
}

impl Application {
    /// Both sides in one process
    pub async fn new(
        context: CalendarContext,
        broker: Arc<dyn IBroker>,
        notifier: Arc<dyn INotifier>,
    ) -> Result<Self, QueueError> {
        let mut app = Self::idle(&context.config);
        let res = async {
            app.start_scheduler(context.clone(), broker.clone()).await?;
            app.start_sender(&context.config, broker, notifier).await
        }
        .await;
        app.launched(res, "Reminder pipeline").await
    }

    /// Only the scheduler side, the sender runs elsewhere
    pub async fn scheduler(
        context: CalendarContext,
        broker: Arc<dyn IBroker>,
    ) -> Result<Self, QueueError> {
        let mut app = Self::idle(&context.config);
        let res = app.start_scheduler(context, broker).await;
        app.launched(res, "Reminder scheduler").await
    }

    /// Only the sender side. It never touches storage.
    pub async fn sender(
        config: &Config,
        broker: Arc<dyn IBroker>,
        notifier: Arc<dyn INotifier>,
    ) -> Result<Self, QueueError> {
        let mut app = Self::idle(config);
        let res = app.start_sender(config, broker, notifier).await;
        app.launched(res, "Notification sender").await
    }

    fn idle(config: &Config) -> Self {
        Self {
            shutdown: CancellationToken::new(),
            jobs: Vec::new(),
            gateways: Vec::new(),
            shutdown_timeout: config.shutdown_timeout,
        }
    }

    async fn start_scheduler(
        &mut self,
        context: CalendarContext,
        broker: Arc<dyn IBroker>,
    ) -> Result<(), QueueError> {
        let queues = QueueManager::new(broker, context.config.broker.clone());
        queues.connect().await?;
        let scheduler = ReminderScheduler::new(context.clone(), &queues).await;
        self.gateways.push(queues);

        let jobs = scheduler?.start(self.shutdown.clone()).await?;
        self.jobs.extend(jobs);
        self.jobs.push(start_retention_sweep_job(context, self.shutdown.clone()));
        Ok(())
    }

    async fn start_sender(
        &mut self,
        config: &Config,
        broker: Arc<dyn IBroker>,
        notifier: Arc<dyn INotifier>,
    ) -> Result<(), QueueError> {
        let queues = QueueManager::new(broker, config.broker.clone());
        queues.connect().await?;
        let sender = NotificationSender::new(&config.scheduler, &queues, notifier).await;
        self.gateways.push(queues);

        let job = sender?.start(self.shutdown.clone()).await?;
        self.jobs.push(job);
        Ok(())
    }

    /// Whatever already runs is stopped again when a later step failed
    async fn launched(self, res: Result<(), QueueError>, what: &str) -> Result<Self, QueueError> {
        match res {
            Ok(()) => {
                info!("{} started", what);
                Ok(self)
            }
            Err(e) => {
                self.stop().await;
                Err(e)
            }
        }
    }

    /// Token that stops every job when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stops the jobs, waiting at most the shutdown timeout for them before
    /// aborting the rest, and closes the broker sessions
    pub async fn stop(self) {
        self.shutdown.cancel();

        // A timeout too long to be represented means waiting for the jobs
        let deadline = tokio::time::Instant::now().checked_add(self.shutdown_timeout);
        for mut job in self.jobs {
            let stopped = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, &mut job).await.is_ok(),
                None => {
                    let _ = (&mut job).await;
                    true
                }
            };
            if !stopped {
                warn!("Job did not stop within the shutdown timeout, aborting it");
                job.abort();
            }
        }

        for gateway in self.gateways {
            if let Err(e) = gateway.close().await {
                warn!("Error closing broker gateway: {:?}", e);
            }
        }
        info!("Reminder pipeline stopped");
    }
}
