use calendar_reminders_api::{Application, INotifier};
use calendar_reminders_domain::EventMsg;
use calendar_reminders_infra::{CalendarContext, InMemoryBroker};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Notifier that keeps every reminder it delivers
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<EventMsg>>,
}

#[async_trait::async_trait]
impl INotifier for RecordingNotifier {
    async fn notify(&self, msg: &EventMsg) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(msg.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub ctx: CalendarContext,
    pub broker: InMemoryBroker,
    pub notifier: Arc<RecordingNotifier>,
    pub application: Application,
}

/// In-memory context with a fast polling scheduler
pub fn test_context() -> CalendarContext {
    let mut ctx = CalendarContext::create_inmemory();
    ctx.config.scheduler.queue = "scheduler".into();
    ctx.config.scheduler.period = Duration::from_millis(50);
    ctx.config.shutdown_timeout = Duration::from_secs(1);
    ctx
}

// Launch the whole reminder pipeline as background tasks
pub async fn spawn_app() -> TestApp {
    let ctx = test_context();
    let broker = InMemoryBroker::new();
    let notifier = Arc::new(RecordingNotifier::default());

    let application = Application::new(ctx.clone(), Arc::new(broker.clone()), notifier.clone())
        .await
        .expect("Failed to build application.");

    TestApp {
        ctx,
        broker,
        notifier,
        application,
    }
}
