mod telemetry;

use calendar_reminders_api::{Application, LogNotifier};
use calendar_reminders_infra::{run_migration, setup_context, AmqpBroker, BrokerKind, Config, IBroker};
use std::sync::Arc;
use telemetry::{get_subscriber, init_subscriber};
use tracing::info;

const USAGE: &str = "the commands are `scheduler`, `sender` and `migrate`, \
    without one the scheduler and the sender run together";

/// The scheduler and the sender only meet through a networked broker when
/// they run as separate processes
fn standalone_broker(config: &Config) -> anyhow::Result<Arc<dyn IBroker>> {
    match config.broker_kind.parse::<BrokerKind>()? {
        BrokerKind::Amqp => Ok(Arc::new(AmqpBroker::new())),
        BrokerKind::Memory => anyhow::bail!(
            "BROKER=memory cannot reach another process, set BROKER=amqp to run one side alone"
        ),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("calendar_reminders".into(), "info".into());
    init_subscriber(subscriber)?;

    let config = Config::new();

    let app = match std::env::args().nth(1).as_deref() {
        None => {
            let broker = config.broker_kind.parse::<BrokerKind>()?.create_broker();
            let context = setup_context(config).await?;
            Application::new(context, broker, Arc::new(LogNotifier)).await?
        }
        Some("scheduler") => {
            let broker = standalone_broker(&config)?;
            let context = setup_context(config).await?;
            Application::scheduler(context, broker).await?
        }
        Some("sender") => {
            let broker = standalone_broker(&config)?;
            Application::sender(&config, broker, Arc::new(LogNotifier)).await?
        }
        Some("migrate") => {
            run_migration(&config).await?;
            info!("Database migrations applied");
            return Ok(());
        }
        Some(command) => anyhow::bail!("Unknown command `{}`, {}", command, USAGE),
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    app.stop().await;

    Ok(())
}
