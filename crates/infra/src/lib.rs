mod config;
mod queue;
mod repos;
mod system;

pub use config::{BrokerConfig, Config, SchedulerConfig};
pub use queue::{
    AmqpBroker, BrokerKind, Delivery, DeliveryAcker, IBroker, IBrokerSession, InMemoryBroker,
    InvalidBrokerValue, QueueError, QueueHandle, QueueManager,
};
pub use repos::{
    EventRepoError, IEventRepo, InMemoryEventRepo, InvalidStorageValue, PostgresEventRepo, Repos,
    StorageKind,
};
use std::sync::Arc;
pub use system::{ISys, RealSys, StaticTimeSys};
use thiserror::Error;
use tracing::info;

#[derive(Clone)]
pub struct CalendarContext {
    pub repos: Repos,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error(transparent)]
    InvalidStorageValue(#[from] InvalidStorageValue),
    #[error("DATABASE_URL must be set when STORAGE is `db`")]
    MissingDatabaseUrl,
    #[error("unable to set up the database: {0:#}")]
    Database(anyhow::Error),
}

impl CalendarContext {
    pub fn create_inmemory() -> Self {
        Self {
            repos: Repos::create_inmemory(),
            config: Config::new(),
            sys: Arc::new(RealSys {}),
        }
    }
}

/// Will setup the infrastructure context given the config
pub async fn setup_context(config: Config) -> Result<CalendarContext, ContextError> {
    let repos = match config.storage.parse::<StorageKind>()? {
        StorageKind::Memory => {
            info!("Storing events in memory");
            Repos::create_inmemory()
        }
        StorageKind::Db => {
            let connection_string = config
                .database_url
                .as_deref()
                .ok_or(ContextError::MissingDatabaseUrl)?;
            Repos::create_postgres(connection_string)
                .await
                .map_err(ContextError::Database)?
        }
    };

    Ok(CalendarContext {
        repos,
        config,
        sys: Arc::new(RealSys {}),
    })
}

/// Brings the database schema up to date without starting anything else
pub async fn run_migration(config: &Config) -> Result<(), ContextError> {
    let connection_string = config
        .database_url
        .as_deref()
        .ok_or(ContextError::MissingDatabaseUrl)?;
    PostgresEventRepo::connect(connection_string)
        .await
        .map(|_| ())
        .map_err(ContextError::Database)
}
