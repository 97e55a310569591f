mod event;
mod shared;

pub use event::{EventRepoError, IEventRepo, InMemoryEventRepo, PostgresEventRepo};
use std::{str::FromStr, sync::Arc};
use thiserror::Error;
use tracing::info;

/// Which backend holds the events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Db,
}

#[derive(Debug, Error)]
#[error("invalid storage value in config: `{0}`, expected `memory` or `db`")]
pub struct InvalidStorageValue(pub String);

impl FromStr for StorageKind {
    type Err = InvalidStorageValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "db" => Ok(Self::Db),
            other => Err(InvalidStorageValue(other.to_string())),
        }
    }
}

#[derive(Clone)]
pub struct Repos {
    pub events: Arc<dyn IEventRepo>,
}

impl Repos {
    pub async fn create_postgres(connection_string: &str) -> anyhow::Result<Self> {
        info!("DB CHECKING CONNECTION ...");
        let events = PostgresEventRepo::connect(connection_string).await?;
        info!("DB CHECKING CONNECTION ... [done]");
        Ok(Self {
            events: Arc::new(events),
        })
    }

    pub fn create_inmemory() -> Self {
        Self {
            events: Arc::new(InMemoryEventRepo::new()),
        }
    }
}
