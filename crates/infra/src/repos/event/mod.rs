mod inmemory;
mod postgres;

use calendar_reminders_domain::{Event, EventData, ID};
use chrono::{DateTime, Utc};
pub use inmemory::InMemoryEventRepo;
pub use postgres::PostgresEventRepo;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventRepoError {
    #[error("event not found")]
    NotFound,
    #[error("the time slot {0} is already taken by another event")]
    DateTaken(DateTime<Utc>),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Persistence contract for `Event`s.
///
/// Instants are always given by the caller so that every backend shares the
/// same clock.
#[async_trait::async_trait]
pub trait IEventRepo: Send + Sync {
    /// Stores a new event and returns the id assigned to it
    async fn insert(&self, data: &EventData, now: DateTime<Utc>) -> Result<ID, EventRepoError>;
    /// Replaces the stored event with the same id. The reminder state
    /// (`remind_sent_time`) belongs to `mark_as_reminded` and is never
    /// written here.
    async fn save(&self, e: &Event) -> Result<(), EventRepoError>;
    async fn delete(&self, event_id: &ID) -> Result<(), EventRepoError>;
    async fn find(&self, event_id: &ID) -> Result<Event, EventRepoError>;
    async fn find_all(&self) -> Result<Vec<Event>, EventRepoError>;
    /// Events with `start <= date_time < end`, ordered by `date_time`
    async fn find_by_period(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>, EventRepoError>;
    async fn find_by_time(&self, date_time: DateTime<Utc>) -> Result<Event, EventRepoError>;
    /// Events whose reminder is due at `now` and has not been sent yet
    async fn find_for_remind(&self, now: DateTime<Utc>) -> Result<Vec<Event>, EventRepoError>;
    /// Records that the reminder was delivered. Missing ids and events that
    /// are already marked are left untouched.
    async fn mark_as_reminded(&self, event_id: &ID, at: DateTime<Utc>)
        -> Result<(), EventRepoError>;
    /// Deletes every event with `date_time < time` and returns how many went
    async fn delete_older_than(&self, time: DateTime<Utc>) -> Result<u64, EventRepoError>;
}
