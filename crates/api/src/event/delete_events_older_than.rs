use crate::{error::CalendarError, shared::usecase::UseCase};
use calendar_reminders_infra::CalendarContext;
use chrono::{DateTime, Utc};
use tracing::error;

#[derive(Debug)]
pub struct DeleteEventsOlderThanUseCase {
    pub time: DateTime<Utc>,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    StorageError,
}

impl From<UseCaseError> for CalendarError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait]
impl UseCase for DeleteEventsOlderThanUseCase {
    /// Number of deleted events
    type Response = u64;

    type Error = UseCaseError;

    const NAME: &'static str = "DeleteEventsOlderThan";

    async fn execute(&mut self, ctx: &CalendarContext) -> Result<Self::Response, Self::Error> {
        ctx.repos
            .events
            .delete_older_than(self.time)
            .await
            .map_err(|e| {
                error!("Unable to delete events older than {}: {:?}", self.time, e);
                UseCaseError::StorageError
            })
    }
}
