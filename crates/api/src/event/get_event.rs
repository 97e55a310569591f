use crate::{error::CalendarError, shared::usecase::UseCase};
use calendar_reminders_domain::{Event, ID};
use calendar_reminders_infra::{CalendarContext, EventRepoError};
use tracing::error;

#[derive(Debug)]
pub struct GetEventUseCase {
    pub event_id: ID,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFound(ID),
    StorageError,
}

impl From<UseCaseError> for CalendarError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound(event_id) => Self::NotFound(event_id),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait]
impl UseCase for GetEventUseCase {
    type Response = Event;

    type Error = UseCaseError;

    const NAME: &'static str = "GetEvent";

    async fn execute(&mut self, ctx: &CalendarContext) -> Result<Self::Response, Self::Error> {
        ctx.repos
            .events
            .find(&self.event_id)
            .await
            .map_err(|e| match e {
                EventRepoError::NotFound => UseCaseError::NotFound(self.event_id),
                e => {
                    error!("Unable to read event: {:?}", e);
                    UseCaseError::StorageError
                }
            })
    }
}
