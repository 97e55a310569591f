use crate::{error::CalendarError, shared::usecase::UseCase};
use calendar_reminders_domain::{Event, EventData, ID};
use calendar_reminders_infra::{CalendarContext, EventRepoError};
use chrono::{DateTime, Utc};
use tracing::error;

/// Replaces every user editable field of an existing event
#[derive(Debug)]
pub struct UpdateEventUseCase {
    pub event_id: ID,
    pub data: EventData,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFound(ID),
    EventIsActive(ID),
    DateBusy(DateTime<Utc>),
    StorageError,
}

impl From<UseCaseError> for CalendarError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound(event_id) => Self::NotFound(event_id),
            UseCaseError::EventIsActive(event_id) => Self::EventIsActive(event_id),
            UseCaseError::DateBusy(date_time) => Self::DateBusy(date_time),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait]
impl UseCase for UpdateEventUseCase {
    type Response = Event;

    type Error = UseCaseError;

    const NAME: &'static str = "UpdateEvent";

    async fn execute(&mut self, ctx: &CalendarContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.now();
        let mut event = match ctx.repos.events.find(&self.event_id).await {
            Ok(event) => event,
            Err(EventRepoError::NotFound) => return Err(UseCaseError::NotFound(self.event_id)),
            Err(e) => {
                error!("Unable to read event: {:?}", e);
                return Err(UseCaseError::StorageError);
            }
        };

        if event.is_active(now) {
            return Err(UseCaseError::EventIsActive(event.id));
        }

        match ctx.repos.events.find_by_time(self.data.date_time).await {
            Ok(other) if other.id != event.id => {
                return Err(UseCaseError::DateBusy(self.data.date_time))
            }
            Ok(_) | Err(EventRepoError::NotFound) => {}
            Err(e) => {
                error!("Unable to check the time slot: {:?}", e);
                return Err(UseCaseError::StorageError);
            }
        }

        event.apply(self.data.clone(), now);

        ctx.repos.events.save(&event).await.map_err(|e| match e {
            EventRepoError::NotFound => UseCaseError::NotFound(event.id),
            EventRepoError::DateTaken(date_time) => UseCaseError::DateBusy(date_time),
            e => {
                error!("Unable to save event: {:?}", e);
                UseCaseError::StorageError
            }
        })?;

        Ok(event)
    }
}
