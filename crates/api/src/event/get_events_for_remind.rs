use crate::{error::CalendarError, shared::usecase::UseCase};
use calendar_reminders_domain::Event;
use calendar_reminders_infra::CalendarContext;
use tracing::error;

/// Events whose reminder is due and not yet acknowledged
#[derive(Debug)]
pub struct GetEventsForRemindUseCase;

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
impl UseCase for GetEventsForRemindUseCase {
    type Response = Vec<Event>;

    type Error = UseCaseError;

    const NAME: &'static str = "GetEventsForRemind";

    async fn execute(&mut self, ctx: &CalendarContext) -> Result<Self::Response, Self::Error> {
        ctx.repos
            .events
            .find_for_remind(ctx.sys.now())
            .await
            .map_err(|e| {
                error!("Unable to look up due reminders: {:?}", e);
                UseCaseError::StorageError
            })
    }
}
