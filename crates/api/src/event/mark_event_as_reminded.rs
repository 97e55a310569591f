use crate::{error::CalendarError, shared::usecase::UseCase};
use calendar_reminders_domain::ID;
use calendar_reminders_infra::CalendarContext;
use tracing::error;

/// Records that the reminder of an event was delivered. Marking a missing
/// or an already marked event succeeds without changing anything.
#[derive(Debug)]
pub struct MarkEventAsRemindedUseCase {
    pub event_id: ID,
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
impl UseCase for MarkEventAsRemindedUseCase {
    type Response = ();

    type Error = UseCaseError;

    const NAME: &'static str = "MarkEventAsReminded";

    async fn execute(&mut self, ctx: &CalendarContext) -> Result<Self::Response, Self::Error> {
        ctx.repos
            .events
            .mark_as_reminded(&self.event_id, ctx.sys.now())
            .await
            .map_err(|e| {
                error!("Unable to mark event {} as reminded: {:?}", self.event_id, e);
                UseCaseError::StorageError
            })
    }
}
