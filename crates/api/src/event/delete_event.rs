use crate::{error::CalendarError, shared::usecase::UseCase};
use calendar_reminders_domain::ID;
use calendar_reminders_infra::{CalendarContext, EventRepoError};
use tracing::error;

#[derive(Debug)]
pub struct DeleteEventUseCase {
    pub event_id: ID,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFound(ID),
    EventIsActive(ID),
    StorageError,
}

impl From<UseCaseError> for CalendarError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound(event_id) => Self::NotFound(event_id),
            UseCaseError::EventIsActive(event_id) => Self::EventIsActive(event_id),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

fn storage_error(e: EventRepoError, event_id: ID) -> UseCaseError {
    match e {
        EventRepoError::NotFound => UseCaseError::NotFound(event_id),
        e => {
            error!("Unable to delete event: {:?}", e);
            UseCaseError::StorageError
        }
    }
}

#[async_trait::async_trait]
impl UseCase for DeleteEventUseCase {
    type Response = ();

    type Error = UseCaseError;

    const NAME: &'static str = "DeleteEvent";

    async fn execute(&mut self, ctx: &CalendarContext) -> Result<Self::Response, Self::Error> {
        let event = ctx
            .repos
            .events
            .find(&self.event_id)
            .await
            .map_err(|e| storage_error(e, self.event_id))?;

        if event.is_active(ctx.sys.now()) {
            return Err(UseCaseError::EventIsActive(event.id));
        }

        ctx.repos
            .events
            .delete(&event.id)
            .await
            .map_err(|e| storage_error(e, event.id))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::event::test_utils::{insert_event, setup};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 5, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn deletes_inactive_event() {
        let ctx = setup(now());
        let future = insert_event(&ctx, now() + Duration::minutes(1), now()).await;
        let past = insert_event(&ctx, now() - Duration::minutes(1), now()).await;

        for id in [future, past] {
            let mut usecase = DeleteEventUseCase { event_id: id };
            assert!(usecase.execute(&ctx).await.is_ok());
            assert!(ctx.repos.events.find(&id).await.is_err());

            let mut usecase = DeleteEventUseCase { event_id: id };
            assert_eq!(
                usecase.execute(&ctx).await.unwrap_err(),
                UseCaseError::NotFound(id)
            );
        }
    }

    #[tokio::test]
    async fn keeps_active_event() {
        let ctx = setup(now());
        let id = insert_event(&ctx, now() - Duration::seconds(29), now()).await;

        let mut usecase = DeleteEventUseCase { event_id: id };
        assert_eq!(
            usecase.execute(&ctx).await.unwrap_err(),
            UseCaseError::EventIsActive(id)
        );
        assert!(ctx.repos.events.find(&id).await.is_ok());
    }
}
