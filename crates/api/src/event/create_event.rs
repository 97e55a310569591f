use crate::{error::CalendarError, shared::usecase::UseCase};
use calendar_reminders_domain::{EventData, ID};
use calendar_reminders_infra::{CalendarContext, EventRepoError};
use chrono::{DateTime, Utc};
use tracing::error;

#[derive(Debug)]
pub struct CreateEventUseCase {
    pub data: EventData,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    DateBusy(DateTime<Utc>),
    StorageError,
}

impl From<UseCaseError> for CalendarError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::DateBusy(date_time) => Self::DateBusy(date_time),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait]
impl UseCase for CreateEventUseCase {
    type Response = ID;

    type Error = UseCaseError;

    const NAME: &'static str = "CreateEvent";

    async fn execute(&mut self, ctx: &CalendarContext) -> Result<Self::Response, Self::Error> {
        match ctx.repos.events.find_by_time(self.data.date_time).await {
            Ok(_) => return Err(UseCaseError::DateBusy(self.data.date_time)),
            Err(EventRepoError::NotFound) => {}
            Err(e) => {
                error!("Unable to check the time slot: {:?}", e);
                return Err(UseCaseError::StorageError);
            }
        }

        // Someone may have taken the slot since the check above
        ctx.repos
            .events
            .insert(&self.data, ctx.sys.now())
            .await
            .map_err(|e| match e {
                EventRepoError::DateTaken(date_time) => UseCaseError::DateBusy(date_time),
                e => {
                    error!("Unable to store event: {:?}", e);
                    UseCaseError::StorageError
                }
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::event::test_utils::{event_data, setup};
    use chrono::{Duration, TimeZone};

    #[tokio::test]
    async fn creates_event() {
        let now = Utc.with_ymd_and_hms(2025, 12, 5, 12, 0, 0).unwrap();
        let ctx = setup(now);

        let mut usecase = CreateEventUseCase {
            data: event_data(now + Duration::hours(1)),
        };
        let id = usecase.execute(&ctx).await.expect("To create event");

        let event = ctx.repos.events.find(&id).await.expect("To find event");
        assert_eq!(event.date_time, now + Duration::hours(1));
        assert_eq!(event.created_at, now);
        assert_eq!(event.updated_at, now);
        assert!(event.remind_sent_time.is_none());
    }

    #[tokio::test]
    async fn rejects_busy_date() {
        let now = Utc.with_ymd_and_hms(2025, 12, 5, 12, 0, 0).unwrap();
        let ctx = setup(now);
        let date_time = now + Duration::hours(1);

        let mut usecase = CreateEventUseCase {
            data: event_data(date_time),
        };
        assert!(usecase.execute(&ctx).await.is_ok());

        let mut usecase = CreateEventUseCase {
            data: event_data(date_time),
        };
        let res = usecase.execute(&ctx).await;
        assert_eq!(res.unwrap_err(), UseCaseError::DateBusy(date_time));
        assert_eq!(ctx.repos.events.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_yield_one_event() {
        let now = Utc.with_ymd_and_hms(2025, 12, 5, 12, 0, 0).unwrap();
        let ctx = setup(now);
        let date_time = now + Duration::days(1);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                let mut usecase = CreateEventUseCase {
                    data: event_data(date_time),
                };
                usecase.execute(&ctx).await
            }));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(e) => assert_eq!(e, UseCaseError::DateBusy(date_time)),
            }
        }
        assert_eq!(created, 1);
    }
}
