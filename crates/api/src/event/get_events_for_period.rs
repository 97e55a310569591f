use crate::{error::CalendarError, shared::usecase::UseCase};
use calendar_reminders_domain::{start_of_day, start_of_month, start_of_next_month, Event};
use calendar_reminders_infra::CalendarContext;
use chrono::{DateTime, Duration, Utc};
use tracing::error;

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

async fn events_between(
    ctx: &CalendarContext,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Event>, UseCaseError> {
    ctx.repos
        .events
        .find_by_period(start, end)
        .await
        .map_err(|e| {
            error!("Unable to read events between {} and {}: {:?}", start, end, e);
            UseCaseError::StorageError
        })
}

/// Events of the UTC day `day` falls on
#[derive(Debug)]
pub struct GetDayEventsUseCase {
    pub day: DateTime<Utc>,
}

#[async_trait::async_trait]
impl UseCase for GetDayEventsUseCase {
    type Response = Vec<Event>;

    type Error = UseCaseError;

    const NAME: &'static str = "GetDayEvents";

    async fn execute(&mut self, ctx: &CalendarContext) -> Result<Self::Response, Self::Error> {
        let start = start_of_day(self.day);
        events_between(ctx, start, start + Duration::days(1)).await
    }
}

/// Events of the seven days starting at the day of `week_start`
#[derive(Debug)]
pub struct GetWeekEventsUseCase {
    pub week_start: DateTime<Utc>,
}

#[async_trait::async_trait]
impl UseCase for GetWeekEventsUseCase {
    type Response = Vec<Event>;

    type Error = UseCaseError;

    const NAME: &'static str = "GetWeekEvents";

    async fn execute(&mut self, ctx: &CalendarContext) -> Result<Self::Response, Self::Error> {
        let start = start_of_day(self.week_start);
        events_between(ctx, start, start + Duration::days(7)).await
    }
}

/// Events of the calendar month `month_start` falls in
#[derive(Debug)]
pub struct GetMonthEventsUseCase {
    pub month_start: DateTime<Utc>,
}

#[async_trait::async_trait]
impl UseCase for GetMonthEventsUseCase {
    type Response = Vec<Event>;

    type Error = UseCaseError;

    const NAME: &'static str = "GetMonthEvents";

    async fn execute(&mut self, ctx: &CalendarContext) -> Result<Self::Response, Self::Error> {
        events_between(
            ctx,
            start_of_month(self.month_start),
            start_of_next_month(self.month_start),
        )
        .await
    }
}
