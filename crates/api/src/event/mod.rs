mod create_event;
mod delete_event;
mod delete_events_older_than;
mod get_event;
mod get_events_for_period;
mod get_events_for_remind;
mod mark_event_as_reminded;
mod update_event;

pub use create_event::CreateEventUseCase;
pub use delete_event::DeleteEventUseCase;
pub use delete_events_older_than::DeleteEventsOlderThanUseCase;
pub use get_event::GetEventUseCase;
pub use get_events_for_period::{GetDayEventsUseCase, GetMonthEventsUseCase, GetWeekEventsUseCase};
pub use get_events_for_remind::GetEventsForRemindUseCase;
pub use mark_event_as_reminded::MarkEventAsRemindedUseCase;
pub use update_event::UpdateEventUseCase;

#[cfg(test)]
pub(crate) mod test_utils {
    use calendar_reminders_domain::{EventData, ID};
    use calendar_reminders_infra::{CalendarContext, Config, Repos, StaticTimeSys};
    use chrono::{DateTime, Duration, Utc};
    use std::sync::Arc;

    /// In-memory context with the clock frozen at `now`
    pub fn setup(now: DateTime<Utc>) -> CalendarContext {
        CalendarContext {
            repos: Repos::create_inmemory(),
            config: Config::new(),
            sys: Arc::new(StaticTimeSys(now)),
        }
    }

    pub fn event_data(date_time: DateTime<Utc>) -> EventData {
        EventData {
            user_id: 1,
            title: "standup".into(),
            description: "daily standup".into(),
            date_time,
            duration: "00:15:00".into(),
            remind_time: date_time - Duration::minutes(10),
        }
    }

    pub async fn insert_event(
        ctx: &CalendarContext,
        date_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ID {
        ctx.repos
            .events
            .insert(&event_data(date_time), now)
            .await
            .expect("To insert event")
    }
}
