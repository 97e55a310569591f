use super::{EventRepoError, IEventRepo};
use crate::repos::shared::inmemory_repo::*;
use calendar_reminders_domain::{Event, EventData, ID};
use chrono::{DateTime, Utc};

pub struct InMemoryEventRepo {
    events: Collection<Event>,
}

impl InMemoryEventRepo {
    pub fn new() -> Self {
        Self {
            events: Default::default(),
        }
    }
}

impl Default for InMemoryEventRepo {
    fn default() -> Self {
        Self::new()
    }
}

fn same_slot(a: &Event, b: &Event) -> bool {
    a.date_time == b.date_time
}

fn sorted(mut events: Vec<Event>) -> Vec<Event> {
    events.sort_by_key(|e| e.date_time);
    events
}

#[async_trait::async_trait]
impl IEventRepo for InMemoryEventRepo {
    async fn insert(&self, data: &EventData, now: DateTime<Utc>) -> Result<ID, EventRepoError> {
        let event = Event::create(ID::new(), data.clone(), now);
        insert_unless(&event, &self.events, same_slot)
            .map_err(|_| EventRepoError::DateTaken(event.date_time))?;
        Ok(event.id)
    }

    async fn save(&self, e: &Event) -> Result<(), EventRepoError> {
        let keep_reminder_state = |stored: &Event, replacement: &mut Event| {
            replacement.remind_sent_time = stored.remind_sent_time;
        };
        replace_unless(e, &self.events, same_slot, keep_reminder_state).map_err(|err| {
            match err {
                WriteError::NotFound => EventRepoError::NotFound,
                WriteError::Conflict => EventRepoError::DateTaken(e.date_time),
            }
        })
    }

    async fn delete(&self, event_id: &ID) -> Result<(), EventRepoError> {
        delete(event_id, &self.events)
            .map(|_| ())
            .ok_or(EventRepoError::NotFound)
    }

    async fn find(&self, event_id: &ID) -> Result<Event, EventRepoError> {
        find(event_id, &self.events).ok_or(EventRepoError::NotFound)
    }

    async fn find_all(&self) -> Result<Vec<Event>, EventRepoError> {
        Ok(sorted(find_by(&self.events, |_| true)))
    }

    async fn find_by_period(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>, EventRepoError> {
        let events = find_by(&self.events, |e| start <= e.date_time && e.date_time < end);
        Ok(sorted(events))
    }

    async fn find_by_time(&self, date_time: DateTime<Utc>) -> Result<Event, EventRepoError> {
        find_one_by(&self.events, |e| e.date_time == date_time).ok_or(EventRepoError::NotFound)
    }

    async fn find_for_remind(&self, now: DateTime<Utc>) -> Result<Vec<Event>, EventRepoError> {
        Ok(sorted(find_by(&self.events, |e| e.is_due_for_reminder(now))))
    }

    async fn mark_as_reminded(
        &self,
        event_id: &ID,
        at: DateTime<Utc>,
    ) -> Result<(), EventRepoError> {
        update(event_id, &self.events, |e| {
            if e.remind_sent_time.is_none() {
                e.remind_sent_time = Some(at);
            }
        });
        Ok(())
    }

    async fn delete_older_than(&self, time: DateTime<Utc>) -> Result<u64, EventRepoError> {
        Ok(delete_by(&self.events, |e| e.date_time < time))
    }
}
