use calendar_reminders_domain::EventData;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;

pub fn event_data(date_time: DateTime<Utc>, remind_time: DateTime<Utc>) -> EventData {
    EventData {
        user_id: 7,
        title: "Quarterly review".into(),
        description: "Bring the numbers".into(),
        date_time,
        duration: "01:30:00".into(),
        remind_time,
    }
}

/// Polls `check` until it holds or a few seconds went by
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}
