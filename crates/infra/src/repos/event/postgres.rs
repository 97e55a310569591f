use super::{EventRepoError, IEventRepo};
use calendar_reminders_domain::{Event, EventData, ID};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Uuid, FromRow, PgPool};
use tracing::error;

const UNIQUE_VIOLATION: &str = "23505";

pub struct PostgresEventRepo {
    pool: PgPool,
}

impl PostgresEventRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool against `connection_string` and brings the schema up
    /// to date
    pub async fn connect(connection_string: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await?;
        sqlx::migrate!().run(&pool).await?;
        Ok(Self::new(pool))
    }
}

#[derive(Debug, FromRow)]
struct EventRaw {
    event_uid: Uuid,
    user_id: i64,
    title: String,
    description: String,
    date_time: DateTime<Utc>,
    duration: String,
    remind_time: DateTime<Utc>,
    remind_sent_time: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EventRaw> for Event {
    fn from(e: EventRaw) -> Self {
        Self {
            id: e.event_uid.into(),
            user_id: e.user_id,
            title: e.title,
            description: e.description,
            date_time: e.date_time,
            duration: e.duration,
            remind_time: e.remind_time,
            remind_sent_time: e.remind_sent_time,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

const SELECT_EVENTS: &str = r#"
    SELECT event_uid, user_id, title, description, date_time, duration,
        remind_time, remind_sent_time, created_at, updated_at
    FROM events
"#;

fn storage_error(e: sqlx::Error) -> EventRepoError {
    error!("Postgres event repo failure: {:?}", e);
    EventRepoError::Storage(e.into())
}

/// A write that lost the race for `date_time` surfaces as a unique violation
fn write_error(e: sqlx::Error, date_time: DateTime<Utc>) -> EventRepoError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return EventRepoError::DateTaken(date_time);
        }
    }
    storage_error(e)
}

#[async_trait::async_trait]
impl IEventRepo for PostgresEventRepo {
    async fn insert(&self, data: &EventData, now: DateTime<Utc>) -> Result<ID, EventRepoError> {
        let (event_uid,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO events(
                user_id,
                title,
                description,
                date_time,
                duration,
                remind_time,
                created_at,
                updated_at
            )
            VALUES($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING event_uid
            "#,
        )
        .bind(data.user_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.date_time)
        .bind(&data.duration)
        .bind(data.remind_time)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, data.date_time))?;

        Ok(event_uid.into())
    }

    async fn save(&self, e: &Event) -> Result<(), EventRepoError> {
        let res = sqlx::query(
            r#"
            UPDATE events SET
                user_id = $2,
                title = $3,
                description = $4,
                date_time = $5,
                duration = $6,
                remind_time = $7,
                created_at = $8,
                updated_at = $9
            WHERE event_uid = $1
            "#,
        )
        .bind(e.id.inner_ref())
        .bind(e.user_id)
        .bind(&e.title)
        .bind(&e.description)
        .bind(e.date_time)
        .bind(&e.duration)
        .bind(e.remind_time)
        .bind(e.created_at)
        .bind(e.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| write_error(err, e.date_time))?;

        if res.rows_affected() == 0 {
            return Err(EventRepoError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, event_id: &ID) -> Result<(), EventRepoError> {
        let res = sqlx::query("DELETE FROM events WHERE event_uid = $1")
            .bind(event_id.inner_ref())
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        if res.rows_affected() == 0 {
            return Err(EventRepoError::NotFound);
        }
        Ok(())
    }

    async fn find(&self, event_id: &ID) -> Result<Event, EventRepoError> {
        sqlx::query_as::<_, EventRaw>(&format!("{} WHERE event_uid = $1", SELECT_EVENTS))
            .bind(event_id.inner_ref())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?
            .map(Event::from)
            .ok_or(EventRepoError::NotFound)
    }

    async fn find_all(&self) -> Result<Vec<Event>, EventRepoError> {
        let events = sqlx::query_as::<_, EventRaw>(&format!("{} ORDER BY date_time", SELECT_EVENTS))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(events.into_iter().map(Event::from).collect())
    }

    async fn find_by_period(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>, EventRepoError> {
        let events = sqlx::query_as::<_, EventRaw>(&format!(
            "{} WHERE date_time >= $1 AND date_time < $2 ORDER BY date_time",
            SELECT_EVENTS
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(events.into_iter().map(Event::from).collect())
    }

    async fn find_by_time(&self, date_time: DateTime<Utc>) -> Result<Event, EventRepoError> {
        sqlx::query_as::<_, EventRaw>(&format!("{} WHERE date_time = $1", SELECT_EVENTS))
            .bind(date_time)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?
            .map(Event::from)
            .ok_or(EventRepoError::NotFound)
    }

    async fn find_for_remind(&self, now: DateTime<Utc>) -> Result<Vec<Event>, EventRepoError> {
        let events = sqlx::query_as::<_, EventRaw>(&format!(
            "{} WHERE remind_sent_time IS NULL AND remind_time <= $1 ORDER BY date_time",
            SELECT_EVENTS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(events.into_iter().map(Event::from).collect())
    }

    async fn mark_as_reminded(
        &self,
        event_id: &ID,
        at: DateTime<Utc>,
    ) -> Result<(), EventRepoError> {
        sqlx::query(
            r#"
            UPDATE events SET remind_sent_time = $2
            WHERE event_uid = $1 AND remind_sent_time IS NULL
            "#,
        )
        .bind(event_id.inner_ref())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn delete_older_than(&self, time: DateTime<Utc>) -> Result<u64, EventRepoError> {
        let res = sqlx::query("DELETE FROM events WHERE date_time < $1")
            .bind(time)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(res.rows_affected())
    }
}
