use crate::{date::is_active, shared::entity::Entity, shared::entity::ID};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A calendar `Event` owned by a single user.
///
/// No two events may share the same `date_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: ID,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    /// When the event takes place
    pub date_time: DateTime<Utc>,
    /// Free form, never interpreted
    pub duration: String,
    /// No reminder is dispatched before this instant
    pub remind_time: DateTime<Utc>,
    /// Set once the reminder has been acknowledged as delivered, never cleared
    pub remind_sent_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Event {
    fn id(&self) -> &ID {
        &self.id
    }
}

impl Event {
    /// Builds the stored representation of `data`. The id is chosen by
    /// the storage backend on insert.
    pub fn create(id: ID, data: EventData, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: data.user_id,
            title: data.title,
            description: data.description,
            date_time: data.date_time,
            duration: data.duration,
            remind_time: data.remind_time,
            remind_sent_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces every user editable field. Identity, creation time and
    /// reminder bookkeeping survive the update.
    pub fn apply(&mut self, data: EventData, now: DateTime<Utc>) {
        self.user_id = data.user_id;
        self.title = data.title;
        self.description = data.description;
        self.date_time = data.date_time;
        self.duration = data.duration;
        self.remind_time = data.remind_time;
        self.updated_at = now;
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        is_active(self.date_time, now)
    }

    pub fn is_due_for_reminder(&self, now: DateTime<Utc>) -> bool {
        self.remind_sent_time.is_none() && self.remind_time <= now
    }

    pub fn to_msg(&self) -> EventMsg {
        EventMsg {
            id: self.id,
            user_id: self.user_id,
            title: self.title.clone(),
            date_time: self.date_time,
        }
    }
}

/// The user supplied part of an `Event`, used both for creating and
/// for fully replacing an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub date_time: DateTime<Utc>,
    pub duration: String,
    pub remind_time: DateTime<Utc>,
}

/// Reminder payload passed through the pending and acknowledged queues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMsg {
    pub id: ID,
    pub user_id: i64,
    pub title: String,
    pub date_time: DateTime<Utc>,
}

impl EventMsg {
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }
}
