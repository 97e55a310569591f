use calendar_reminders_domain::ID;
use calendar_reminders_infra::InvalidStorageValue;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum CalendarError {
    #[error("The event with id: {0}, was not found.")]
    NotFound(ID),
    #[error("The time {0} is not available, another event is scheduled then.")]
    DateBusy(DateTime<Utc>),
    #[error("The event with id: {0}, is in progress and cannot be modified.")]
    EventIsActive(ID),
    #[error("Invalid storage value in config: `{0}`")]
    InvalidStorageValue(String),
    #[error("Internal server error")]
    InternalError,
}

impl From<InvalidStorageValue> for CalendarError {
    fn from(e: InvalidStorageValue) -> Self {
        Self::InvalidStorageValue(e.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calendar_reminders_infra::StorageKind;

    #[test]
    fn invalid_storage_is_reported_with_the_value() {
        let err: CalendarError = "sqlite".parse::<StorageKind>().unwrap_err().into();
        assert_eq!(err, CalendarError::InvalidStorageValue("sqlite".into()));
        assert_eq!(err.to_string(), "Invalid storage value in config: `sqlite`");
    }
}
