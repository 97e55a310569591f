use chrono::{prelude::*, Duration};

const MILLIS_PER_MINUTE: i64 = 60 * 1000;

pub fn is_leap_year(year: i32) -> bool {
    year % 400 == 0 || (year % 100 != 0 && year % 4 == 0)
}

// month: January -> 1
pub fn get_month_length(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Midnight (UTC) of the day `dt` falls on
pub fn start_of_day(dt: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&dt.date_naive().and_time(NaiveTime::default()))
}

/// First instant of the month `dt` falls on
pub fn start_of_month(dt: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(dt) - Duration::days(i64::from(dt.day()) - 1)
}

/// First instant of the month following the one `dt` falls on.
/// Computed from the real month length, so February and 30-day months
/// are never over- or undershot.
pub fn start_of_next_month(dt: DateTime<Utc>) -> DateTime<Utc> {
    let month_start = start_of_month(dt);
    month_start + Duration::days(i64::from(get_month_length(dt.year(), dt.month())))
}

/// Index of the minute `dt` rounds to. Half a minute and above rounds up.
pub fn minute_slot(dt: DateTime<Utc>) -> i64 {
    (dt.timestamp_millis() + MILLIS_PER_MINUTE / 2).div_euclid(MILLIS_PER_MINUTE)
}

/// An event is active while its start rounds to the same minute as `now`
pub fn is_active(date_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    minute_slot(date_time) == minute_slot(now)
}
