//! Epoch-day utilities
//!
//! Visits and efforts compare dates as integer day counts from 1970-01-01.

use chrono::{Days, NaiveDate};

/// Reference date for epoch-day arithmetic (chrono's default date, 1970-01-01)
pub fn epoch() -> NaiveDate {
    NaiveDate::default()
}

/// Days elapsed between the epoch and `date` (negative before 1970)
pub fn epoch_day(date: NaiveDate) -> i64 {
    date.signed_duration_since(epoch()).num_days()
}

/// Inverse of [`epoch_day`]; `None` when the day falls outside chrono's range
pub fn date_from_epoch_day(day: i64) -> Option<NaiveDate> {
    if day >= 0 {
        epoch().checked_add_days(Days::new(day as u64))
    } else {
        epoch().checked_sub_days(Days::new(day.unsigned_abs()))
    }
}
