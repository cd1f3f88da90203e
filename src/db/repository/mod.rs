//! Repository layer: table-scoped SQL operations returning plain records.
//!
//! Every function takes a borrowed `Connection` and performs one statement
//! (or one small read-modify sequence). Permission checks and cross-table
//! validation live in `crate::services`.

mod account;
mod appointment;
mod diagnosis;
mod employee;
mod meeting;
mod named;
mod patient;
mod prescription;
mod references;
mod room;
mod service;

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use rusqlite::types::Type;
use rusqlite::Row;

use super::DatabaseError;

pub use account::*;
pub use appointment::*;
pub use diagnosis::*;
pub use employee::*;
pub use meeting::*;
pub use named::*;
pub use patient::*;
pub use prescription::*;
pub use references::*;
pub use room::*;
pub use service::*;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Stored form of a date. Lexicographic order equals chronological order.
pub fn fmt_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Stored form of a timestamp (second precision).
pub fn fmt_datetime(ts: &NaiveDateTime) -> String {
    ts.format(DATETIME_FORMAT).to_string()
}

/// Current local time truncated to the stored precision.
pub fn now_timestamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub(crate) fn datetime_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_datetime_at(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<NaiveDateTime>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| {
            NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT)
                .map_err(|e| conversion_error(idx, e))
        })
        .transpose()
}

/// Parse a string-backed enum column (see `models::enums`).
pub(crate) fn enum_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = DatabaseError>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| conversion_error(idx, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_timestamps_sort_chronologically() {
        let early = NaiveDate::from_ymd_opt(2024, 9, 30)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        let late = NaiveDate::from_ymd_opt(2024, 10, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert!(fmt_datetime(&early) < fmt_datetime(&late));
        assert_eq!(fmt_datetime(&early), "2024-09-30 23:00:00");
    }

    #[test]
    fn now_has_no_fraction() {
        assert_eq!(now_timestamp().nanosecond(), 0);
    }
}
