use chrono::{Local, NaiveDateTime, Timelike, Utc};
use std::cmp::Ordering;

/// Measures the host's offset from UTC in whole hours
///
/// Reads the local wall clock and the UTC wall clock back-to-back and
/// compares the two readings with [`offset_hours_between`]. The result is
/// meant to be computed once per process.
pub fn measure_host_offset_hours() -> i64 {
    let utc = Utc::now().naive_utc();
    let local = Local::now().naive_local();
    offset_hours_between(local, utc)
}

/// Computes the hour offset between a local and a UTC wall-clock reading
///
/// The hour-of-day difference is corrected by a whole day whenever the two
/// readings fall on different calendar dates: +24 when the local date is
/// ahead of the UTC date, -24 when it is behind. Minutes are ignored, so
/// hosts on half-hour zones are truncated to the hour.
///
/// # Arguments
///
/// * `local` - The host's local wall-clock reading
/// * `utc` - A UTC wall-clock reading taken at approximately the same instant
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use post_sweep::clock::offset_hours_between;
///
/// let local = NaiveDate::from_ymd_opt(2017, 7, 11).unwrap().and_hms_opt(1, 0, 0).unwrap();
/// let utc = NaiveDate::from_ymd_opt(2017, 7, 10).unwrap().and_hms_opt(16, 0, 0).unwrap();
/// assert_eq!(offset_hours_between(local, utc), 9);
/// ```
pub fn offset_hours_between(local: NaiveDateTime, utc: NaiveDateTime) -> i64 {
    let hour_delta = i64::from(local.hour()) - i64::from(utc.hour());

    let day_offset = match local.date().cmp(&utc.date()) {
        Ordering::Equal => 0,
        Ordering::Greater => 24,
        Ordering::Less => -24,
    };

    hour_delta + day_offset
}
