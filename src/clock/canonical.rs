use chrono::{DateTime, Utc};

/// Display format for canonical timestamps (minute precision)
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M+00:00";

/// Timezone label attached to every extracted result
pub const CANONICAL_TIMEZONE: &str = "UTC";

/// Converts a host-local epoch into a canonical UTC instant
///
/// `utc_epoch = local_epoch - host_offset_hours * 3600`
///
/// Returns `None` when the adjusted epoch is outside the range chrono can
/// represent.
pub fn to_canonical_utc(local_epoch: i64, host_offset_hours: i64) -> Option<DateTime<Utc>> {
    let shift = host_offset_hours.checked_mul(3600)?;
    let utc_epoch = local_epoch.checked_sub(shift)?;
    DateTime::from_timestamp(utc_epoch, 0)
}

/// Renders an instant as `YYYY-MM-DD HH:MM+00:00`
pub fn format_canonical(instant: &DateTime<Utc>) -> String {
    instant.format(CANONICAL_FORMAT).to_string()
}
