//! Timestamp normalization
//!
//! The search provider embeds post timestamps already shifted to the
//! fetching host's local clock. This module measures the host's UTC offset
//! and converts those host-local epochs back into canonical UTC instants.

mod canonical;
mod offset;

pub use canonical::{format_canonical, to_canonical_utc, CANONICAL_FORMAT, CANONICAL_TIMEZONE};
pub use offset::{measure_host_offset_hours, offset_hours_between};
