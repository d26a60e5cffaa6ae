//! Wall-clock timestamp source and formatting for the sink layout.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// A local wall-clock timestamp, taken once per flush cycle.
pub type Timestamp = DateTime<Local>;

/// Sink timestamp layout: local time at millisecond precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Returns the current local time.
#[inline]
pub fn now() -> Timestamp {
    Local::now()
}

/// Renders a timestamp in the sink layout, e.g. `2025-06-01 15:00:01.653`.
pub fn format_timestamp(timestamp: &Timestamp) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a timestamp in the sink layout back into a [`Timestamp`].
///
/// The millisecond part may be omitted. Returns `None` on malformed input
/// or a local time that does not exist (DST gap).
///
/// # Examples
///
/// ```rust
/// use telemetria::clock::{format_timestamp, parse_timestamp};
///
/// let ts = parse_timestamp("2025-06-01 15:00:01.653").unwrap();
/// assert_eq!(format_timestamp(&ts), "2025-06-01 15:00:01.653");
///
/// assert!(parse_timestamp("not a timestamp").is_none());
/// ```
pub fn parse_timestamp(input: &str) -> Option<Timestamp> {
    let naive = NaiveDateTime::parse_from_str(input, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S"))
        .ok()?;
    Local.from_local_datetime(&naive).earliest()
}
