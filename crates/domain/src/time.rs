//! Time and timestamp helpers.

use chrono::{DateTime, TimeDelta, Utc};

/// UTC timestamp used for light expiries and randomizer next-update times.
pub type Timestamp = DateTime<Utc>;

/// The "always due" timestamp a light starts from and returns to on cancel.
pub const NEVER: Timestamp = DateTime::<Utc>::UNIX_EPOCH;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Offset `ts` by a number of whole seconds.
#[must_use]
pub fn after_secs(ts: Timestamp, secs: u32) -> Timestamp {
    ts + TimeDelta::seconds(i64::from(secs))
}

/// Render a number of seconds as `H:MM:SS`.
#[must_use]
pub fn format_hms(secs: u32) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}
