//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp used for location fixes and clock samples.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Milliseconds since the Unix epoch, as carried in telemetry frames.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn epoch_millis(ts: Timestamp) -> f64 {
    ts.timestamp_millis() as f64
}
