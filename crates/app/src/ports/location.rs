//! Location port — a platform source of position fixes.

use std::sync::Arc;
use std::time::Duration;

use fitrecord_domain::error::BoxError;
use fitrecord_domain::location::LocationFix;

/// Something a [`LocationSource`] reports.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationUpdate {
    /// A new position fix.
    Fix(LocationFix),
    /// The underlying provider was enabled (`true`) or disabled (`false`).
    Availability(bool),
}

/// Callback invoked by the source, possibly from a platform thread.
pub type LocationListener = Arc<dyn Fn(LocationUpdate) + Send + Sync>;

/// Platform location service.
pub trait LocationSource: Send + Sync {
    /// Request updates at roughly `interval`, delivered to `listener`.
    ///
    /// # Errors
    ///
    /// Fails when location access is not permitted or no provider exists.
    fn start(&self, interval: Duration, listener: LocationListener) -> Result<(), BoxError>;

    /// Stop delivering updates. Idempotent.
    fn stop(&self);
}
