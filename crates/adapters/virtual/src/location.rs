use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use fitrecord_app::ports::{LocationListener, LocationSource, LocationUpdate};
use fitrecord_domain::error::BoxError;
use fitrecord_domain::location::{LocationFix, LocationProvider};
use fitrecord_domain::time;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Degrees of latitude covered per fix; roughly 3 m northwards.
const STEP_DEGREES: f64 = 0.000_027;

/// [`LocationSource`] walking north from an origin, one fix per interval.
#[derive(Debug)]
pub struct VirtualLocation {
    runtime: Handle,
    origin: (f64, f64),
    available: bool,
    track: Mutex<Option<JoinHandle<()>>>,
}

impl VirtualLocation {
    pub fn new(runtime: Handle, latitude: f64, longitude: f64) -> Self {
        Self {
            runtime,
            origin: (latitude, longitude),
            available: true,
            track: Mutex::new(None),
        }
    }

    /// A source whose start is refused, as when location access is denied.
    #[must_use]
    pub fn unavailable(runtime: Handle) -> Self {
        let mut source = Self::new(runtime, 0.0, 0.0);
        source.available = false;
        source
    }

    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.track
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

fn fix_at(origin: (f64, f64), step: u32) -> LocationFix {
    LocationFix {
        time: time::now(),
        latitude: origin.0 + f64::from(step) * STEP_DEGREES,
        longitude: origin.1,
        altitude: Some(35.0),
        accuracy: Some(5.0),
        speed: Some(3.0),
        bearing: Some(0.0),
        provider: LocationProvider::Satellite,
    }
}

impl LocationSource for VirtualLocation {
    fn start(&self, interval: Duration, listener: LocationListener) -> Result<(), BoxError> {
        if !self.available {
            return Err("location access denied".into());
        }

        let origin = self.origin;
        let task = self.runtime.spawn(async move {
            listener(LocationUpdate::Availability(true));
            let mut ticks = tokio::time::interval(interval);
            let mut step = 0_u32;
            loop {
                ticks.tick().await;
                listener(LocationUpdate::Fix(fix_at(origin, step)));
                step = step.wrapping_add(1);
            }
        });

        if let Some(previous) = self
            .track
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task)
        {
            previous.abort();
        }
        tracing::debug!(?interval, "virtual location started");
        Ok(())
    }

    fn stop(&self) {
        if let Some(task) = self
            .track
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
            tracing::debug!("virtual location stopped");
        }
    }
}
