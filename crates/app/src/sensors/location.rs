use std::sync::Arc;
use std::time::Duration;

use fitrecord_domain::error::BoxError;
use fitrecord_domain::id::SensorId;
use fitrecord_domain::sample::Sample;

use super::Sensor;
use crate::context::SessionContext;
use crate::latest::SampleSlot;
use crate::ports::{LocationListener, LocationSource, LocationUpdate};

/// Cadence requested from the location source.
pub const LOCATION_UPDATE_INTERVAL: Duration = Duration::from_millis(900);

const CONNECTED: &str = "connected";

/// Last position fix plus a `connected` flag.
pub struct LocationSensor {
    slot: SampleSlot,
    source: Option<Arc<dyn LocationSource>>,
}

impl LocationSensor {
    #[must_use]
    pub fn new(slot: SampleSlot) -> Self {
        Self { slot, source: None }
    }
}

impl Sensor for LocationSensor {
    fn id(&self) -> &SensorId {
        self.slot.id()
    }

    fn start(&mut self, context: &SessionContext) -> Result<(), BoxError> {
        self.slot.replace(Sample::new().with(CONNECTED, 0.0));

        let slot = self.slot.clone();
        let listener: LocationListener = Arc::new(move |update| match update {
            LocationUpdate::Fix(fix) => {
                let mut sample = fix.to_sample();
                sample.insert(CONNECTED, 1.0);
                slot.replace(sample);
            }
            LocationUpdate::Availability(enabled) => {
                tracing::debug!(enabled, "location provider availability changed");
                slot.merge(Sample::new().with(CONNECTED, if enabled { 1.0 } else { 0.0 }));
            }
        });

        context.location().start(LOCATION_UPDATE_INTERVAL, listener)?;
        self.source = Some(Arc::clone(context.location()));
        Ok(())
    }

    fn stop(&mut self) {
        self.slot.close();
        if let Some(source) = self.source.take() {
            source.stop();
        }
    }

    fn latest_sample(&self) -> Option<Sample> {
        self.slot.snapshot()
    }
}
