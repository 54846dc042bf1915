//! Sensor kinds aggregated by the [`SensorRegistry`](crate::registry::SensorRegistry).

mod clock;
mod location;
mod peripheral;

use fitrecord_domain::error::BoxError;
use fitrecord_domain::id::SensorId;
use fitrecord_domain::sample::Sample;
use fitrecord_domain::sensor::{SensorConfig, SensorKind};

pub use clock::ClockSensor;
pub use location::{LOCATION_UPDATE_INTERVAL, LocationSensor};
pub use peripheral::PeripheralSensor;

use crate::context::SessionContext;
use crate::latest::LatestData;

/// Common capability of every sensor kind.
pub trait Sensor: Send {
    fn id(&self) -> &SensorId;

    /// Begin producing samples. Must not block on IO.
    ///
    /// # Errors
    ///
    /// Fails when the platform refuses the underlying resource.
    fn start(&mut self, context: &SessionContext) -> Result<(), BoxError>;

    /// Stop producing samples and release resources. Idempotent.
    fn stop(&mut self);

    /// Cached value at call time. Never waits on IO.
    fn latest_sample(&self) -> Option<Sample>;
}

/// Instantiate the sensor selected by `config`, registering its entry in
/// `data` when it caches samples.
pub fn build(config: &SensorConfig, data: &LatestData) -> Box<dyn Sensor> {
    let id = config.id.clone();
    match config.kind() {
        SensorKind::Clock => Box::new(ClockSensor::new(id)),
        SensorKind::Location => Box::new(LocationSensor::new(data.open_slot(id))),
        SensorKind::Peripheral(address) => {
            Box::new(PeripheralSensor::new(address, data.open_slot(id)))
        }
    }
}
