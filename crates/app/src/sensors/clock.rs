use fitrecord_domain::error::BoxError;
use fitrecord_domain::id::SensorId;
use fitrecord_domain::sample::Sample;
use fitrecord_domain::time;

use super::Sensor;
use crate::context::SessionContext;

/// Wall-clock time, sampled when collected.
pub struct ClockSensor {
    id: SensorId,
}

impl ClockSensor {
    #[must_use]
    pub fn new(id: SensorId) -> Self {
        Self { id }
    }
}

impl Sensor for ClockSensor {
    fn id(&self) -> &SensorId {
        &self.id
    }

    fn start(&mut self, _context: &SessionContext) -> Result<(), BoxError> {
        Ok(())
    }

    fn stop(&mut self) {}

    fn latest_sample(&self) -> Option<Sample> {
        Some(Sample::new().with("now", time::epoch_millis(time::now())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_sample_current_time() {
        let before = time::epoch_millis(time::now());
        let sample = ClockSensor::new(SensorId::new("time"))
            .latest_sample()
            .unwrap();
        let now = sample.get("now").unwrap();
        assert!(now >= before);
        assert_eq!(sample.len(), 1);
    }
}
