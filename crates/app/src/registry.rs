//! Owns the active sensors of a session and aggregates their samples.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use fitrecord_domain::error::RegistryError;
use fitrecord_domain::id::SensorId;
use fitrecord_domain::sample::TelemetryFrame;
use fitrecord_domain::sensor::SensorConfig;

use crate::context::SessionContext;
use crate::latest::LatestData;
use crate::sensors::{self, Sensor};

#[derive(Default)]
struct Sensors {
    initialized: bool,
    active: Vec<Box<dyn Sensor>>,
}

/// The set of sensors of one activation.
///
/// `init` and `destroy` bracket an activation; `collect_data` may run
/// concurrently with connection callbacks updating sensor caches.
#[derive(Default)]
pub struct SensorRegistry {
    sensors: Mutex<Sensors>,
    data: LatestData,
}

impl SensorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate and start one sensor per entry, in order.
    ///
    /// A sensor that fails to start is logged, stopped and left out; the
    /// remaining entries still start.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::AlreadyInitialized`] without a prior `destroy`.
    /// - [`RegistryError::DuplicateSensor`] before anything is started.
    pub fn init(
        &self,
        context: &SessionContext,
        configs: &[SensorConfig],
    ) -> Result<(), RegistryError> {
        let mut state = self.lock();
        if state.initialized {
            return Err(RegistryError::AlreadyInitialized);
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = configs.iter().find(|c| !seen.insert(&c.id)) {
            return Err(RegistryError::DuplicateSensor(duplicate.id.clone()));
        }

        state.initialized = true;
        for config in configs {
            let mut sensor = sensors::build(config, &self.data);
            if let Err(source) = sensor.start(context) {
                tracing::warn!(sensor = %config.id, %source, "sensor failed to start");
                sensor.stop();
                continue;
            }
            tracing::debug!(sensor = %config.id, kind = ?config.kind(), "sensor started");
            state.active.push(sensor);
        }
        tracing::info!(count = state.active.len(), "sensors initialised");
        Ok(())
    }

    /// Stop every sensor and forget cached samples. No-op when not
    /// initialised.
    pub fn destroy(&self) {
        let mut state = self.lock();
        if !state.initialized {
            return;
        }
        for sensor in &mut state.active {
            sensor.stop();
        }
        let count = state.active.len();
        state.active.clear();
        state.initialized = false;
        self.data.clear();
        tracing::info!(count, "sensors stopped");
    }

    /// Snapshot of every sensor's latest sample. Never waits on IO.
    #[must_use]
    pub fn collect_data(&self) -> TelemetryFrame {
        self.lock()
            .active
            .iter()
            .filter_map(|sensor| Some((sensor.id().clone(), sensor.latest_sample()?)))
            .collect()
    }

    #[must_use]
    pub fn sensor_ids(&self) -> Vec<SensorId> {
        self.lock()
            .active
            .iter()
            .map(|sensor| sensor.id().clone())
            .collect()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    fn lock(&self) -> MutexGuard<'_, Sensors> {
        self.sensors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use fitrecord_domain::gatt::HEART_RATE_MEASUREMENT;
    use fitrecord_domain::sample::Sample;

    use super::*;
    use crate::context::testing::{Fakes, ManualLocation};

    fn configs(ids: &[&str]) -> Vec<SensorConfig> {
        ids.iter().map(|id| SensorConfig::new(*id)).collect()
    }

    #[test]
    fn should_start_one_sensor_per_entry() {
        let fakes = Fakes::new();
        let context = SessionContext::new(fakes.platform());
        let registry = SensorRegistry::new();

        registry
            .init(&context, &configs(&["time", "location", "AA:BB", "CC:DD"]))
            .unwrap();

        assert_eq!(registry.sensor_ids().len(), 4);
        assert_eq!(fakes.connector.count(), 2);
        assert!(fakes.location.listener.lock().unwrap().is_some());
    }

    #[test]
    fn should_collect_latest_sample_per_sensor() {
        let fakes = Fakes::new();
        let context = SessionContext::new(fakes.platform());
        let registry = SensorRegistry::new();
        registry
            .init(&context, &configs(&["time", "AA:BB"]))
            .unwrap();

        let mut connection = fakes.connector.take("AA:BB");
        connection.callbacks.on_data(HEART_RATE_MEASUREMENT, &[0x00, 75]);

        let frame = registry.collect_data();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.get("AA:BB"), Some(&Sample::new().with("hrm", 75.0)));
        assert!(frame.get("time").unwrap().get("now").is_some());
    }

    #[test]
    fn should_refuse_second_init() {
        let fakes = Fakes::new();
        let context = SessionContext::new(fakes.platform());
        let registry = SensorRegistry::new();
        registry.init(&context, &configs(&["time"])).unwrap();

        let err = registry.init(&context, &configs(&["time"])).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyInitialized));
    }

    #[test]
    fn should_reject_duplicate_ids_before_starting_anything() {
        let fakes = Fakes::new();
        let context = SessionContext::new(fakes.platform());
        let registry = SensorRegistry::new();

        let err = registry
            .init(&context, &configs(&["AA:BB", "time", "AA:BB"]))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateSensor(id) if id.as_str() == "AA:BB"));
        assert_eq!(fakes.connector.count(), 0);
        assert!(!registry.is_initialized());
    }

    #[test]
    fn should_keep_started_sensors_when_one_fails() {
        let fakes = Fakes::with_location(ManualLocation {
            denied: true,
            ..ManualLocation::default()
        });
        let context = SessionContext::new(fakes.platform());
        let registry = SensorRegistry::new();

        registry
            .init(&context, &configs(&["AA:BB", "location", "CC:DD"]))
            .unwrap();
        assert!(registry.is_initialized());
        assert_eq!(
            registry.sensor_ids(),
            vec![SensorId::new("AA:BB"), SensorId::new("CC:DD")]
        );
        assert_eq!(fakes.connector.count(), 2);

        let mut connection = fakes.connector.take("CC:DD");
        connection.callbacks.on_data(HEART_RATE_MEASUREMENT, &[0x00, 75]);
        let frame = registry.collect_data();
        assert!(frame.get("location").is_none());
        assert_eq!(frame.get("CC:DD"), Some(&Sample::new().with("hrm", 75.0)));

        registry.destroy();
        assert!(fakes.connector.take("AA:BB").disconnector.is_requested());
        assert!(connection.disconnector.is_requested());
        assert!(registry.collect_data().is_empty());
    }

    #[test]
    fn should_stop_everything_on_destroy() {
        let fakes = Fakes::new();
        let context = SessionContext::new(fakes.platform());
        let registry = SensorRegistry::new();
        registry
            .init(&context, &configs(&["location", "AA:BB"]))
            .unwrap();

        registry.destroy();
        registry.destroy();

        assert!(fakes.connector.take("AA:BB").disconnector.is_requested());
        assert_eq!(fakes.location.stops.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(registry.collect_data().is_empty());
        assert!(!registry.is_initialized());
    }

    #[test]
    fn should_accept_init_again_after_destroy() {
        let fakes = Fakes::new();
        let context = SessionContext::new(fakes.platform());
        let registry = SensorRegistry::new();
        registry.init(&context, &configs(&["time"])).unwrap();
        registry.destroy();
        registry.init(&context, &configs(&["time"])).unwrap();
        assert_eq!(registry.collect_data().len(), 1);
    }
}
