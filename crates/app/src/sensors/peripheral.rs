use fitrecord_domain::decoder;
use fitrecord_domain::error::{BoxError, DecodeError};
use fitrecord_domain::gatt::{CharacteristicFilter, ServiceFilter};
use fitrecord_domain::id::{PeripheralAddress, SensorId};
use fitrecord_domain::sample::Sample;
use uuid::Uuid;

use super::Sensor;
use crate::context::SessionContext;
use crate::gatt::Disconnector;
use crate::latest::SampleSlot;
use crate::ports::ConnectionCallbacks;

/// A fitness peripheral reached over the radio. Every decoded payload is
/// merged into the cached sample.
pub struct PeripheralSensor {
    address: PeripheralAddress,
    slot: SampleSlot,
    disconnector: Option<Disconnector>,
}

impl PeripheralSensor {
    #[must_use]
    pub fn new(address: PeripheralAddress, slot: SampleSlot) -> Self {
        Self {
            address,
            slot,
            disconnector: None,
        }
    }

    #[must_use]
    pub fn address(&self) -> &PeripheralAddress {
        &self.address
    }
}

impl Sensor for PeripheralSensor {
    fn id(&self) -> &SensorId {
        self.slot.id()
    }

    fn start(&mut self, context: &SessionContext) -> Result<(), BoxError> {
        let callbacks = SampleCallbacks {
            address: self.address.clone(),
            slot: self.slot.clone(),
        };
        let disconnector = context.connector().connect(
            self.address.clone(),
            ServiceFilter::supported(),
            CharacteristicFilter::supported(),
            Box::new(callbacks),
        );
        self.disconnector = Some(disconnector);
        Ok(())
    }

    fn stop(&mut self) {
        self.slot.close();
        if let Some(disconnector) = self.disconnector.take() {
            disconnector.disconnect();
        }
    }

    fn latest_sample(&self) -> Option<Sample> {
        self.slot.snapshot()
    }
}

struct SampleCallbacks {
    address: PeripheralAddress,
    slot: SampleSlot,
}

impl ConnectionCallbacks for SampleCallbacks {
    fn on_connect(&mut self, disconnector: Disconnector) {
        if !self.slot.is_open() {
            // sensor stopped while setup was running
            disconnector.disconnect();
        }
    }

    fn on_disconnect(&mut self, was_failure: bool) {
        if was_failure {
            tracing::warn!(address = %self.address, "peripheral connection lost");
        } else {
            tracing::debug!(address = %self.address, "peripheral connection closed");
        }
        // readings only hold for the connection that produced them
        self.slot.replace(Sample::new());
    }

    fn on_data(&mut self, characteristic: Uuid, payload: &[u8]) {
        tracing::trace!(address = %self.address, %characteristic, ?payload, "payload");
        match decoder::decode(characteristic, payload) {
            Ok(sample) => {
                self.slot.merge(sample);
            }
            Err(DecodeError::Unrecognized(_)) => {
                tracing::warn!(address = %self.address, %characteristic, "unrecognized payload");
            }
            Err(err) => {
                tracing::warn!(address = %self.address, %err, "undecodable payload");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use fitrecord_domain::gatt::{BATTERY_LEVEL, CYCLING_POWER_MEASUREMENT, HEART_RATE_MEASUREMENT};

    use super::*;
    use crate::context::testing::Fakes;
    use crate::latest::LatestData;

    fn started(fakes: &Fakes) -> (PeripheralSensor, SessionContext) {
        let context = SessionContext::new(fakes.platform());
        let data = LatestData::new();
        let mut sensor =
            PeripheralSensor::new(PeripheralAddress::new("AA:BB"), data.open_slot(SensorId::new("AA:BB")));
        sensor.start(&context).unwrap();
        (sensor, context)
    }

    #[test]
    fn should_request_connection_on_start() {
        let fakes = Fakes::new();
        let (sensor, _context) = started(&fakes);
        assert_eq!(fakes.connector.count(), 1);
        assert_eq!(sensor.latest_sample(), Some(Sample::new()));
    }

    #[test]
    fn should_merge_decoded_payloads() {
        let fakes = Fakes::new();
        let (sensor, _context) = started(&fakes);
        let mut connection = fakes.connector.take("AA:BB");

        connection.callbacks.on_connect(connection.disconnector.clone());
        connection.callbacks.on_data(HEART_RATE_MEASUREMENT, &[0x00, 75]);
        connection.callbacks.on_data(BATTERY_LEVEL, &[88]);
        connection
            .callbacks
            .on_data(CYCLING_POWER_MEASUREMENT, &[0, 0, 0x2C, 0x01, 0, 0, 0, 0]);

        let sample = sensor.latest_sample().unwrap();
        assert_eq!(sample.get("hrm"), Some(75.0));
        assert_eq!(sample.get("battery"), Some(88.0));
        assert_eq!(sample.get("power"), Some(300.0));
    }

    #[test]
    fn should_ignore_unrecognized_and_truncated_payloads() {
        let fakes = Fakes::new();
        let (sensor, _context) = started(&fakes);
        let mut connection = fakes.connector.take("AA:BB");

        connection.callbacks.on_data(HEART_RATE_MEASUREMENT, &[0x00, 75]);
        connection
            .callbacks
            .on_data(Uuid::from_u128(0x0000_2a00_0000_1000_8000_0080_5f9b_34fb), b"name");
        connection.callbacks.on_data(HEART_RATE_MEASUREMENT, &[0x01, 80]);

        assert_eq!(sensor.latest_sample(), Some(Sample::new().with("hrm", 75.0)));
    }

    #[test]
    fn should_forget_readings_when_connection_is_lost() {
        let fakes = Fakes::new();
        let (sensor, _context) = started(&fakes);
        let mut connection = fakes.connector.take("AA:BB");

        connection.callbacks.on_connect(connection.disconnector.clone());
        connection.callbacks.on_data(HEART_RATE_MEASUREMENT, &[0x00, 75]);
        assert_eq!(sensor.latest_sample(), Some(Sample::new().with("hrm", 75.0)));

        connection.callbacks.on_disconnect(true);
        assert_eq!(sensor.latest_sample(), Some(Sample::new()));
    }

    #[test]
    fn should_disconnect_and_drop_late_data_on_stop() {
        let fakes = Fakes::new();
        let (mut sensor, _context) = started(&fakes);
        let mut connection = fakes.connector.take("AA:BB");

        sensor.stop();
        assert!(connection.disconnector.is_requested());

        connection.callbacks.on_data(HEART_RATE_MEASUREMENT, &[0x00, 75]);
        assert_eq!(sensor.latest_sample(), None);
    }

    #[test]
    fn should_disconnect_when_setup_completes_after_stop() {
        let fakes = Fakes::new();
        let (mut sensor, _context) = started(&fakes);
        let mut connection = fakes.connector.take("AA:BB");
        sensor.stop();

        let late = Disconnector::new();
        connection.callbacks.on_connect(late.clone());
        assert!(late.is_requested());
    }
}
