//! Simulated fitness peripherals.

mod footpod;
mod heart_rate;
mod power_meter;

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use fitrecord_app::ports::Notification;
use fitrecord_domain::gatt::{
    BATTERY_LEVEL, BATTERY_SERVICE, CYCLING_POWER_MEASUREMENT, CYCLING_POWER_SERVICE,
    CharacteristicProperties, GattCharacteristic, GattService, HEART_RATE_MEASUREMENT,
    HEART_RATE_SERVICE, RUNNING_SPEED_CADENCE_MEASUREMENT, RUNNING_SPEED_CADENCE_SERVICE,
};
use fitrecord_domain::id::PeripheralAddress;
use tokio::sync::mpsc;
use uuid::Uuid;

/// What a virtual peripheral pretends to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    HeartRateStrap,
    PowerMeter,
    Footpod,
}

impl DeviceKind {
    fn service(self) -> Uuid {
        match self {
            Self::HeartRateStrap => HEART_RATE_SERVICE,
            Self::PowerMeter => CYCLING_POWER_SERVICE,
            Self::Footpod => RUNNING_SPEED_CADENCE_SERVICE,
        }
    }

    fn measurement(self) -> Uuid {
        match self {
            Self::HeartRateStrap => HEART_RATE_MEASUREMENT,
            Self::PowerMeter => CYCLING_POWER_MEASUREMENT,
            Self::Footpod => RUNNING_SPEED_CADENCE_MEASUREMENT,
        }
    }

    fn payload(self, step: u32) -> Vec<u8> {
        match self {
            Self::HeartRateStrap => heart_rate::payload(step),
            Self::PowerMeter => power_meter::payload(step),
            Self::Footpod => footpod::payload(step),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::HeartRateStrap => "Virtual HRM",
            Self::PowerMeter => "Virtual Power",
            Self::Footpod => "Virtual Footpod",
        }
    }
}

/// A simulated peripheral. Every open link receives the values pushed
/// through [`notify`](Self::notify).
#[derive(Debug)]
pub struct VirtualPeripheral {
    address: PeripheralAddress,
    kind: DeviceKind,
    battery_level: u8,
    reachable: AtomicBool,
    step: AtomicU32,
    next_link: AtomicU64,
    links: Mutex<Vec<(u64, mpsc::UnboundedSender<Notification>)>>,
}

impl VirtualPeripheral {
    #[must_use]
    pub fn new(kind: DeviceKind, address: impl Into<PeripheralAddress>) -> Self {
        Self {
            address: address.into(),
            kind,
            battery_level: 87,
            reachable: AtomicBool::new(true),
            step: AtomicU32::new(0),
            next_link: AtomicU64::new(0),
            links: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn address(&self) -> &PeripheralAddress {
        &self.address
    }

    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind.label()
    }

    #[must_use]
    pub fn battery_level(&self) -> u8 {
        self.battery_level
    }

    /// Whether connection attempts succeed. Out-of-range devices refuse.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Acquire)
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Release);
    }

    /// The measurement service plus a readable battery service.
    #[must_use]
    pub fn services(&self) -> Vec<GattService> {
        let service = self.kind.service();
        vec![
            GattService {
                uuid: service,
                characteristics: vec![GattCharacteristic {
                    uuid: self.kind.measurement(),
                    service,
                    properties: CharacteristicProperties {
                        read: false,
                        notify: true,
                        indicate: false,
                    },
                }],
            },
            GattService {
                uuid: BATTERY_SERVICE,
                characteristics: vec![GattCharacteristic {
                    uuid: BATTERY_LEVEL,
                    service: BATTERY_SERVICE,
                    properties: CharacteristicProperties {
                        read: true,
                        notify: false,
                        indicate: false,
                    },
                }],
            },
        ]
    }

    /// Push `value` to every open link. Returns how many links got it.
    pub fn notify(&self, characteristic: Uuid, value: Vec<u8>) -> usize {
        let mut links = self.lock_links();
        links.retain(|(_, link)| {
            link.send(Notification {
                characteristic,
                value: value.clone(),
            })
            .is_ok()
        });
        links.len()
    }

    /// Push the next simulated measurement.
    pub fn tick(&self) -> usize {
        let step = self.step.fetch_add(1, Ordering::Relaxed);
        self.notify(self.kind.measurement(), self.kind.payload(step))
    }

    /// Simulate the radio dropping every open link.
    pub fn drop_links(&self) {
        self.lock_links().clear();
    }

    #[must_use]
    pub fn open_links(&self) -> usize {
        self.lock_links()
            .iter()
            .filter(|(_, link)| !link.is_closed())
            .count()
    }

    pub(crate) fn attach(&self) -> (u64, mpsc::UnboundedReceiver<Notification>) {
        let id = self.next_link.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock_links().push((id, tx));
        (id, rx)
    }

    pub(crate) fn detach(&self, id: u64) {
        self.lock_links().retain(|(link, _)| *link != id);
    }

    fn lock_links(&self) -> MutexGuard<'_, Vec<(u64, mpsc::UnboundedSender<Notification>)>> {
        self.links.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use fitrecord_domain::decoder;

    use super::*;

    #[test]
    fn should_expose_measurement_and_battery_services() {
        let device = VirtualPeripheral::new(DeviceKind::PowerMeter, "AA:01");
        let services = device.services();
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].uuid, CYCLING_POWER_SERVICE);
        assert!(services[0].characteristics[0].properties.notify);
        assert!(services[1].characteristics[0].properties.read);
    }

    #[test]
    fn should_produce_decodable_payloads_for_every_kind() {
        for kind in [
            DeviceKind::HeartRateStrap,
            DeviceKind::PowerMeter,
            DeviceKind::Footpod,
        ] {
            for step in 0..50 {
                let sample = decoder::decode(kind.measurement(), &kind.payload(step)).unwrap();
                assert!(!sample.is_empty());
            }
        }
    }

    #[test]
    fn should_deliver_to_attached_links_only() {
        let device = VirtualPeripheral::new(DeviceKind::HeartRateStrap, "AA:01");
        assert_eq!(device.tick(), 0);

        let (_, mut rx) = device.attach();
        assert_eq!(device.tick(), 1);
        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.characteristic, HEART_RATE_MEASUREMENT);

        drop(rx);
        assert_eq!(device.tick(), 0);
    }

    #[test]
    fn should_close_links_when_dropped() {
        let device = VirtualPeripheral::new(DeviceKind::Footpod, "AA:01");
        let (_, mut rx) = device.attach();
        device.drop_links();
        assert!(rx.try_recv().is_err());
        assert_eq!(device.open_links(), 0);
    }

    #[test]
    fn should_detach_single_link() {
        let device = VirtualPeripheral::new(DeviceKind::HeartRateStrap, "AA:01");
        let (first, _first_rx) = device.attach();
        let (_, _second_rx) = device.attach();
        device.detach(first);
        assert_eq!(device.open_links(), 1);
    }
}
