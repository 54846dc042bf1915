//! GATT descriptions — services, characteristics, filters and connection
//! states — independent of any Bluetooth stack.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Battery Service (0x180F).
pub const BATTERY_SERVICE: Uuid = Uuid::from_u128(0x0000_180f_0000_1000_8000_0080_5f9b_34fb);
/// Battery Level characteristic (0x2A19).
pub const BATTERY_LEVEL: Uuid = Uuid::from_u128(0x0000_2a19_0000_1000_8000_0080_5f9b_34fb);
/// Heart Rate Service (0x180D).
pub const HEART_RATE_SERVICE: Uuid = Uuid::from_u128(0x0000_180d_0000_1000_8000_0080_5f9b_34fb);
/// Heart Rate Measurement characteristic (0x2A37).
pub const HEART_RATE_MEASUREMENT: Uuid =
    Uuid::from_u128(0x0000_2a37_0000_1000_8000_0080_5f9b_34fb);
/// Cycling Power Service (0x1818).
pub const CYCLING_POWER_SERVICE: Uuid =
    Uuid::from_u128(0x0000_1818_0000_1000_8000_0080_5f9b_34fb);
/// Cycling Power Measurement characteristic (0x2A63).
pub const CYCLING_POWER_MEASUREMENT: Uuid =
    Uuid::from_u128(0x0000_2a63_0000_1000_8000_0080_5f9b_34fb);
/// Cycling Speed and Cadence Service (0x1816).
pub const CYCLING_SPEED_CADENCE_SERVICE: Uuid =
    Uuid::from_u128(0x0000_1816_0000_1000_8000_0080_5f9b_34fb);
/// Running Speed and Cadence Service (0x1814).
pub const RUNNING_SPEED_CADENCE_SERVICE: Uuid =
    Uuid::from_u128(0x0000_1814_0000_1000_8000_0080_5f9b_34fb);
/// RSC Measurement characteristic (0x2A53).
pub const RUNNING_SPEED_CADENCE_MEASUREMENT: Uuid =
    Uuid::from_u128(0x0000_2a53_0000_1000_8000_0080_5f9b_34fb);
/// Client Characteristic Configuration descriptor (0x2902).
pub const CLIENT_CHARACTERISTIC_CONFIGURATION: Uuid =
    Uuid::from_u128(0x0000_2902_0000_1000_8000_0080_5f9b_34fb);

/// Services advertised by the fitness peripherals we look for while scanning.
pub const ADVERTISED_SERVICES: [Uuid; 4] = [
    HEART_RATE_SERVICE,
    CYCLING_SPEED_CADENCE_SERVICE,
    CYCLING_POWER_SERVICE,
    RUNNING_SPEED_CADENCE_SERVICE,
];

/// Access capabilities of one characteristic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacteristicProperties {
    pub read: bool,
    pub notify: bool,
    pub indicate: bool,
}

/// One characteristic exposed by a peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GattCharacteristic {
    pub uuid: Uuid,
    /// Service the characteristic belongs to.
    pub service: Uuid,
    pub properties: CharacteristicProperties,
}

/// One service exposed by a peripheral, with its characteristics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GattService {
    pub uuid: Uuid,
    pub characteristics: Vec<GattCharacteristic>,
}

/// How a characteristic of interest is consumed during connection setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Enable server-initiated pushes through the configuration descriptor.
    Notify,
    /// Read the value once per connection setup.
    Read,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notify => f.write_str("notify"),
            Self::Read => f.write_str("read"),
        }
    }
}

/// Set of service UUIDs a connection accepts. A peripheral whose exposed
/// services do not intersect this set is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFilter(BTreeSet<Uuid>);

impl ServiceFilter {
    /// Battery, heart rate, cycling speed/cadence, cycling power and
    /// running speed/cadence.
    #[must_use]
    pub fn supported() -> Self {
        [
            BATTERY_SERVICE,
            HEART_RATE_SERVICE,
            CYCLING_SPEED_CADENCE_SERVICE,
            CYCLING_POWER_SERVICE,
            RUNNING_SPEED_CADENCE_SERVICE,
        ]
        .into_iter()
        .collect()
    }

    #[must_use]
    pub fn contains(&self, service: &Uuid) -> bool {
        self.0.contains(service)
    }

    /// Whether at least one of `services` is accepted.
    #[must_use]
    pub fn intersects(&self, services: &[GattService]) -> bool {
        services.iter().any(|svc| self.contains(&svc.uuid))
    }
}

impl FromIterator<Uuid> for ServiceFilter {
    fn from_iter<I: IntoIterator<Item = Uuid>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Set of characteristic UUIDs of interest within accepted services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacteristicFilter(BTreeSet<Uuid>);

impl CharacteristicFilter {
    /// Battery level, heart rate, cycling power and RSC measurements.
    #[must_use]
    pub fn supported() -> Self {
        [
            BATTERY_LEVEL,
            HEART_RATE_MEASUREMENT,
            CYCLING_POWER_MEASUREMENT,
            RUNNING_SPEED_CADENCE_MEASUREMENT,
        ]
        .into_iter()
        .collect()
    }

    #[must_use]
    pub fn contains(&self, characteristic: &Uuid) -> bool {
        self.0.contains(characteristic)
    }

    /// Decide how `characteristic` is set up: subscribe when it pushes,
    /// otherwise read when readable. `None` when it is not of interest or
    /// supports neither.
    #[must_use]
    pub fn access_mode(&self, characteristic: &GattCharacteristic) -> Option<AccessMode> {
        if !self.contains(&characteristic.uuid) {
            return None;
        }
        if characteristic.properties.notify {
            Some(AccessMode::Notify)
        } else if characteristic.properties.read {
            Some(AccessMode::Read)
        } else {
            None
        }
    }
}

impl FromIterator<Uuid> for CharacteristicFilter {
    fn from_iter<I: IntoIterator<Item = Uuid>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Lifecycle of one peripheral connection.
///
/// `Disconnected → Connecting → ServiceDiscovery → SettingUp → Active →
/// Disconnecting → Disconnected`, with `Failed` reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    ServiceDiscovery,
    SettingUp,
    Active,
    Disconnecting,
    Failed,
}

impl ConnectionState {
    /// Whether no further transition can happen.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::ServiceDiscovery => "service_discovery",
            Self::SettingUp => "setting_up",
            Self::Active => "active",
            Self::Disconnecting => "disconnecting",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}
