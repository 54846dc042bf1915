//! Sensor configuration — which sensors a recording profile activates.

use serde::{Deserialize, Serialize};

use crate::id::{PeripheralAddress, SensorId};

/// Tag value selecting the wall-clock sensor.
pub const CLOCK_TAG: &str = "time";
/// Tag value selecting the location sensor.
pub const LOCATION_TAG: &str = "location";

/// The concrete sensor implementation selected by a configuration entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SensorKind {
    /// Wall-clock samples.
    Clock,
    /// Position fixes.
    Location,
    /// A wireless peripheral reached by address.
    Peripheral(PeripheralAddress),
}

impl From<&str> for SensorKind {
    fn from(tag: &str) -> Self {
        match tag {
            CLOCK_TAG => Self::Clock,
            LOCATION_TAG => Self::Location,
            address => Self::Peripheral(PeripheralAddress::new(address)),
        }
    }
}

impl From<String> for SensorKind {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<SensorKind> for String {
    fn from(kind: SensorKind) -> Self {
        match kind {
            SensorKind::Clock => CLOCK_TAG.to_string(),
            SensorKind::Location => LOCATION_TAG.to_string(),
            SensorKind::Peripheral(address) => address.into(),
        }
    }
}

/// One entry of a profile's sensor list: `{ id, kind }`.
///
/// When `kind` is omitted it is derived from `id` with the same tag rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub id: SensorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<SensorKind>,
}

impl SensorConfig {
    /// Entry whose kind is derived from its id.
    #[must_use]
    pub fn new(id: impl Into<SensorId>) -> Self {
        Self {
            id: id.into(),
            kind: None,
        }
    }

    /// Entry with an explicit kind.
    #[must_use]
    pub fn with_kind(id: impl Into<SensorId>, kind: SensorKind) -> Self {
        Self {
            id: id.into(),
            kind: Some(kind),
        }
    }

    /// The effective kind of this entry.
    #[must_use]
    pub fn kind(&self) -> SensorKind {
        self.kind
            .clone()
            .unwrap_or_else(|| SensorKind::from(self.id.as_str()))
    }
}
