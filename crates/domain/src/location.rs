//! Position fixes delivered by a location source.

use serde::{Deserialize, Serialize};

use crate::sample::Sample;
use crate::time::Timestamp;

/// Which provider produced a fix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationProvider {
    /// Satellite receiver.
    Satellite,
    /// Network (cell/wifi) positioning.
    Network,
    /// Re-delivered last-known position.
    LastKnown,
    #[default]
    Unknown,
}

impl LocationProvider {
    /// Numeric tag carried in telemetry frames.
    #[must_use]
    pub fn tag(self) -> f64 {
        match self {
            Self::Satellite => 1.0,
            Self::Network => 2.0,
            Self::LastKnown => 3.0,
            Self::Unknown => 0.0,
        }
    }
}

/// One position fix. Optional fields are absent when the provider did not
/// report them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub time: Timestamp,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    /// Horizontal accuracy in meters.
    pub accuracy: Option<f64>,
    /// Ground speed in m/s.
    pub speed: Option<f64>,
    /// Bearing in degrees.
    pub bearing: Option<f64>,
    pub provider: LocationProvider,
}

impl LocationFix {
    /// Flatten into telemetry metrics (`ts`, `latitude`, `longitude`, the
    /// optional fields that are present and the provider `type`).
    #[must_use]
    pub fn to_sample(&self) -> Sample {
        let mut sample = Sample::new()
            .with("ts", crate::time::epoch_millis(self.time))
            .with("latitude", self.latitude)
            .with("longitude", self.longitude);
        let optional = [
            ("altitude", self.altitude),
            ("accuracy", self.accuracy),
            ("speed", self.speed),
            ("bearing", self.bearing),
        ];
        for (metric, value) in optional
            .into_iter()
            .filter_map(|(metric, value)| value.map(|v| (metric, v)))
        {
            sample.insert(metric, value);
        }
        sample.insert("type", self.provider.tag());
        sample
    }
}
