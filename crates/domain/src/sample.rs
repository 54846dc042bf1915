//! Samples — named numeric metrics produced by sensors — and the per-tick
//! telemetry frame that aggregates them.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

use crate::id::SensorId;

/// Mapping from metric name (e.g. `"hrm"`, `"power"`) to its latest value.
///
/// Samples are merged rather than replaced: a later update overwrites the
/// metrics it carries and leaves unrelated metrics untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sample(BTreeMap<String, f64>);

impl Sample {
    /// Create an empty sample.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    #[must_use]
    pub fn with(mut self, metric: impl Into<String>, value: f64) -> Self {
        self.insert(metric, value);
        self
    }

    /// Set one metric, returning the previous value if any.
    pub fn insert(&mut self, metric: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(metric.into(), value)
    }

    /// Read one metric.
    #[must_use]
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.0.get(metric).copied()
    }

    /// Overwrite same-named metrics with those of `update`, keep the rest.
    pub fn merge(&mut self, update: Sample) {
        self.0.extend(update.0);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate metrics in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, f64> {
        self.0.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Sample {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl<'a> IntoIterator for &'a Sample {
    type Item = (&'a String, &'a f64);
    type IntoIter = btree_map::Iter<'a, String, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One aggregated snapshot: every active sensor's latest sample, keyed by
/// sensor id. Serialises as `{ sensorId: { metric: value, ... }, ... }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetryFrame(BTreeMap<SensorId, Sample>);

impl TelemetryFrame {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sensor: SensorId, sample: Sample) {
        self.0.insert(sensor, sample);
    }

    #[must_use]
    pub fn get(&self, sensor: &str) -> Option<&Sample> {
        self.0.get(sensor)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, SensorId, Sample> {
        self.0.iter()
    }
}

impl FromIterator<(SensorId, Sample)> for TelemetryFrame {
    fn from_iter<I: IntoIterator<Item = (SensorId, Sample)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_overwrite_same_named_metrics_on_merge() {
        let mut sample = Sample::new().with("hrm", 70.0);
        sample.merge(Sample::new().with("hrm", 75.0));
        assert_eq!(sample.get("hrm"), Some(75.0));
    }

    #[test]
    fn should_keep_unrelated_metrics_on_merge() {
        let mut sample = Sample::new().with("battery", 80.0);
        sample.merge(Sample::new().with("hrm", 75.0));
        assert_eq!(sample.get("battery"), Some(80.0));
        assert_eq!(sample.get("hrm"), Some(75.0));
        assert_eq!(sample.len(), 2);
    }

    #[test]
    fn should_serialize_frame_as_nested_maps() {
        let frame: TelemetryFrame =
            [(SensorId::new("AA:BB"), Sample::new().with("hrm", 75.0))]
                .into_iter()
                .collect();
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json, serde_json::json!({ "AA:BB": { "hrm": 75.0 } }));
    }

    #[test]
    fn should_deserialize_sample_from_flat_object() {
        let sample: Sample = serde_json::from_str(r#"{"status": 0, "speed": 3.5}"#).unwrap();
        assert_eq!(sample.get("status"), Some(0.0));
        assert_eq!(sample.get("speed"), Some(3.5));
    }
}
