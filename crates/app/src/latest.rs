//! Latest decoded sample per sensor, shared between connection callbacks
//! and the collector.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fitrecord_domain::id::SensorId;
use fitrecord_domain::sample::Sample;

/// Map from sensor id to its most recent sample.
///
/// Every update and every snapshot of one entry happens under the same
/// lock, so readers see either the value before or after an update.
#[derive(Debug, Clone, Default)]
pub struct LatestData {
    samples: Arc<Mutex<HashMap<SensorId, Sample>>>,
}

impl LatestData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` with an empty sample and return its write handle.
    pub fn open_slot(&self, id: SensorId) -> SampleSlot {
        self.lock().insert(id.clone(), Sample::new());
        SampleSlot {
            id,
            data: self.clone(),
        }
    }

    #[must_use]
    pub fn get(&self, id: &SensorId) -> Option<Sample> {
        self.lock().get(id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SensorId, Sample>> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Write handle on one sensor's entry. Writes after [`close`](Self::close)
/// are dropped.
#[derive(Debug, Clone)]
pub struct SampleSlot {
    id: SensorId,
    data: LatestData,
}

impl SampleSlot {
    #[must_use]
    pub fn id(&self) -> &SensorId {
        &self.id
    }

    /// Overlay `update` onto the current sample. Returns `false` when the
    /// slot is closed.
    pub fn merge(&self, update: Sample) -> bool {
        match self.data.lock().get_mut(&self.id) {
            Some(current) => {
                current.merge(update);
                true
            }
            None => false,
        }
    }

    /// Replace the current sample. Returns `false` when the slot is closed.
    pub fn replace(&self, sample: Sample) -> bool {
        match self.data.lock().get_mut(&self.id) {
            Some(current) => {
                *current = sample;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<Sample> {
        self.data.get(&self.id)
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.data.lock().contains_key(&self.id)
    }

    /// Stop accepting writes. Any write racing with this call either lands
    /// before it or is dropped.
    pub fn close(&self) {
        self.data.lock().remove(&self.id);
    }
}
