use std::collections::VecDeque;

use fitrecord_domain::gatt::{AccessMode, GattCharacteristic};

/// One pending subscribe or read issued during connection setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupOperation {
    pub characteristic: GattCharacteristic,
    pub mode: AccessMode,
}

/// FIFO of setup operations with at most one operation in flight.
///
/// The radio stack rejects overlapping GATT operations, so the next
/// operation is handed out only after the previous one completed.
#[derive(Debug, Default)]
pub struct OperationQueue {
    pending: VecDeque<SetupOperation>,
    in_flight: Option<SetupOperation>,
}

impl OperationQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, operation: SetupOperation) {
        self.pending.push_back(operation);
    }

    /// Hand out the next operation, or `None` while one is still in flight
    /// or nothing is pending.
    pub fn start_next(&mut self) -> Option<SetupOperation> {
        if self.in_flight.is_some() {
            return None;
        }
        let next = self.pending.pop_front()?;
        self.in_flight = Some(next.clone());
        Some(next)
    }

    /// Mark `operation` finished. Returns `false` when it is not the
    /// operation in flight (the completion is then ignored).
    pub fn complete(&mut self, operation: &SetupOperation) -> bool {
        if self.in_flight.as_ref() == Some(operation) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn in_flight(&self) -> Option<&SetupOperation> {
        self.in_flight.as_ref()
    }

    /// Nothing pending and nothing in flight.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_none()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len() + usize::from(self.in_flight.is_some())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is_drained()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.in_flight = None;
    }
}
