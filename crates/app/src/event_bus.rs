//! In-process session event bus backed by a tokio broadcast channel.

use fitrecord_domain::sample::Sample;
use tokio::sync::broadcast;

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeactivationReason {
    /// `deactivate` was called.
    Requested,
    /// The consumer reported no recording status for too long.
    Idle,
}

/// Something observers of a recording session may care about.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Activated,
    /// Values derived by the consumer from the latest frame.
    SensorData(Sample),
    StatusText(String),
    Deactivated { reason: DeactivationReason },
}

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped).
#[derive(Debug, Clone)]
pub struct SessionEventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events on this bus.
    ///
    /// Returns a receiver that will get all events published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: SessionEvent) {
        // fails only when nobody listens
        let _ = self.sender.send(event);
    }
}
