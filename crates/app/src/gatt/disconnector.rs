use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// One-shot handle ending a peripheral connection.
///
/// Clones share the same state. [`disconnect`](Self::disconnect) never
/// blocks, can be called from any thread (including from inside a
/// connection callback) and only has an effect the first time.
#[derive(Debug, Clone, Default)]
pub struct Disconnector {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    requested: AtomicBool,
    notify: Notify,
}

impl Disconnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the connection to close. Returns `true` for the call that
    /// actually fired the request.
    pub fn disconnect(&self) -> bool {
        let first = !self.inner.requested.swap(true, Ordering::AcqRel);
        if first {
            self.inner.notify.notify_one();
        }
        first
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::Acquire)
    }

    /// Resolves once a disconnect was requested.
    pub async fn requested(&self) {
        if self.is_requested() {
            return;
        }
        self.inner.notify.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn should_fire_only_once() {
        let disconnector = Disconnector::new();
        let clone = disconnector.clone();
        assert!(disconnector.disconnect());
        assert!(!clone.disconnect());
        assert!(!disconnector.disconnect());
        assert!(clone.is_requested());
    }

    #[tokio::test]
    async fn should_wake_waiter_when_fired_from_another_thread() {
        let disconnector = Disconnector::new();
        let remote = disconnector.clone();
        std::thread::spawn(move || {
            remote.disconnect();
        });
        tokio::time::timeout(Duration::from_secs(5), disconnector.requested())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn should_resolve_immediately_when_already_fired() {
        let disconnector = Disconnector::new();
        disconnector.disconnect();
        disconnector.requested().await;
        disconnector.requested().await;
    }
}
