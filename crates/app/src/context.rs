//! Platform services a recording session hands to its sensors.

use std::sync::Arc;

use crate::ports::{LocationSource, PeripheralConnector, WakeLock};

/// The platform facilities available to sensors.
#[derive(Clone)]
pub struct Platform {
    pub connector: Arc<dyn PeripheralConnector>,
    pub location: Arc<dyn LocationSource>,
    pub wake_lock: Arc<dyn WakeLock>,
}

/// Holds the host awake until dropped.
pub struct WakeGuard {
    lock: Arc<dyn WakeLock>,
}

impl WakeGuard {
    pub fn acquire(lock: Arc<dyn WakeLock>) -> Self {
        lock.acquire();
        tracing::debug!("wake lock acquired");
        Self { lock }
    }
}

impl Drop for WakeGuard {
    fn drop(&mut self) {
        self.lock.release();
        tracing::debug!("wake lock released");
    }
}

/// Scope of one activation: the platform handles plus a held wake lock.
///
/// Dropping the context releases the wake lock.
pub struct SessionContext {
    platform: Platform,
    _wake: WakeGuard,
}

impl SessionContext {
    pub fn new(platform: Platform) -> Self {
        let wake = WakeGuard::acquire(Arc::clone(&platform.wake_lock));
        Self {
            platform,
            _wake: wake,
        }
    }

    #[must_use]
    pub fn connector(&self) -> &dyn PeripheralConnector {
        self.platform.connector.as_ref()
    }

    #[must_use]
    pub fn location(&self) -> &Arc<dyn LocationSource> {
        &self.platform.location
    }
}


#[cfg(test)]
mod tests {
    use super::testing::Fakes;
    use super::*;

    #[test]
    fn should_hold_wake_lock_for_context_lifetime() {
        let fakes = Fakes::new();
        let context = SessionContext::new(fakes.platform());
        assert_eq!(fakes.wake_count(), 1);
        drop(context);
        assert_eq!(fakes.wake_count(), 0);
    }
}
