//! Peripheral connector port — what sensors use to reach a peripheral.
//!
//! Unlike the async [`GattLink`](super::GattLink), this port is synchronous
//! and object safe: sensors hold it as `Arc<dyn PeripheralConnector>` and
//! receive results through [`ConnectionCallbacks`].

use fitrecord_domain::gatt::{CharacteristicFilter, ServiceFilter};
use fitrecord_domain::id::PeripheralAddress;
use uuid::Uuid;

use crate::gatt::Disconnector;

/// Notifications about one connection. Invoked from the connection task,
/// never concurrently for the same connection.
pub trait ConnectionCallbacks: Send + 'static {
    /// Setup finished; the peripheral streams data from now on.
    fn on_connect(&mut self, disconnector: Disconnector);

    /// The connection ended. `was_failure` is `false` only after a local
    /// disconnect request.
    fn on_disconnect(&mut self, was_failure: bool);

    /// A characteristic value arrived (read result or notification).
    fn on_data(&mut self, characteristic: Uuid, payload: &[u8]);
}

impl<T: ConnectionCallbacks + ?Sized> ConnectionCallbacks for Box<T> {
    fn on_connect(&mut self, disconnector: Disconnector) {
        (**self).on_connect(disconnector);
    }

    fn on_disconnect(&mut self, was_failure: bool) {
        (**self).on_disconnect(was_failure);
    }

    fn on_data(&mut self, characteristic: Uuid, payload: &[u8]) {
        (**self).on_data(characteristic, payload);
    }
}

/// Starts connections in the background.
pub trait PeripheralConnector: Send + Sync {
    /// Connect to `address` and return immediately.
    ///
    /// The returned [`Disconnector`] is the same handle later passed to
    /// [`ConnectionCallbacks::on_connect`]; firing it before setup completes
    /// cancels the attempt.
    fn connect(
        &self,
        address: PeripheralAddress,
        services: ServiceFilter,
        characteristics: CharacteristicFilter,
        callbacks: Box<dyn ConnectionCallbacks>,
    ) -> Disconnector;
}
