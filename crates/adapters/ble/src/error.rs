//! BLE adapter error types.

use fitrecord_domain::error::{LinkError, ScanError};

/// Errors specific to the BLE adapter.
#[derive(Debug, thiserror::Error)]
pub enum BleError {
    /// No BLE adapter found on the host.
    #[error("no BLE adapter available")]
    NotAvailable,

    /// BLE scan or adapter operation failed.
    #[error("BLE scan error")]
    Scan(#[from] btleplug::Error),

    /// Opening or closing a GATT connection failed.
    #[error("GATT connection failed")]
    GattConnect(#[source] btleplug::Error),

    /// The peripheral does not expose a characteristic we were asked for.
    #[error("characteristic {uuid} not found")]
    CharacteristicNotFound {
        /// UUID that was looked up.
        uuid: uuid::Uuid,
    },
}

impl BleError {
    /// Convert into a [`ScanError`] for propagation across the scan port.
    #[must_use]
    pub fn into_scan(self) -> ScanError {
        ScanError::Unavailable(Box::new(self))
    }

    /// Convert into a [`LinkError`] for a failure while opening a link.
    #[must_use]
    pub fn into_connect(self) -> LinkError {
        LinkError::ConnectFailed(Box::new(self))
    }
}

impl From<BleError> for ScanError {
    fn from(err: BleError) -> Self {
        err.into_scan()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_not_available_error() {
        let err = BleError::NotAvailable;
        assert_eq!(err.to_string(), "no BLE adapter available");
    }

    #[test]
    fn should_display_scan_error() {
        let err = BleError::Scan(btleplug::Error::DeviceNotFound);
        assert_eq!(err.to_string(), "BLE scan error");
    }

    #[test]
    fn should_display_characteristic_not_found() {
        let uuid = fitrecord_domain::gatt::HEART_RATE_MEASUREMENT;
        let err = BleError::CharacteristicNotFound { uuid };
        assert_eq!(
            err.to_string(),
            "characteristic 00002a37-0000-1000-8000-00805f9b34fb not found"
        );
    }

    #[test]
    fn should_convert_not_available_to_scan_unavailable() {
        let err: ScanError = BleError::NotAvailable.into();
        assert!(matches!(err, ScanError::Unavailable(_)));
    }

    #[test]
    fn should_convert_gatt_failure_to_connect_failed() {
        let err = BleError::GattConnect(btleplug::Error::NotConnected).into_connect();
        assert!(matches!(err, LinkError::ConnectFailed(_)));
    }
}
