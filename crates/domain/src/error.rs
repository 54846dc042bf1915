//! Error types shared across the workspace.
//!
//! Each layer defines its own typed errors; adapters convert their
//! stack-specific failures into these at the port boundary.

use uuid::Uuid;

use crate::gatt::AccessMode;
use crate::id::{PeripheralAddress, SensorId};

/// Boxed source error carried across port boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure to start or run a discovery scan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The radio is off, missing, or scanning is not permitted.
    #[error("scanning unavailable")]
    Unavailable(#[source] BoxError),

    /// A scan session is already running on this scanner.
    #[error("a scan is already running")]
    AlreadyScanning,
}

/// Transport-level failures of one peripheral link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// No peripheral with this address is known to the radio.
    #[error("peripheral {0} not found")]
    PeripheralNotFound(PeripheralAddress),

    /// Opening the link failed before service discovery.
    #[error("failed to connect")]
    ConnectFailed(#[source] BoxError),

    /// Enumerating services and characteristics failed.
    #[error("service discovery failed")]
    Discovery(#[source] BoxError),

    /// A subscribe or read setup operation failed.
    #[error("{mode} setup of characteristic {characteristic} failed")]
    Operation {
        characteristic: Uuid,
        mode: AccessMode,
        #[source]
        source: BoxError,
    },

    /// The link is gone.
    #[error("peripheral disconnected")]
    Disconnected,
}

/// A characteristic payload that produced no metrics.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// No decoding rule exists for this characteristic.
    #[error("no decoder for characteristic {0}")]
    Unrecognized(Uuid),

    /// A mandatory field is missing.
    #[error("{format} payload needs at least {expected} bytes, got {actual}")]
    Truncated {
        format: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Sensor registry lifecycle failures.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// `init` was called twice without `destroy` in between.
    #[error("sensor registry already initialised")]
    AlreadyInitialized,

    /// Two configuration entries share an id.
    #[error("duplicate sensor id {0}")]
    DuplicateSensor(SensorId),
}

/// Recording session failures.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Registry initialisation failed; the session was rolled back.
    #[error("failed to initialise sensors")]
    Registry(#[from] RegistryError),
}

/// The external telemetry consumer rejected or failed to process a frame.
#[derive(Debug, thiserror::Error)]
#[error("telemetry consumer failed")]
pub struct SinkError(#[source] pub BoxError);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_scan_unavailable() {
        let err = ScanError::Unavailable("radio off".into());
        assert_eq!(err.to_string(), "scanning unavailable");
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "radio off");
    }

    #[test]
    fn should_display_operation_failure_with_mode() {
        let err = LinkError::Operation {
            characteristic: crate::gatt::BATTERY_LEVEL,
            mode: AccessMode::Read,
            source: "gatt error 133".into(),
        };
        assert_eq!(
            err.to_string(),
            "read setup of characteristic 00002a19-0000-1000-8000-00805f9b34fb failed"
        );
    }

    #[test]
    fn should_display_truncated_payload() {
        let err = DecodeError::Truncated {
            format: "heart rate",
            expected: 2,
            actual: 1,
        };
        assert_eq!(
            err.to_string(),
            "heart rate payload needs at least 2 bytes, got 1"
        );
    }

    #[test]
    fn should_display_peripheral_not_found() {
        let err = LinkError::PeripheralNotFound(PeripheralAddress::new("aa:bb"));
        assert_eq!(err.to_string(), "peripheral AA:BB not found");
    }

    #[test]
    fn should_wrap_registry_error_into_session_error() {
        let err: SessionError = RegistryError::AlreadyInitialized.into();
        assert!(matches!(
            err,
            SessionError::Registry(RegistryError::AlreadyInitialized)
        ));
    }
}
