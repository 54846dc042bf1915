//! Scan port — advertisement discovery on the radio.

use std::future::Future;
use std::pin::Pin;

use fitrecord_domain::error::ScanError;
use fitrecord_domain::id::PeripheralAddress;
use tokio_stream::Stream;

/// One advertisement seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub address: PeripheralAddress,
    /// Advertised local name, when present.
    pub name: Option<String>,
}

/// Raw advertisement stream. May repeat the same peripheral.
pub type AdvertisementStream = Pin<Box<dyn Stream<Item = Advertisement> + Send>>;

/// Radio able to scan for advertising peripherals.
///
/// Implementations only report peripherals advertising at least one of
/// [`ADVERTISED_SERVICES`](fitrecord_domain::gatt::ADVERTISED_SERVICES).
pub trait ScanBackend: Send + Sync + 'static {
    /// Start scanning. Fails with [`ScanError::Unavailable`] when the radio
    /// is off or missing.
    fn start(&self) -> impl Future<Output = Result<AdvertisementStream, ScanError>> + Send;

    /// Stop scanning.
    fn stop(&self) -> impl Future<Output = Result<(), ScanError>> + Send;
}
