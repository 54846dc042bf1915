//! BLE scanner — reports peripherals advertising fitness services.

use std::sync::{Mutex, PoisonError};

use btleplug::api::{Central, CentralEvent, Peripheral as _, ScanFilter};
use btleplug::platform::Adapter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt as _;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use fitrecord_app::ports::{Advertisement, AdvertisementStream, ScanBackend};
use fitrecord_domain::error::ScanError;
use fitrecord_domain::gatt::ADVERTISED_SERVICES;
use fitrecord_domain::id::PeripheralAddress;

use crate::error::BleError;

const ADVERTISEMENT_BUFFER: usize = 32;

/// [`ScanBackend`] over one btleplug adapter.
///
/// Repeated advertisements are passed through; de-duplication happens in
/// the application's `DeviceScanner`.
pub struct BtleplugScanner {
    adapter: Adapter,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl BtleplugScanner {
    #[must_use]
    pub fn new(adapter: Adapter) -> Self {
        Self {
            adapter,
            forwarder: Mutex::new(None),
        }
    }

    fn replace_forwarder(&self, next: Option<JoinHandle<()>>) {
        let previous = std::mem::replace(
            &mut *self.forwarder.lock().unwrap_or_else(PoisonError::into_inner),
            next,
        );
        if let Some(handle) = previous {
            handle.abort();
        }
    }
}

/// Whether the advertised service list looks like a fitness peripheral.
/// Some hosts do not apply the scan filter, others omit the list.
fn is_fitness_peripheral(services: &[Uuid]) -> bool {
    services.is_empty() || services.iter().any(|s| ADVERTISED_SERVICES.contains(s))
}

async fn forward(
    adapter: Adapter,
    mut events: std::pin::Pin<Box<dyn tokio_stream::Stream<Item = CentralEvent> + Send>>,
    tx: mpsc::Sender<Advertisement>,
) {
    while let Some(event) = events.next().await {
        let (CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id)) = event else {
            continue;
        };
        let Ok(peripheral) = adapter.peripheral(&id).await else {
            continue;
        };
        let Ok(Some(props)) = peripheral.properties().await else {
            continue;
        };
        if !is_fitness_peripheral(&props.services) {
            tracing::trace!(address = %props.address, "ignoring non-fitness advertisement");
            continue;
        }

        let advertisement = Advertisement {
            address: PeripheralAddress::new(props.address.to_string()),
            name: props.local_name,
        };
        tracing::trace!(address = %advertisement.address, rssi = ?props.rssi, "advertisement");
        if tx.send(advertisement).await.is_err() {
            break;
        }
    }
}

impl ScanBackend for BtleplugScanner {
    async fn start(&self) -> Result<AdvertisementStream, ScanError> {
        let events = self.adapter.events().await.map_err(BleError::from)?;
        self.adapter
            .start_scan(ScanFilter {
                services: ADVERTISED_SERVICES.to_vec(),
            })
            .await
            .map_err(BleError::from)?;

        let (tx, rx) = mpsc::channel(ADVERTISEMENT_BUFFER);
        let handle = tokio::spawn(forward(self.adapter.clone(), events, tx));
        self.replace_forwarder(Some(handle));

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn stop(&self) -> Result<(), ScanError> {
        self.replace_forwarder(None);
        self.adapter.stop_scan().await.map_err(BleError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use fitrecord_domain::gatt::{BATTERY_SERVICE, HEART_RATE_SERVICE};

    use super::*;

    #[test]
    fn should_accept_fitness_services() {
        assert!(is_fitness_peripheral(&[BATTERY_SERVICE, HEART_RATE_SERVICE]));
    }

    #[test]
    fn should_reject_unrelated_services() {
        assert!(!is_fitness_peripheral(&[BATTERY_SERVICE]));
    }

    #[test]
    fn should_accept_when_host_omits_service_list() {
        assert!(is_fitness_peripheral(&[]));
    }
}
