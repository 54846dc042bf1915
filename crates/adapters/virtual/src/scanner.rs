use std::sync::{Mutex, PoisonError};

use fitrecord_app::ports::{Advertisement, AdvertisementStream, ScanBackend};
use fitrecord_domain::error::ScanError;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::VirtualHub;

/// How many times each device is advertised per scan. Real radios repeat
/// advertisements, so consumers see duplicates.
const ADVERTISEMENT_REPEATS: usize = 2;

/// [`ScanBackend`] advertising every device of a [`VirtualHub`].
///
/// The stream stays open until [`stop`](ScanBackend::stop).
#[derive(Debug)]
pub struct VirtualScanner {
    hub: VirtualHub,
    feed: Mutex<Option<mpsc::Sender<Advertisement>>>,
}

impl VirtualScanner {
    pub(crate) fn new(hub: VirtualHub) -> Self {
        Self {
            hub,
            feed: Mutex::new(None),
        }
    }
}

impl ScanBackend for VirtualScanner {
    async fn start(&self) -> Result<AdvertisementStream, ScanError> {
        let repeats = self.hub.devices().len() * ADVERTISEMENT_REPEATS;
        let (tx, rx) = mpsc::channel(repeats.max(1));
        for _ in 0..ADVERTISEMENT_REPEATS {
            for device in self.hub.devices() {
                let advertisement = Advertisement {
                    address: device.address().clone(),
                    name: Some(device.name().to_string()),
                };
                if tx.try_send(advertisement).is_err() {
                    tracing::warn!("virtual advertisement dropped");
                }
            }
        }
        *self.feed.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn stop(&self) -> Result<(), ScanError> {
        self.feed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_stream::StreamExt;

    use super::*;

    #[tokio::test]
    async fn should_advertise_each_device_repeatedly() {
        let hub = VirtualHub::default();
        let scanner = hub.scanner();
        let stream = scanner.start().await.unwrap();
        scanner.stop().await.unwrap();

        let advertisements: Vec<_> = stream.collect().await;
        assert_eq!(advertisements.len(), 6);
        assert_eq!(advertisements[0].address, advertisements[3].address);
        assert_eq!(advertisements[0].name.as_deref(), Some("Virtual HRM"));
    }

    #[tokio::test(start_paused = true)]
    async fn should_keep_stream_open_until_stopped() {
        let hub = VirtualHub::default();
        let scanner = hub.scanner();
        let mut stream = scanner.start().await.unwrap();
        for _ in 0..6 {
            stream.next().await.unwrap();
        }

        let pending = tokio::time::timeout(Duration::from_secs(1), stream.next()).await;
        assert!(pending.is_err());

        scanner.stop().await.unwrap();
        assert!(stream.next().await.is_none());
    }
}
