use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use fitrecord_app::ports::{GattLink, LinkProvider, NotificationStream};
use fitrecord_domain::error::LinkError;
use fitrecord_domain::gatt::{AccessMode, BATTERY_LEVEL, GattCharacteristic, GattService};
use fitrecord_domain::id::PeripheralAddress;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::VirtualHub;
use crate::devices::VirtualPeripheral;

/// [`LinkProvider`] over the devices of a [`VirtualHub`].
#[derive(Debug, Clone)]
pub struct VirtualLinks {
    hub: VirtualHub,
}

impl VirtualLinks {
    pub(crate) fn new(hub: VirtualHub) -> Self {
        Self { hub }
    }
}

impl LinkProvider for VirtualLinks {
    type Link = VirtualLink;

    async fn open(&self, address: &PeripheralAddress) -> Result<VirtualLink, LinkError> {
        let device = self
            .hub
            .device(address)
            .ok_or_else(|| LinkError::PeripheralNotFound(address.clone()))?;
        Ok(VirtualLink::new(device))
    }
}

/// One link to a simulated peripheral. Only subscribed characteristics are
/// delivered on the notification stream.
#[derive(Debug)]
pub struct VirtualLink {
    device: Arc<VirtualPeripheral>,
    connected: AtomicBool,
    subscribed: Arc<Mutex<HashSet<Uuid>>>,
    attached: Mutex<Option<u64>>,
}

impl VirtualLink {
    fn new(device: Arc<VirtualPeripheral>) -> Self {
        Self {
            device,
            connected: AtomicBool::new(false),
            subscribed: Arc::new(Mutex::new(HashSet::new())),
            attached: Mutex::new(None),
        }
    }

    fn ensure_connected(&self) -> Result<(), LinkError> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(LinkError::Disconnected)
        }
    }

    fn characteristic(&self, uuid: Uuid) -> Option<GattCharacteristic> {
        self.device
            .services()
            .into_iter()
            .flat_map(|service| service.characteristics)
            .find(|characteristic| characteristic.uuid == uuid)
    }
}

fn unsupported(characteristic: &GattCharacteristic, mode: AccessMode) -> LinkError {
    LinkError::Operation {
        characteristic: characteristic.uuid,
        mode,
        source: format!("characteristic does not support {mode}").into(),
    }
}

impl GattLink for VirtualLink {
    async fn connect(&self) -> Result<(), LinkError> {
        if !self.device.is_reachable() {
            return Err(LinkError::ConnectFailed(
                format!("{} is out of range", self.device.address()).into(),
            ));
        }
        self.connected.store(true, Ordering::Release);
        tracing::debug!(address = %self.device.address(), "virtual link connected");
        Ok(())
    }

    async fn discover_services(&self) -> Result<Vec<GattService>, LinkError> {
        self.ensure_connected()?;
        Ok(self.device.services())
    }

    async fn subscribe(&self, characteristic: &GattCharacteristic) -> Result<(), LinkError> {
        self.ensure_connected()?;
        let supported = self
            .characteristic(characteristic.uuid)
            .is_some_and(|c| c.properties.notify || c.properties.indicate);
        if !supported {
            return Err(unsupported(characteristic, AccessMode::Notify));
        }
        self.subscribed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(characteristic.uuid);
        Ok(())
    }

    async fn read(&self, characteristic: &GattCharacteristic) -> Result<Vec<u8>, LinkError> {
        self.ensure_connected()?;
        if characteristic.uuid == BATTERY_LEVEL {
            Ok(vec![self.device.battery_level()])
        } else {
            Err(unsupported(characteristic, AccessMode::Read))
        }
    }

    async fn notifications(&self) -> Result<NotificationStream, LinkError> {
        self.ensure_connected()?;
        let (id, rx) = self.device.attach();
        if let Some(previous) = self
            .attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(id)
        {
            self.device.detach(previous);
        }

        let subscribed = Arc::clone(&self.subscribed);
        let stream = UnboundedReceiverStream::new(rx).filter(move |notification| {
            subscribed
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&notification.characteristic)
        });
        Ok(Box::pin(stream))
    }

    async fn disconnect(&self) -> Result<(), LinkError> {
        self.connected.store(false, Ordering::Release);
        self.subscribed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        if let Some(id) = self
            .attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            self.device.detach(id);
        }
        tracing::debug!(address = %self.device.address(), "virtual link disconnected");
        Ok(())
    }
}
