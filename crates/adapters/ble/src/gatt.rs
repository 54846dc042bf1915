//! GATT links over btleplug.
//!
//! [`BtleplugLinks`] locates a peripheral by address (scanning briefly when
//! the host does not know it yet) and hands out a [`BtleplugLink`] that the
//! connection driver operates.

use std::time::Duration;

use btleplug::api::{
    Central, CentralEvent, CharPropFlags, Characteristic, Peripheral as _, ScanFilter,
};
use btleplug::platform::{Adapter, Peripheral};
use tokio_stream::StreamExt as _;

use fitrecord_app::ports::{GattLink, LinkProvider, Notification, NotificationStream};
use fitrecord_domain::error::LinkError;
use fitrecord_domain::gatt::{
    ADVERTISED_SERVICES, AccessMode, CharacteristicProperties, GattCharacteristic, GattService,
};
use fitrecord_domain::id::PeripheralAddress;

use crate::error::BleError;

/// Opens [`BtleplugLink`]s on one host adapter.
pub struct BtleplugLinks {
    adapter: Adapter,
    discovery_timeout: Duration,
}

impl BtleplugLinks {
    /// `discovery_timeout` bounds the scan used to find a peripheral the
    /// host has not seen yet.
    #[must_use]
    pub fn new(adapter: Adapter, discovery_timeout: Duration) -> Self {
        Self {
            adapter,
            discovery_timeout,
        }
    }

    async fn known_peripheral(
        &self,
        address: &PeripheralAddress,
    ) -> Result<Option<Peripheral>, BleError> {
        let peripherals = self.adapter.peripherals().await?;
        Ok(peripherals
            .into_iter()
            .find(|p| PeripheralAddress::new(p.address().to_string()) == *address))
    }

    /// Scan until `address` shows up or the discovery timeout elapses.
    async fn discover(&self, address: &PeripheralAddress) -> Result<Option<Peripheral>, BleError> {
        let mut events = self.adapter.events().await?;
        self.adapter
            .start_scan(ScanFilter {
                services: ADVERTISED_SERVICES.to_vec(),
            })
            .await?;

        let deadline = tokio::time::Instant::now() + self.discovery_timeout;
        let mut found = None;
        while tokio::time::Instant::now() < deadline {
            let remaining = deadline - tokio::time::Instant::now();
            match tokio::time::timeout(remaining, events.next()).await {
                Ok(Some(CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id))) => {
                    let Ok(peripheral) = self.adapter.peripheral(&id).await else {
                        continue;
                    };
                    if PeripheralAddress::new(peripheral.address().to_string()) == *address {
                        found = Some(peripheral);
                        break;
                    }
                }
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => break,
            }
        }

        if let Err(err) = self.adapter.stop_scan().await {
            tracing::debug!(%err, "failed to stop discovery scan");
        }
        Ok(found)
    }
}

impl LinkProvider for BtleplugLinks {
    type Link = BtleplugLink;

    async fn open(&self, address: &PeripheralAddress) -> Result<BtleplugLink, LinkError> {
        let known = self
            .known_peripheral(address)
            .await
            .map_err(BleError::into_connect)?;
        let peripheral = match known {
            Some(peripheral) => peripheral,
            None => {
                tracing::debug!(%address, "peripheral unknown to host, scanning");
                self.discover(address)
                    .await
                    .map_err(BleError::into_connect)?
                    .ok_or_else(|| LinkError::PeripheralNotFound(address.clone()))?
            }
        };

        Ok(BtleplugLink {
            adapter: self.adapter.clone(),
            peripheral,
        })
    }
}

/// One peripheral reached through btleplug.
pub struct BtleplugLink {
    adapter: Adapter,
    peripheral: Peripheral,
}

/// Find a GATT characteristic on a peripheral that has already discovered
/// its services.
///
/// # Errors
///
/// Returns [`BleError::CharacteristicNotFound`] if no characteristic with
/// the given UUID is present in the given service.
fn find_characteristic(
    peripheral: &Peripheral,
    wanted: &GattCharacteristic,
) -> Result<Characteristic, BleError> {
    peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == wanted.uuid && c.service_uuid == wanted.service)
        .ok_or(BleError::CharacteristicNotFound { uuid: wanted.uuid })
}

fn properties(flags: CharPropFlags) -> CharacteristicProperties {
    CharacteristicProperties {
        read: flags.contains(CharPropFlags::READ),
        notify: flags.contains(CharPropFlags::NOTIFY),
        indicate: flags.contains(CharPropFlags::INDICATE),
    }
}

fn operation_error(wanted: &GattCharacteristic, mode: AccessMode, err: BleError) -> LinkError {
    LinkError::Operation {
        characteristic: wanted.uuid,
        mode,
        source: Box::new(err),
    }
}

enum LinkSignal {
    Value(Notification),
    Dropped,
}

impl GattLink for BtleplugLink {
    async fn connect(&self) -> Result<(), LinkError> {
        self.peripheral
            .connect()
            .await
            .map_err(|err| BleError::GattConnect(err).into_connect())
    }

    async fn discover_services(&self) -> Result<Vec<GattService>, LinkError> {
        self.peripheral
            .discover_services()
            .await
            .map_err(|err| LinkError::Discovery(Box::new(BleError::Scan(err))))?;

        Ok(self
            .peripheral
            .services()
            .into_iter()
            .map(|service| GattService {
                uuid: service.uuid,
                characteristics: service
                    .characteristics
                    .into_iter()
                    .map(|c| GattCharacteristic {
                        uuid: c.uuid,
                        service: c.service_uuid,
                        properties: properties(c.properties),
                    })
                    .collect(),
            })
            .collect())
    }

    async fn subscribe(&self, characteristic: &GattCharacteristic) -> Result<(), LinkError> {
        let target = find_characteristic(&self.peripheral, characteristic)
            .map_err(|err| operation_error(characteristic, AccessMode::Notify, err))?;
        self.peripheral
            .subscribe(&target)
            .await
            .map_err(|err| operation_error(characteristic, AccessMode::Notify, err.into()))
    }

    async fn read(&self, characteristic: &GattCharacteristic) -> Result<Vec<u8>, LinkError> {
        let target = find_characteristic(&self.peripheral, characteristic)
            .map_err(|err| operation_error(characteristic, AccessMode::Read, err))?;
        self.peripheral
            .read(&target)
            .await
            .map_err(|err| operation_error(characteristic, AccessMode::Read, err.into()))
    }

    /// Pushed values, ending when the host reports the peripheral gone.
    async fn notifications(&self) -> Result<NotificationStream, LinkError> {
        let values = self
            .peripheral
            .notifications()
            .await
            .map_err(|err| BleError::Scan(err).into_connect())?
            .map(|value| {
                LinkSignal::Value(Notification {
                    characteristic: value.uuid,
                    value: value.value,
                })
            });

        let id = self.peripheral.id();
        let drops = self
            .adapter
            .events()
            .await
            .map_err(|err| BleError::Scan(err).into_connect())?
            .filter(move |event| matches!(event, CentralEvent::DeviceDisconnected(peer) if *peer == id))
            .map(|_| LinkSignal::Dropped);

        let stream = values
            .merge(drops)
            .take_while(|signal| matches!(signal, LinkSignal::Value(_)))
            .filter_map(|signal| match signal {
                LinkSignal::Value(notification) => Some(notification),
                LinkSignal::Dropped => None,
            });
        Ok(Box::pin(stream))
    }

    async fn disconnect(&self) -> Result<(), LinkError> {
        self.peripheral
            .disconnect()
            .await
            .map_err(|err| BleError::GattConnect(err).into_connect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_property_flags() {
        let props = properties(CharPropFlags::READ | CharPropFlags::NOTIFY);
        assert!(props.read);
        assert!(props.notify);
        assert!(!props.indicate);
    }

    #[test]
    fn should_map_indicate_only() {
        let props = properties(CharPropFlags::INDICATE);
        assert_eq!(
            props,
            CharacteristicProperties {
                read: false,
                notify: false,
                indicate: true,
            }
        );
    }

    #[test]
    fn should_wrap_operation_failure_with_mode() {
        let wanted = GattCharacteristic {
            uuid: fitrecord_domain::gatt::BATTERY_LEVEL,
            service: fitrecord_domain::gatt::BATTERY_SERVICE,
            properties: CharacteristicProperties::default(),
        };
        let err = operation_error(
            &wanted,
            AccessMode::Read,
            BleError::CharacteristicNotFound { uuid: wanted.uuid },
        );
        assert!(matches!(
            err,
            LinkError::Operation {
                mode: AccessMode::Read,
                ..
            }
        ));
    }
}
