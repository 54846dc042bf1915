//! GATT link port — one transport-level connection to a peripheral.
//!
//! The application core drives a [`GattLink`] from the connection state
//! machine; it never issues two setup operations on the same link at once.

use std::future::Future;
use std::pin::Pin;

use fitrecord_domain::error::LinkError;
use fitrecord_domain::gatt::{GattCharacteristic, GattService};
use fitrecord_domain::id::PeripheralAddress;
use tokio_stream::Stream;
use uuid::Uuid;

/// A value pushed by the peripheral for a subscribed characteristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub characteristic: Uuid,
    pub value: Vec<u8>,
}

/// Stream of notifications for one link. Ends when the link drops.
pub type NotificationStream = Pin<Box<dyn Stream<Item = Notification> + Send>>;

/// Transport operations on one peripheral.
pub trait GattLink: Send + Sync + 'static {
    /// Open the link.
    fn connect(&self) -> impl Future<Output = Result<(), LinkError>> + Send;

    /// Enumerate services and their characteristics.
    fn discover_services(&self) -> impl Future<Output = Result<Vec<GattService>, LinkError>> + Send;

    /// Enable notifications by writing the configuration descriptor.
    fn subscribe(
        &self,
        characteristic: &GattCharacteristic,
    ) -> impl Future<Output = Result<(), LinkError>> + Send;

    /// Read the current value once.
    fn read(
        &self,
        characteristic: &GattCharacteristic,
    ) -> impl Future<Output = Result<Vec<u8>, LinkError>> + Send;

    /// Stream of pushed values. Called once, right after [`connect`](Self::connect).
    fn notifications(&self) -> impl Future<Output = Result<NotificationStream, LinkError>> + Send;

    /// Close the link.
    fn disconnect(&self) -> impl Future<Output = Result<(), LinkError>> + Send;
}

/// Resolves a peripheral address into a [`GattLink`].
pub trait LinkProvider: Send + Sync + 'static {
    type Link: GattLink;

    fn open(
        &self,
        address: &PeripheralAddress,
    ) -> impl Future<Output = Result<Self::Link, LinkError>> + Send;
}
