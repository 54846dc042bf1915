use fitrecord_domain::error::LinkError;
use fitrecord_domain::gatt::{CharacteristicFilter, ConnectionState, GattService, ServiceFilter};
use fitrecord_domain::id::PeripheralAddress;

use super::disconnector::Disconnector;
use super::queue::{OperationQueue, SetupOperation};
use crate::ports::{ConnectionCallbacks, Notification};

/// Something that happened on the link.
#[derive(Debug)]
pub enum LinkEvent {
    Connected,
    ConnectFailed(LinkError),
    ServicesDiscovered(Vec<GattService>),
    DiscoveryFailed(LinkError),
    /// A setup operation finished; reads carry the value.
    OperationCompleted {
        operation: SetupOperation,
        result: Result<Option<Vec<u8>>, LinkError>,
    },
    Notification(Notification),
    /// The [`Disconnector`] fired.
    DisconnectRequested,
    /// The link is gone. `requested` is `true` when we closed it.
    Disconnected { requested: bool },
}

/// What the driver must do next on the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCommand {
    Connect,
    DiscoverServices,
    Execute(SetupOperation),
    Disconnect,
}

/// Connection state machine for one peripheral.
///
/// Performs no IO: the driver feeds it [`LinkEvent`]s and carries out the
/// single [`LinkCommand`] each step returns, so at most one link operation
/// is ever outstanding. Callbacks fire from inside [`handle`](Self::handle).
pub struct GattConnection<C> {
    address: PeripheralAddress,
    state: ConnectionState,
    services: ServiceFilter,
    characteristics: CharacteristicFilter,
    queue: OperationQueue,
    disconnector: Disconnector,
    callbacks: C,
}

impl<C: ConnectionCallbacks> GattConnection<C> {
    pub fn new(
        address: PeripheralAddress,
        services: ServiceFilter,
        characteristics: CharacteristicFilter,
        disconnector: Disconnector,
        callbacks: C,
    ) -> Self {
        Self {
            address,
            state: ConnectionState::Disconnected,
            services,
            characteristics,
            queue: OperationQueue::new(),
            disconnector,
            callbacks,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn address(&self) -> &PeripheralAddress {
        &self.address
    }

    #[must_use]
    pub fn disconnector(&self) -> &Disconnector {
        &self.disconnector
    }

    /// Begin connecting.
    pub fn start(&mut self) -> LinkCommand {
        self.state = ConnectionState::Connecting;
        tracing::debug!(address = %self.address, "connecting");
        LinkCommand::Connect
    }

    /// Advance on `event`.
    pub fn handle(&mut self, event: LinkEvent) -> Option<LinkCommand> {
        if self.state.is_terminal() {
            tracing::trace!(address = %self.address, ?event, "ignoring event on closed connection");
            return None;
        }

        match event {
            LinkEvent::Connected if self.state == ConnectionState::Connecting => {
                self.state = ConnectionState::ServiceDiscovery;
                Some(LinkCommand::DiscoverServices)
            }
            LinkEvent::ConnectFailed(err) => {
                tracing::warn!(address = %self.address, %err, "connection failed");
                self.fail()
            }
            LinkEvent::ServicesDiscovered(services)
                if self.state == ConnectionState::ServiceDiscovery =>
            {
                self.begin_setup(&services)
            }
            LinkEvent::DiscoveryFailed(err) => {
                tracing::warn!(address = %self.address, %err, "service discovery failed");
                self.fail()
            }
            LinkEvent::OperationCompleted { operation, result }
                if self.state == ConnectionState::SettingUp =>
            {
                self.complete_operation(&operation, result)
            }
            LinkEvent::Notification(notification) => {
                if matches!(
                    self.state,
                    ConnectionState::SettingUp | ConnectionState::Active
                ) {
                    self.callbacks
                        .on_data(notification.characteristic, &notification.value);
                }
                None
            }
            LinkEvent::DisconnectRequested => {
                self.state = ConnectionState::Disconnecting;
                Some(LinkCommand::Disconnect)
            }
            LinkEvent::Disconnected { requested } => {
                if requested {
                    tracing::info!(address = %self.address, "disconnected");
                } else {
                    tracing::warn!(address = %self.address, state = %self.state, "link lost");
                }
                self.state = ConnectionState::Disconnected;
                self.queue.clear();
                self.callbacks.on_disconnect(!requested);
                None
            }
            other => {
                tracing::debug!(address = %self.address, state = %self.state, event = ?other, "unexpected event");
                None
            }
        }
    }

    fn begin_setup(&mut self, services: &[GattService]) -> Option<LinkCommand> {
        if !self.services.intersects(services) {
            tracing::info!(address = %self.address, "peripheral exposes no supported service");
            self.state = ConnectionState::Disconnecting;
            self.disconnector.disconnect();
            return Some(LinkCommand::Disconnect);
        }

        self.state = ConnectionState::SettingUp;
        for service in services.iter().filter(|svc| self.services.contains(&svc.uuid)) {
            for characteristic in &service.characteristics {
                if let Some(mode) = self.characteristics.access_mode(characteristic) {
                    tracing::debug!(
                        address = %self.address,
                        characteristic = %characteristic.uuid,
                        %mode,
                        "queueing setup operation"
                    );
                    self.queue.enqueue(SetupOperation {
                        characteristic: characteristic.clone(),
                        mode,
                    });
                }
            }
        }
        self.advance()
    }

    fn complete_operation(
        &mut self,
        operation: &SetupOperation,
        result: Result<Option<Vec<u8>>, LinkError>,
    ) -> Option<LinkCommand> {
        if !self.queue.complete(operation) {
            tracing::debug!(address = %self.address, characteristic = %operation.characteristic.uuid, "stray completion");
            return None;
        }
        match result {
            Ok(Some(value)) => self
                .callbacks
                .on_data(operation.characteristic.uuid, &value),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(address = %self.address, %err, "setup operation failed, continuing");
            }
        }
        self.advance()
    }

    fn advance(&mut self) -> Option<LinkCommand> {
        if let Some(next) = self.queue.start_next() {
            return Some(LinkCommand::Execute(next));
        }
        if self.queue.is_drained() {
            self.state = ConnectionState::Active;
            tracing::info!(address = %self.address, "connected");
            self.callbacks.on_connect(self.disconnector.clone());
        }
        None
    }

    fn fail(&mut self) -> Option<LinkCommand> {
        self.state = ConnectionState::Failed;
        self.queue.clear();
        self.callbacks.on_disconnect(true);
        Some(LinkCommand::Disconnect)
    }
}
