use std::sync::Arc;
use std::time::Duration;

use fitrecord_domain::error::LinkError;
use fitrecord_domain::gatt::{AccessMode, CharacteristicFilter, ServiceFilter};
use fitrecord_domain::id::PeripheralAddress;
use tokio::runtime::Handle;
use tokio_stream::StreamExt;

use super::connection::{GattConnection, LinkCommand, LinkEvent};
use super::disconnector::Disconnector;
use crate::ports::{
    ConnectionCallbacks, GattLink, LinkProvider, Notification, NotificationStream,
    PeripheralConnector,
};

/// How long opening a link may take before it counts as failed.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Drive `connection` over `link` until it reaches a terminal state.
///
/// Notifications are only pulled between commands; the link buffers them
/// while a setup operation is outstanding.
pub async fn run_connection<L, C>(
    link: L,
    mut connection: GattConnection<C>,
    connect_timeout: Duration,
) where
    L: GattLink,
    C: ConnectionCallbacks,
{
    let disconnector = connection.disconnector().clone();
    let mut notifications: Option<NotificationStream> = None;
    let mut command = Some(connection.start());

    loop {
        let event = match command.take() {
            // never raced against the disconnector, which has usually fired already
            Some(LinkCommand::Disconnect) => {
                execute(&link, LinkCommand::Disconnect, &mut notifications, connect_timeout).await
            }
            Some(next) => tokio::select! {
                biased;
                () = disconnector.requested() => LinkEvent::DisconnectRequested,
                event = execute(&link, next, &mut notifications, connect_timeout) => event,
            },
            None if connection.state().is_terminal() => break,
            None => tokio::select! {
                biased;
                () = disconnector.requested() => LinkEvent::DisconnectRequested,
                next = next_notification(&mut notifications) => match next {
                    Some(notification) => LinkEvent::Notification(notification),
                    None => LinkEvent::Disconnected { requested: false },
                },
            },
        };
        command = connection.handle(event);
    }
}

async fn execute<L: GattLink>(
    link: &L,
    command: LinkCommand,
    notifications: &mut Option<NotificationStream>,
    connect_timeout: Duration,
) -> LinkEvent {
    match command {
        LinkCommand::Connect => match open(link, connect_timeout).await {
            Ok(stream) => {
                *notifications = Some(stream);
                LinkEvent::Connected
            }
            Err(err) => LinkEvent::ConnectFailed(err),
        },
        LinkCommand::DiscoverServices => match link.discover_services().await {
            Ok(services) => LinkEvent::ServicesDiscovered(services),
            Err(err) => LinkEvent::DiscoveryFailed(err),
        },
        LinkCommand::Execute(operation) => {
            let result = match operation.mode {
                AccessMode::Notify => link.subscribe(&operation.characteristic).await.map(|()| None),
                AccessMode::Read => link.read(&operation.characteristic).await.map(Some),
            };
            LinkEvent::OperationCompleted { operation, result }
        }
        LinkCommand::Disconnect => {
            if let Err(err) = link.disconnect().await {
                tracing::debug!(%err, "disconnect failed");
            }
            *notifications = None;
            LinkEvent::Disconnected { requested: true }
        }
    }
}

async fn open<L: GattLink>(link: &L, connect_timeout: Duration) -> Result<NotificationStream, LinkError> {
    tokio::time::timeout(connect_timeout, link.connect())
        .await
        .map_err(|elapsed| LinkError::ConnectFailed(Box::new(elapsed)))??;
    link.notifications().await
}

async fn next_notification(notifications: &mut Option<NotificationStream>) -> Option<Notification> {
    match notifications {
        Some(stream) => stream.next().await,
        None => None,
    }
}

/// [`PeripheralConnector`] running every connection as a task on `runtime`.
pub struct GattClient<P> {
    provider: Arc<P>,
    runtime: Handle,
    connect_timeout: Duration,
}

impl<P: LinkProvider> GattClient<P> {
    pub fn new(provider: P, runtime: Handle) -> Self {
        Self {
            provider: Arc::new(provider),
            runtime,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

impl<P: LinkProvider> PeripheralConnector for GattClient<P> {
    fn connect(
        &self,
        address: PeripheralAddress,
        services: ServiceFilter,
        characteristics: CharacteristicFilter,
        callbacks: Box<dyn ConnectionCallbacks>,
    ) -> Disconnector {
        let disconnector = Disconnector::new();
        let provider = Arc::clone(&self.provider);
        let connect_timeout = self.connect_timeout;
        let mut connection = GattConnection::new(
            address.clone(),
            services,
            characteristics,
            disconnector.clone(),
            callbacks,
        );

        let cancel = disconnector.clone();
        self.runtime.spawn(async move {
            let opened = tokio::select! {
                biased;
                () = cancel.requested() => None,
                opened = provider.open(&address) => Some(opened),
            };
            match opened {
                Some(Ok(link)) => run_connection(link, connection, connect_timeout).await,
                Some(Err(err)) => {
                    connection.start();
                    connection.handle(LinkEvent::ConnectFailed(err));
                }
                None => {
                    tracing::debug!(%address, "connection cancelled while locating peripheral");
                    connection.start();
                    connection.handle(LinkEvent::Disconnected { requested: true });
                }
            }
        });

        disconnector
    }
}
