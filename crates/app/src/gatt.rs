//! Peripheral connections: a sans-IO state machine plus the task that
//! drives it against a [`GattLink`](crate::ports::GattLink).

mod connection;
mod disconnector;
mod driver;
mod queue;

pub use connection::{GattConnection, LinkCommand, LinkEvent};
pub use disconnector::Disconnector;
pub use driver::{DEFAULT_CONNECT_TIMEOUT, GattClient, run_connection};
pub use queue::{OperationQueue, SetupOperation};
