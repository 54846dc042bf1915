//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod connector;
pub mod link;
pub mod location;
pub mod scan;
pub mod sink;
pub mod wake_lock;

pub use connector::{ConnectionCallbacks, PeripheralConnector};
pub use link::{GattLink, LinkProvider, Notification, NotificationStream};
pub use location::{LocationListener, LocationSource, LocationUpdate};
pub use scan::{Advertisement, AdvertisementStream, ScanBackend};
pub use sink::{SinkReply, TelemetrySink};
pub use wake_lock::{NoopWakeLock, WakeLock};
