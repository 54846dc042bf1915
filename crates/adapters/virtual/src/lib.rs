//! # fitrecord-adapter-virtual
//!
//! Simulated fitness peripherals and a simulated location source, for
//! demos and end-to-end tests without a radio.
//!
//! ## Provided devices
//!
//! | Device | Address | Measurement |
//! |--------|---------|-------------|
//! | Virtual HRM | `F0:00:00:00:00:01` | Heart rate, 120–139 bpm |
//! | Virtual Power | `F0:00:00:00:00:02` | Power 200–249 W plus crank data |
//! | Virtual Footpod | `F0:00:00:00:00:03` | ~3 m/s, 176 spm, 1.2 m stride |
//!
//! Every device also exposes a readable battery level.
//!
//! ## Dependency rule
//!
//! Depends on `fitrecord-app` (port traits) and `fitrecord-domain` only.

mod devices;
mod link;
mod location;
mod scanner;

use std::sync::Arc;
use std::time::Duration;

use fitrecord_domain::id::PeripheralAddress;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub use devices::{DeviceKind, VirtualPeripheral};
pub use link::{VirtualLink, VirtualLinks};
pub use location::VirtualLocation;
pub use scanner::VirtualScanner;

/// A shared set of simulated peripherals.
#[derive(Debug, Clone)]
pub struct VirtualHub {
    devices: Arc<Vec<Arc<VirtualPeripheral>>>,
}

impl Default for VirtualHub {
    fn default() -> Self {
        Self::new([
            VirtualPeripheral::new(DeviceKind::HeartRateStrap, "F0:00:00:00:00:01"),
            VirtualPeripheral::new(DeviceKind::PowerMeter, "F0:00:00:00:00:02"),
            VirtualPeripheral::new(DeviceKind::Footpod, "F0:00:00:00:00:03"),
        ])
    }
}

impl VirtualHub {
    pub fn new(devices: impl IntoIterator<Item = VirtualPeripheral>) -> Self {
        Self {
            devices: Arc::new(devices.into_iter().map(Arc::new).collect()),
        }
    }

    #[must_use]
    pub fn devices(&self) -> &[Arc<VirtualPeripheral>] {
        &self.devices
    }

    #[must_use]
    pub fn device(&self, address: &PeripheralAddress) -> Option<Arc<VirtualPeripheral>> {
        self.devices
            .iter()
            .find(|device| device.address() == address)
            .cloned()
    }

    /// Scan backend advertising every device of this hub.
    #[must_use]
    pub fn scanner(&self) -> VirtualScanner {
        VirtualScanner::new(self.clone())
    }

    /// Link provider reaching every device of this hub.
    #[must_use]
    pub fn links(&self) -> VirtualLinks {
        VirtualLinks::new(self.clone())
    }

    /// Push one measurement from every device.
    pub fn tick_all(&self) {
        for device in self.devices.iter() {
            device.tick();
        }
    }

    /// Spawn a task ticking every device each `period`.
    pub fn start_simulation(&self, period: Duration, runtime: &Handle) -> JoinHandle<()> {
        let hub = self.clone();
        runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                hub.tick_all();
            }
        })
    }
}
