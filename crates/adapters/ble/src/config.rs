//! BLE adapter configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the BLE adapter (`[ble]` section).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    /// Which host adapter to use when several are present.
    pub adapter_index: usize,
    /// How long `fitrecordd scan` listens for advertisements, in seconds.
    pub scan_duration_secs: u16,
    /// Upper bound for opening a link, including locating the peripheral,
    /// in seconds.
    pub connect_timeout_secs: u16,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            adapter_index: 0,
            scan_duration_secs: 10,
            connect_timeout_secs: 20,
        }
    }
}

impl BleConfig {
    #[must_use]
    pub fn scan_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.scan_duration_secs))
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.connect_timeout_secs))
    }
}
