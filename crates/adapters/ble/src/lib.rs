//! # fitrecord-adapter-ble
//!
//! BLE adapter — discovers fitness peripherals and connects to them over
//! GATT, using `btleplug`.
//!
//! ## How it works
//!
//! - [`BtleplugScanner`] scans with the fitness service filter and turns
//!   discovery events into advertisements.
//! - [`BtleplugLinks`] resolves an address into a [`BtleplugLink`]; the
//!   application's connection driver then connects, discovers services,
//!   subscribes or reads one characteristic at a time and streams
//!   notifications.
//!
//! ## Supported peripherals
//!
//! | Class | Service | Characteristic |
//! |-------|---------|----------------|
//! | Heart rate | `0x180D` | `0x2A37` (notify) |
//! | Cycling power | `0x1818` | `0x2A63` (notify) |
//! | Running speed/cadence | `0x1814` | `0x2A53` (notify) |
//! | Battery | `0x180F` | `0x2A19` (read or notify) |
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `fitrecord-app` and `fitrecord-domain`.

mod config;
mod error;
mod gatt;
mod scanner;

pub use config::BleConfig;
pub use error::BleError;
pub use gatt::{BtleplugLink, BtleplugLinks};
pub use scanner::BtleplugScanner;

use btleplug::api::Manager as _;
pub use btleplug::platform::Adapter;
use btleplug::platform::Manager;

/// Open the host adapter selected by `config`.
///
/// # Errors
///
/// Returns [`BleError::NotAvailable`] when no adapter exists at
/// `adapter_index`, or [`BleError::Scan`] when the Bluetooth stack cannot
/// be reached.
pub async fn open_adapter(config: &BleConfig) -> Result<Adapter, BleError> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    let adapter = adapters
        .into_iter()
        .nth(config.adapter_index)
        .ok_or(BleError::NotAvailable)?;
    tracing::debug!(index = config.adapter_index, "BLE adapter opened");
    Ok(adapter)
}
