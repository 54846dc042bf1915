//! # fitrecord-app
//!
//! Application layer — the telemetry core and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `GattLink` / `LinkProvider` — one transport connection to a peripheral
//!   - `ScanBackend` — advertisement discovery
//!   - `LocationSource` — platform position fixes
//!   - `TelemetrySink` — the consumer of collected frames
//!   - `WakeLock` — keeps the host awake while recording
//! - Define the **driving port** `PeripheralConnector` used by sensors
//! - Run peripheral connections: a sans-IO `GattConnection` state machine,
//!   its `OperationQueue`, and the task driving it (`GattClient`)
//! - De-duplicate discoveries (`DeviceScanner`)
//! - Aggregate sensors (`SensorRegistry`), poll them once per second with
//!   idle auto-off (`TelemetryPoller`) inside a `RecordingSession`
//! - Provide **in-process infrastructure** (session event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `fitrecord-domain` only (plus `tokio` for tasks, timers and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod context;
pub mod event_bus;
pub mod gatt;
pub mod latest;
pub mod poller;
pub mod ports;
pub mod registry;
pub mod scanner;
pub mod sensors;
pub mod session;
