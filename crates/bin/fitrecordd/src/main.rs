//! # fitrecordd — fitrecord daemon
//!
//! Composition root that wires the adapters together and runs one command.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars) and the command line
//! - Initialise logging to stderr, keeping stdout a clean JSON-lines stream
//! - Pick the radio: Bluetooth through `btleplug`, or the simulated devices
//! - `scan`: print every unique peripheral seen during the scan window
//! - `record` (default): activate a session from `[[sensors]]` and print
//!   one telemetry frame per second until Ctrl-C or idle auto-off
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod sink;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use fitrecord_adapter_ble::{Adapter, BtleplugLinks, BtleplugScanner};
use fitrecord_adapter_virtual::{VirtualHub, VirtualLocation};
use fitrecord_app::context::Platform;
use fitrecord_app::event_bus::SessionEvent;
use fitrecord_app::gatt::GattClient;
use fitrecord_app::ports::{
    Advertisement, LocationListener, LocationSource, NoopWakeLock, PeripheralConnector,
    ScanBackend,
};
use fitrecord_app::scanner::{DeviceScanner, DiscoveryListener};
use fitrecord_app::session::RecordingSession;
use fitrecord_domain::error::BoxError;
use fitrecord_domain::id::SensorId;
use fitrecord_domain::sensor::{CLOCK_TAG, LOCATION_TAG, SensorConfig, SensorKind};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::sink::JsonLinesSink;

/// Where the simulated walk starts.
const VIRTUAL_ORIGIN: (f64, f64) = (48.8566, 2.3522);
/// How often the simulated peripherals emit a measurement.
const VIRTUAL_PERIOD: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Scan,
    Record,
}

impl Command {
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        let command = match args.next().as_deref() {
            None | Some("record") => Self::Record,
            Some("scan") => Self::Scan,
            Some(other) => anyhow::bail!("unknown command {other:?}, expected `scan` or `record`"),
        };
        if let Some(extra) = args.next() {
            anyhow::bail!("unexpected argument {extra:?}");
        }
        Ok(command)
    }
}

enum Radio {
    Virtual(VirtualHub),
    Bluetooth(Adapter),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;
    init_tracing(&config.logging.filter);

    let command = Command::parse(std::env::args().skip(1))?;
    let radio = if config.session.virtual_devices {
        tracing::info!("using simulated peripherals");
        Radio::Virtual(VirtualHub::default())
    } else {
        let adapter = fitrecord_adapter_ble::open_adapter(&config.ble)
            .await
            .context("opening Bluetooth adapter")?;
        Radio::Bluetooth(adapter)
    };

    match (command, radio) {
        (Command::Scan, Radio::Virtual(hub)) => {
            scan(hub.scanner(), config.ble.scan_duration()).await
        }
        (Command::Scan, Radio::Bluetooth(adapter)) => {
            scan(BtleplugScanner::new(adapter), config.ble.scan_duration()).await
        }
        (Command::Record, radio) => record(radio, &config).await,
    }
}

fn init_tracing(filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn scan<B: ScanBackend>(backend: B, duration: Duration) -> anyhow::Result<()> {
    let scanner = DeviceScanner::new(backend);
    let listener: DiscoveryListener = Arc::new(print_advertisement);
    scanner.start_scan(listener).await.context("starting scan")?;

    tokio::select! {
        () = tokio::time::sleep(duration) => {}
        result = tokio::signal::ctrl_c() => result.context("waiting for Ctrl-C")?,
    }
    scanner.stop_scan();
    tracing::info!("scan stopped");
    Ok(())
}

fn print_advertisement(advertisement: Advertisement) {
    let line = serde_json::json!({
        "address": advertisement.address,
        "name": advertisement.name,
    });
    let mut stdout = std::io::stdout().lock();
    if let Err(err) = writeln!(stdout, "{line}") {
        tracing::warn!(%err, "failed to print advertisement");
    }
}

async fn record(radio: Radio, config: &Config) -> anyhow::Result<()> {
    let runtime = Handle::current();
    let connector: Arc<dyn PeripheralConnector>;
    let location: Arc<dyn LocationSource>;
    let sensors = match radio {
        Radio::Virtual(hub) => {
            // runs until the process exits
            let _simulation = hub.start_simulation(VIRTUAL_PERIOD, &runtime);
            connector = Arc::new(GattClient::new(hub.links(), runtime.clone()));
            location = Arc::new(VirtualLocation::new(
                runtime.clone(),
                VIRTUAL_ORIGIN.0,
                VIRTUAL_ORIGIN.1,
            ));
            sensors_or_default(&config.sensors, &hub)
        }
        Radio::Bluetooth(adapter) => {
            let links = BtleplugLinks::new(adapter, config.ble.connect_timeout());
            connector = Arc::new(
                GattClient::new(links, runtime.clone())
                    .with_connect_timeout(config.ble.connect_timeout()),
            );
            location = Arc::new(NoLocation);
            config.sensors.clone()
        }
    };
    anyhow::ensure!(!sensors.is_empty(), "no sensors configured");

    let platform = Platform {
        connector,
        location,
        wake_lock: Arc::new(NoopWakeLock),
    };
    let sink = JsonLinesSink::new(std::io::stdout(), activity_sensors(&sensors));
    let session = RecordingSession::new(platform, sink, runtime);
    let mut events = session.subscribe();
    session.activate(&sensors).context("activating session")?;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("waiting for Ctrl-C")?;
                tracing::info!("interrupted");
                session.deactivate();
                break;
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Deactivated { reason }) => {
                    tracing::info!(?reason, "session ended");
                    break;
                }
                Ok(SessionEvent::StatusText(text)) => tracing::debug!(status = %text, "session status"),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "session events lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}

/// The configured sensors, or every simulated device plus clock and
/// location when none are configured.
fn sensors_or_default(configured: &[SensorConfig], hub: &VirtualHub) -> Vec<SensorConfig> {
    if !configured.is_empty() {
        return configured.to_vec();
    }
    [CLOCK_TAG, LOCATION_TAG]
        .into_iter()
        .map(SensorConfig::new)
        .chain(
            hub.devices()
                .iter()
                .map(|device| SensorConfig::new(device.address().as_str())),
        )
        .collect()
}

/// Peripheral sensors; their data is what keeps a session from idling out.
fn activity_sensors(sensors: &[SensorConfig]) -> Vec<SensorId> {
    sensors
        .iter()
        .filter(|config| matches!(config.kind(), SensorKind::Peripheral(_)))
        .map(|config| config.id.clone())
        .collect()
}

/// Location source for hosts without a positioning provider.
struct NoLocation;

impl LocationSource for NoLocation {
    fn start(&self, _interval: Duration, _listener: LocationListener) -> Result<(), BoxError> {
        Err("no location provider on this host".into())
    }

    fn stop(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(ToString::to_string).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn should_default_to_record() {
        assert_eq!(Command::parse(args(&[])).unwrap(), Command::Record);
        assert_eq!(Command::parse(args(&["record"])).unwrap(), Command::Record);
    }

    #[test]
    fn should_parse_scan() {
        assert_eq!(Command::parse(args(&["scan"])).unwrap(), Command::Scan);
    }

    #[test]
    fn should_reject_unknown_command() {
        assert!(Command::parse(args(&["replay"])).is_err());
        assert!(Command::parse(args(&["scan", "now"])).is_err());
    }

    #[test]
    fn should_default_to_every_simulated_sensor() {
        let hub = VirtualHub::default();
        let sensors = sensors_or_default(&[], &hub);
        let ids: Vec<_> = sensors.iter().map(|s| s.id.as_str().to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "time",
                "location",
                "F0:00:00:00:00:01",
                "F0:00:00:00:00:02",
                "F0:00:00:00:00:03"
            ]
        );
    }

    #[test]
    fn should_keep_configured_sensors() {
        let hub = VirtualHub::default();
        let configured = vec![SensorConfig::new("time")];
        assert_eq!(sensors_or_default(&configured, &hub), configured);
    }

    #[test]
    fn should_select_peripherals_as_activity_sensors() {
        let sensors = vec![
            SensorConfig::new("time"),
            SensorConfig::new("location"),
            SensorConfig::new("aa:bb"),
        ];
        assert_eq!(activity_sensors(&sensors), vec![SensorId::new("aa:bb")]);
    }

    #[test]
    fn should_refuse_location_without_provider() {
        let listener: LocationListener = Arc::new(|_| {});
        assert!(NoLocation.start(Duration::from_secs(1), listener).is_err());
    }
}
