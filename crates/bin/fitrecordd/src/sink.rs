//! Telemetry consumer writing one JSON object per frame.

use std::collections::BTreeSet;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

use fitrecord_app::ports::sink::STATUS_METRIC;
use fitrecord_app::ports::{SinkReply, TelemetrySink};
use fitrecord_domain::error::SinkError;
use fitrecord_domain::id::SensorId;
use fitrecord_domain::sample::{Sample, TelemetryFrame};

/// Recording status reported while at least one activity sensor has data.
const RECORDING: f64 = 1.0;

/// Writes every forwarded frame as a JSON line.
///
/// The reply carries a recording status only while one of the activity
/// sensors (the peripherals) reports metrics, so an unattended session with
/// nothing connected eventually switches itself off.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
    activity: BTreeSet<SensorId>,
}

impl<W: Write + Send + 'static> JsonLinesSink<W> {
    pub fn new(writer: W, activity: impl IntoIterator<Item = SensorId>) -> Self {
        Self {
            writer: Mutex::new(writer),
            activity: activity.into_iter().collect(),
        }
    }

    fn reply(&self, frame: &TelemetryFrame) -> SinkReply {
        let reporting = self
            .activity
            .iter()
            .filter(|id| frame.get(id.as_str()).is_some_and(|s| !s.is_empty()))
            .count();
        if reporting == 0 {
            return SinkReply {
                data: Sample::new(),
                status_text: Some("waiting for sensors".to_string()),
            };
        }
        SinkReply {
            data: Sample::new().with(STATUS_METRIC, RECORDING),
            status_text: Some(format!(
                "{reporting} of {} sensors reporting",
                self.activity.len()
            )),
        }
    }

    fn write(&self, frame: &TelemetryFrame) -> std::io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        serde_json::to_writer(&mut *writer, frame)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

impl<W: Write + Send + 'static> TelemetrySink for JsonLinesSink<W> {
    async fn forward(&self, frame: TelemetryFrame) -> Result<SinkReply, SinkError> {
        self.write(&frame).map_err(|err| SinkError(Box::new(err)))?;
        Ok(self.reply(&frame))
    }
}
