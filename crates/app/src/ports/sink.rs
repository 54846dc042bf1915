//! Telemetry sink port — the external consumer of collected frames.

use std::future::Future;
use std::sync::Arc;

use fitrecord_domain::error::SinkError;
use fitrecord_domain::sample::{Sample, TelemetryFrame};

/// Metric of [`SinkReply::data`] telling whether the consumer is recording.
pub const STATUS_METRIC: &str = "status";

/// What the consumer answers for one forwarded frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SinkReply {
    /// Derived values to show to the user.
    pub data: Sample,
    /// Optional human-readable status line.
    pub status_text: Option<String>,
}

impl SinkReply {
    /// The recording status, when the consumer reported one.
    #[must_use]
    pub fn status(&self) -> Option<f64> {
        self.data.get(STATUS_METRIC)
    }
}

/// Consumer of telemetry frames. Called once per poll tick.
pub trait TelemetrySink: Send + Sync + 'static {
    fn forward(
        &self,
        frame: TelemetryFrame,
    ) -> impl Future<Output = Result<SinkReply, SinkError>> + Send;
}

impl<T: TelemetrySink> TelemetrySink for Arc<T> {
    fn forward(
        &self,
        frame: TelemetryFrame,
    ) -> impl Future<Output = Result<SinkReply, SinkError>> + Send {
        (**self).forward(frame)
    }
}
