//! Once-per-second telemetry forwarding with idle auto-off.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::event_bus::{SessionEvent, SessionEventBus};
use crate::ports::TelemetrySink;
use crate::registry::SensorRegistry;

/// Period between two collected frames.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Consecutive ticks without a recording status after which the session
/// shuts itself down.
pub const IDLE_AUTO_OFF_TICKS: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleVerdict {
    /// The consumer reported a status; the counter was reset.
    Active,
    /// Consecutive idle ticks so far, below the threshold.
    Idle(u32),
    /// The threshold was reached.
    Expired,
}

/// Counts consecutive replies without a recording status.
#[derive(Debug, Clone)]
pub struct IdlePolicy {
    threshold: u32,
    idle_ticks: u32,
}

impl Default for IdlePolicy {
    fn default() -> Self {
        Self::new(IDLE_AUTO_OFF_TICKS)
    }
}

impl IdlePolicy {
    #[must_use]
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            idle_ticks: 0,
        }
    }

    /// Account for one consumer reply carrying `status`.
    pub fn observe(&mut self, status: Option<f64>) -> IdleVerdict {
        if status.is_some() {
            self.idle_ticks = 0;
            return IdleVerdict::Active;
        }
        self.idle_ticks = self.idle_ticks.saturating_add(1);
        if self.idle_ticks >= self.threshold {
            IdleVerdict::Expired
        } else {
            IdleVerdict::Idle(self.idle_ticks)
        }
    }

    #[must_use]
    pub fn idle_ticks(&self) -> u32 {
        self.idle_ticks
    }

    pub fn reset(&mut self) {
        self.idle_ticks = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    IdleExpired,
}

/// Collects a frame from the registry and forwards it to the sink on every
/// tick.
pub struct TelemetryPoller<S> {
    registry: Arc<SensorRegistry>,
    sink: Arc<S>,
    events: SessionEventBus,
    idle: IdlePolicy,
}

impl<S: TelemetrySink> TelemetryPoller<S> {
    pub fn new(registry: Arc<SensorRegistry>, sink: Arc<S>, events: SessionEventBus) -> Self {
        Self {
            registry,
            sink,
            events,
            idle: IdlePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_idle_policy(mut self, idle: IdlePolicy) -> Self {
        self.idle = idle;
        self
    }

    /// Forward one frame and evaluate the reply.
    ///
    /// A failed forward is logged and does not count towards idleness.
    pub async fn tick(&mut self) -> TickOutcome {
        let frame = self.registry.collect_data();
        tracing::trace!(sensors = frame.len(), "forwarding frame");

        let reply = match self.sink.forward(frame).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(%err, "telemetry consumer failed");
                return TickOutcome::Continue;
            }
        };

        let verdict = self.idle.observe(reply.status());
        if let Some(text) = reply.status_text {
            self.events.publish(SessionEvent::StatusText(text));
        }
        self.events.publish(SessionEvent::SensorData(reply.data));

        match verdict {
            IdleVerdict::Expired => {
                tracing::info!(ticks = self.idle.idle_ticks(), "idle threshold reached");
                TickOutcome::IdleExpired
            }
            IdleVerdict::Idle(ticks) => {
                tracing::trace!(ticks, "consumer idle");
                TickOutcome::Continue
            }
            IdleVerdict::Active => TickOutcome::Continue,
        }
    }

    /// Tick every [`POLL_INTERVAL`], plus once per message on `pokes`,
    /// until the idle threshold is reached.
    pub async fn run(mut self, mut pokes: mpsc::Receiver<()>) {
        let mut interval = tokio::time::interval_at(Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                Some(()) = pokes.recv() => {
                    tracing::debug!("out-of-band poll");
                }
            }
            if self.tick().await == TickOutcome::IdleExpired {
                return;
            }
        }
    }
}
