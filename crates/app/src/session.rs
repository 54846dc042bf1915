//! Recording session: activation lifecycle around the registry and poller.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fitrecord_domain::error::SessionError;
use fitrecord_domain::sample::TelemetryFrame;
use fitrecord_domain::sensor::SensorConfig;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::context::{Platform, SessionContext};
use crate::event_bus::{DeactivationReason, SessionEvent, SessionEventBus};
use crate::poller::TelemetryPoller;
use crate::ports::TelemetrySink;
use crate::registry::SensorRegistry;

const EVENT_CAPACITY: usize = 64;

struct Active {
    generation: u64,
    registry: Arc<SensorRegistry>,
    poller: JoinHandle<()>,
    pokes: mpsc::Sender<()>,
    _context: SessionContext,
}

#[derive(Default)]
struct State {
    generation: u64,
    active: Option<Active>,
}

struct Inner<S> {
    platform: Platform,
    sink: Arc<S>,
    events: SessionEventBus,
    runtime: Handle,
    state: Mutex<State>,
}

/// A recording session. Cheap to clone; clones share the same state.
pub struct RecordingSession<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for RecordingSession<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: TelemetrySink> RecordingSession<S> {
    pub fn new(platform: Platform, sink: S, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                platform,
                sink: Arc::new(sink),
                events: SessionEventBus::new(EVENT_CAPACITY),
                runtime,
                state: Mutex::new(State::default()),
            }),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Start recording from `configs`. No-op when already active.
    ///
    /// # Errors
    ///
    /// [`SessionError::Registry`] when the sensor list is rejected; whatever
    /// was started is torn down again and the session stays inactive. A
    /// single sensor failing to start does not fail activation.
    pub fn activate(&self, configs: &[SensorConfig]) -> Result<(), SessionError> {
        let mut state = self.inner.lock();
        if state.active.is_some() {
            tracing::debug!("session already active");
            return Ok(());
        }

        let context = SessionContext::new(self.inner.platform.clone());
        let registry = Arc::new(SensorRegistry::new());
        if let Err(err) = registry.init(&context, configs) {
            registry.destroy();
            return Err(err.into());
        }

        state.generation += 1;
        let generation = state.generation;
        let (pokes, pokes_rx) = mpsc::channel(1);
        let poller = TelemetryPoller::new(
            Arc::clone(&registry),
            Arc::clone(&self.inner.sink),
            self.inner.events.clone(),
        );
        let session = Arc::downgrade(&self.inner);
        let poller = self.inner.runtime.spawn(async move {
            poller.run(pokes_rx).await;
            if let Some(inner) = session.upgrade() {
                inner.end(Some(generation), DeactivationReason::Idle);
            }
        });

        state.active = Some(Active {
            generation,
            registry,
            poller,
            pokes,
            _context: context,
        });
        drop(state);

        tracing::info!(sensors = configs.len(), "session activated");
        self.inner.events.publish(SessionEvent::Activated);
        Ok(())
    }

    /// Stop recording. Safe to call when inactive.
    pub fn deactivate(&self) {
        self.inner.end(None, DeactivationReason::Requested);
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.lock().active.is_some()
    }

    /// Collect and forward a frame now instead of waiting for the next
    /// tick. Returns `false` when inactive or a poll is already pending.
    pub fn poll_now(&self) -> bool {
        self.inner
            .lock()
            .active
            .as_ref()
            .is_some_and(|active| active.pokes.try_send(()).is_ok())
    }

    /// Current frame without forwarding it.
    #[must_use]
    pub fn snapshot(&self) -> Option<TelemetryFrame> {
        self.inner
            .lock()
            .active
            .as_ref()
            .map(|active| active.registry.collect_data())
    }
}

impl<S> Inner<S> {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tear down the active session, if any. With `generation`, only that
    /// activation is ended.
    fn end(&self, generation: Option<u64>, reason: DeactivationReason) {
        let active = {
            let mut state = self.lock();
            let current = state
                .active
                .as_ref()
                .is_some_and(|active| generation.is_none_or(|g| g == active.generation));
            if !current {
                return;
            }
            state.active.take()
        };
        let Some(active) = active else {
            return;
        };

        active.poller.abort();
        active.registry.destroy();
        drop(active);

        tracing::info!(?reason, "session deactivated");
        self.events.publish(SessionEvent::Deactivated { reason });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use fitrecord_domain::error::SinkError;
    use fitrecord_domain::gatt::HEART_RATE_MEASUREMENT;
    use fitrecord_domain::sample::Sample;

    use super::*;
    use crate::context::testing::{Fakes, ManualLocation};
    use crate::poller::IDLE_AUTO_OFF_TICKS;
    use crate::ports::SinkReply;

    #[derive(Default)]
    struct RecordingSink {
        frames: Mutex<Vec<TelemetryFrame>>,
        reply: SinkReply,
    }

    impl RecordingSink {
        fn recording() -> Self {
            Self {
                frames: Mutex::default(),
                reply: SinkReply {
                    data: Sample::new().with("status", 0.0),
                    status_text: Some("Recording".into()),
                },
            }
        }
    }

    impl TelemetrySink for RecordingSink {
        async fn forward(&self, frame: TelemetryFrame) -> Result<SinkReply, SinkError> {
            self.frames.lock().unwrap().push(frame);
            Ok(self.reply.clone())
        }
    }

    fn session(fakes: &Fakes, sink: RecordingSink) -> RecordingSession<RecordingSink> {
        RecordingSession::new(fakes.platform(), sink, Handle::current())
    }

    fn configs(ids: &[&str]) -> Vec<SensorConfig> {
        ids.iter().map(|id| SensorConfig::new(*id)).collect()
    }

    fn frames(session: &RecordingSession<RecordingSink>) -> Vec<TelemetryFrame> {
        session.inner.sink.frames.lock().unwrap().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn should_activate_and_forward_frames_every_second() {
        let fakes = Fakes::new();
        let session = session(&fakes, RecordingSink::recording());
        let mut events = session.subscribe();

        session.activate(&configs(&["time", "AA:BB"])).unwrap();
        assert!(session.is_active());
        assert_eq!(fakes.wake_count(), 1);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Activated);

        let mut connection = fakes.connector.take("AA:BB");
        connection.callbacks.on_data(HEART_RATE_MEASUREMENT, &[0x00, 75]);

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        let frames = frames(&session);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].get("AA:BB"), Some(&Sample::new().with("hrm", 75.0)));
        assert!(frames[1].get("time").is_some());

        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::StatusText("Recording".into())
        );
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::SensorData(Sample::new().with("status", 0.0))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn should_ignore_second_activation() {
        let fakes = Fakes::new();
        let session = session(&fakes, RecordingSink::recording());

        session.activate(&configs(&["AA:BB"])).unwrap();
        session.activate(&configs(&["AA:BB", "CC:DD"])).unwrap();

        assert_eq!(fakes.connector.count(), 1);
        assert_eq!(fakes.wake_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_release_everything_on_deactivate() {
        let fakes = Fakes::new();
        let session = session(&fakes, RecordingSink::recording());
        session.activate(&configs(&["location", "AA:BB"])).unwrap();
        let mut events = session.subscribe();

        session.deactivate();
        session.deactivate();

        assert!(!session.is_active());
        assert_eq!(fakes.wake_count(), 0);
        assert!(fakes.connector.take("AA:BB").disconnector.is_requested());
        assert_eq!(fakes.location.stops.load(Ordering::SeqCst), 1);
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::Deactivated {
                reason: DeactivationReason::Requested
            }
        );
        assert!(events.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(frames(&session).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_switch_off_after_idle_threshold() {
        let fakes = Fakes::new();
        let session = session(&fakes, RecordingSink::default());
        session.activate(&configs(&["time"])).unwrap();
        let mut events = session.subscribe();

        tokio::time::sleep(Duration::from_millis(299_500)).await;
        assert!(session.is_active());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!session.is_active());
        assert_eq!(fakes.wake_count(), 0);
        assert_eq!(frames(&session).len(), IDLE_AUTO_OFF_TICKS as usize);

        let mut reasons = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::Deactivated { reason } = event {
                reasons.push(reason);
            }
        }
        assert_eq!(reasons, vec![DeactivationReason::Idle]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_reset_idle_count_on_reactivation() {
        let fakes = Fakes::new();
        let session = session(&fakes, RecordingSink::default());
        session.activate(&configs(&["time"])).unwrap();
        tokio::time::sleep(Duration::from_millis(200_500)).await;
        session.deactivate();

        session.activate(&configs(&["time"])).unwrap();
        tokio::time::sleep(Duration::from_secs(200)).await;
        assert!(session.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn should_stay_active_without_sensor_that_failed_to_start() {
        let fakes = Fakes::with_location(ManualLocation {
            denied: true,
            ..ManualLocation::default()
        });
        let session = session(&fakes, RecordingSink::recording());

        session.activate(&configs(&["AA:BB", "location"])).unwrap();
        assert!(session.is_active());
        assert_eq!(fakes.wake_count(), 1);
        assert!(!fakes.connector.take("AA:BB").disconnector.is_requested());
        assert!(fakes.location.listener.lock().unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn should_poll_immediately_on_request() {
        let fakes = Fakes::new();
        let session = session(&fakes, RecordingSink::recording());
        assert!(!session.poll_now());

        session.activate(&configs(&["time"])).unwrap();
        assert!(session.poll_now());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(frames(&session).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_expose_snapshot_while_active() {
        let fakes = Fakes::new();
        let session = session(&fakes, RecordingSink::recording());
        assert!(session.snapshot().is_none());

        session.activate(&configs(&["time"])).unwrap();
        let frame = session.snapshot().unwrap();
        assert!(frame.get("time").unwrap().get("now").is_some());
    }
}
