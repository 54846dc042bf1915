//! Peripheral discovery with per-session de-duplication.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use fitrecord_domain::error::ScanError;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

use crate::ports::{Advertisement, ScanBackend};

/// Receives each newly discovered peripheral. Runs on the scan task and may
/// call [`DeviceScanner::stop_scan`].
pub type DiscoveryListener = Arc<dyn Fn(Advertisement) + Send + Sync>;

struct ScanSession {
    task: JoinHandle<()>,
    runtime: Handle,
}

/// Reports every advertising fitness peripheral at most once per scan
/// session.
pub struct DeviceScanner<B> {
    backend: Arc<B>,
    session: Mutex<Option<ScanSession>>,
    /// Backend stop issued by the last `stop_scan`, not yet awaited.
    stopping: Mutex<Option<JoinHandle<()>>>,
}

impl<B: ScanBackend> DeviceScanner<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            session: Mutex::new(None),
            stopping: Mutex::new(None),
        }
    }

    /// Start a scan session, reporting discoveries to `listener`.
    ///
    /// # Errors
    ///
    /// [`ScanError::Unavailable`] when the radio cannot scan,
    /// [`ScanError::AlreadyScanning`] while a session is running.
    pub async fn start_scan(&self, listener: DiscoveryListener) -> Result<(), ScanError> {
        if self.is_scanning() {
            return Err(ScanError::AlreadyScanning);
        }

        let stopping = self.lock_stopping().take();
        if let Some(stopping) = stopping
            && let Err(err) = stopping.await
        {
            tracing::warn!(%err, "previous scan stop did not complete");
        }

        let mut advertisements = self.backend.start().await?;
        tracing::info!("scan started");

        let task = tokio::spawn(async move {
            let mut seen = HashSet::new();
            while let Some(advertisement) = advertisements.next().await {
                if !seen.insert(advertisement.address.clone()) {
                    continue;
                }
                tracing::info!(
                    address = %advertisement.address,
                    name = advertisement.name.as_deref().unwrap_or("unknown"),
                    "discovered peripheral"
                );
                listener(advertisement);
            }
            tracing::debug!("advertisement stream ended");
        });

        let mut session = self.lock_session();
        if session.as_ref().is_some_and(|s| !s.task.is_finished()) {
            task.abort();
            return Err(ScanError::AlreadyScanning);
        }
        *session = Some(ScanSession {
            task,
            runtime: Handle::current(),
        });
        Ok(())
    }

    /// Stop the running scan session. Never blocks; returns `false` when no
    /// session was running. The next [`start_scan`](Self::start_scan) waits
    /// for the radio to stop before starting it again.
    pub fn stop_scan(&self) -> bool {
        let Some(session) = self.lock_session().take() else {
            return false;
        };
        session.task.abort();
        let backend = Arc::clone(&self.backend);
        let stopping = session.runtime.spawn(async move {
            if let Err(err) = backend.stop().await {
                tracing::warn!(%err, "failed to stop scan");
            }
        });
        *self.lock_stopping() = Some(stopping);
        tracing::info!("scan stopped");
        true
    }

    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.lock_session()
            .as_ref()
            .is_some_and(|session| !session.task.is_finished())
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<ScanSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_stopping(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.stopping.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
