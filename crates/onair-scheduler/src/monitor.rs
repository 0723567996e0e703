use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use onair_store::{Collaborator, StoreError};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::Result;
use crate::task::{spawn_periodic, TaskHandle};

struct Status {
    online: AtomicBool,
    tx: watch::Sender<bool>,
}

impl Status {
    fn set(&self, online: bool) {
        if self.online.swap(online, Ordering::SeqCst) != online {
            if online {
                info!("backend reachable again");
            } else {
                info!("backend unreachable; refreshes paused");
            }
            self.tx.send_replace(online);
        }
    }
}

/// Tracks whether the backend is reachable.
///
/// Callers feed it the outcome of their own requests through
/// [`report_error`](Self::report_error) / [`report_success`](Self::report_success);
/// while started, a background probe pings the backend so an offline
/// state recovers even when nothing else is making requests.
pub struct ConnectionMonitor {
    backend: Arc<dyn Collaborator>,
    probe_every: Duration,
    status: Arc<Status>,
    probe: Mutex<Option<TaskHandle>>,
}

impl ConnectionMonitor {
    /// Starts out assuming the backend is online.
    pub fn new(backend: Arc<dyn Collaborator>, probe_every: Duration) -> Self {
        let (tx, _) = watch::channel(true);
        Self {
            backend,
            probe_every,
            status: Arc::new(Status {
                online: AtomicBool::new(true),
                tx,
            }),
            probe: Mutex::new(None),
        }
    }

    pub fn is_online(&self) -> bool {
        self.status.online.load(Ordering::SeqCst)
    }

    /// Receiver that changes whenever the online flag flips.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.status.tx.subscribe()
    }

    /// Only connectivity failures flip the monitor offline.
    pub fn report_error(&self, err: &StoreError) {
        if err.is_connectivity_error() {
            self.status.set(false);
        }
    }

    pub fn report_success(&self) {
        self.status.set(true);
    }

    /// Start the background probe. A second call while running is a no-op.
    pub fn start(&self) -> Result<()> {
        let mut probe = self.probe.lock().unwrap();
        if probe.as_ref().is_some_and(|p| !p.is_finished()) {
            return Ok(());
        }
        let backend = self.backend.clone();
        let status = self.status.clone();
        *probe = Some(spawn_periodic("connection-probe", self.probe_every, move || {
            let backend = backend.clone();
            let status = status.clone();
            async move {
                match backend.ping().await {
                    Ok(()) => status.set(true),
                    Err(e) if e.is_connectivity_error() => {
                        debug!(backend = backend.name(), error = %e, "probe failed");
                        status.set(false);
                    }
                    // Reachable but unhappy (auth, bad request): still online.
                    Err(e) => {
                        debug!(backend = backend.name(), error = %e, "probe answered with an error");
                        status.set(true);
                    }
                }
            }
        })?);
        Ok(())
    }

    /// Stop the background probe, if running.
    pub async fn stop(&self) {
        let probe = self.probe.lock().unwrap().take();
        if let Some(probe) = probe {
            probe.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onair_store::MemoryCollaborator;

    #[tokio::test(start_paused = true)]
    async fn probe_tracks_backend_reachability() {
        let backend = Arc::new(MemoryCollaborator::new());
        let monitor = ConnectionMonitor::new(backend.clone(), Duration::from_secs(30));
        let mut status = monitor.subscribe();
        monitor.start().unwrap();
        assert!(monitor.is_online());

        backend.set_online(false);
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(!monitor.is_online());
        assert!(status.has_changed().unwrap());
        assert!(!*status.borrow_and_update());

        backend.set_online(true);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(monitor.is_online());

        monitor.stop().await;
        backend.set_online(false);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(monitor.is_online(), "stopped monitor must not probe");
    }

    #[test]
    fn reports_only_flip_on_connectivity_errors() {
        let monitor = ConnectionMonitor::new(Arc::new(MemoryCollaborator::new()), Duration::from_secs(30));
        monitor.report_error(&StoreError::Api {
            status: 401,
            message: "JWT expired".into(),
        });
        assert!(monitor.is_online());
        monitor.report_error(&StoreError::Connectivity("refused".into()));
        assert!(!monitor.is_online());
        monitor.report_success();
        assert!(monitor.is_online());
    }
}
