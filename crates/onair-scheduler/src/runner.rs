use std::sync::{Arc, Mutex};
use std::time::Duration;

use onair_core::config::SchedulerConfig;
use onair_store::AgendaService;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::alerts::{ExactTimeAlert, ExactTimeDetector};
use crate::board::AgendaBoard;
use crate::error::Result;
use crate::monitor::ConnectionMonitor;
use crate::task::Scheduler;

pub const REFRESH_TASK: &str = "agenda-refresh";
pub const EXACT_POLL_TASK: &str = "exact-time-poll";

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The new agenda is on display.
    Applied { generation: u64, entries: usize },
    /// A newer refresh landed first; this result was dropped.
    Stale { generation: u64 },
    /// Offline: the cycle was not attempted.
    Skipped,
    /// The fetch failed; the previous agenda stays on display.
    Failed { generation: u64 },
}

/// Drives the two agenda timers: a full refresh (fetch, resolve, display)
/// and a faster exact-time poll over the items already on display.
pub struct AgendaRunner {
    service: Arc<AgendaService>,
    board: Arc<AgendaBoard>,
    monitor: Arc<ConnectionMonitor>,
    detector: Mutex<ExactTimeDetector>,
    config: SchedulerConfig,
}

impl AgendaRunner {
    pub fn new(service: Arc<AgendaService>, config: SchedulerConfig) -> Self {
        let monitor = ConnectionMonitor::new(
            service.backend().clone(),
            Duration::from_secs(config.probe_secs),
        );
        Self {
            service,
            board: Arc::new(AgendaBoard::new()),
            monitor: Arc::new(monitor),
            detector: Mutex::new(ExactTimeDetector::new()),
            config,
        }
    }

    pub fn board(&self) -> &Arc<AgendaBoard> {
        &self.board
    }

    pub fn monitor(&self) -> &Arc<ConnectionMonitor> {
        &self.monitor
    }

    pub fn service(&self) -> &Arc<AgendaService> {
        &self.service
    }

    /// Run one full refresh cycle.
    pub async fn refresh(&self) -> RefreshOutcome {
        if !self.monitor.is_online() {
            debug!("offline; skipping refresh");
            return RefreshOutcome::Skipped;
        }

        let generation = self.board.begin_refresh();
        match self.service.resolve_now().await {
            Ok(resolution) => {
                self.monitor.report_success();
                let entries = resolution.entries.len();
                if self.board.accept(generation, resolution) {
                    debug!(generation, entries, "agenda refreshed");
                    RefreshOutcome::Applied {
                        generation,
                        entries,
                    }
                } else {
                    RefreshOutcome::Stale { generation }
                }
            }
            Err(e) => {
                self.monitor.report_error(&e);
                if e.is_connectivity_error() {
                    debug!(generation, error = %e, "refresh failed while offline");
                } else {
                    warn!(generation, error = %e, "refresh failed; keeping last agenda");
                }
                self.board.record_failure(generation, &e);
                RefreshOutcome::Failed { generation }
            }
        }
    }

    /// Re-classify the items on display at the current instant and return
    /// any newly due exact-time alerts. No backend access.
    pub fn poll_exact_time(&self) -> Vec<ExactTimeAlert> {
        let items = self.board.items();
        if items.is_empty() {
            return Vec::new();
        }
        let resolution = self
            .service
            .resolver()
            .reclassify(&items, self.service.now());
        self.detector.lock().unwrap().detect(&resolution)
    }

    /// Start the probe and both timers. Alerts go to `alerts`; a full or
    /// closed channel drops the alert with a warning, never blocks a tick.
    pub fn start(self: &Arc<Self>, alerts: mpsc::Sender<ExactTimeAlert>) -> Result<Scheduler> {
        self.monitor.start()?;
        let mut scheduler = Scheduler::new();

        let runner = self.clone();
        scheduler.every(
            REFRESH_TASK,
            Duration::from_secs(self.config.refresh_secs),
            move || {
                let runner = runner.clone();
                async move {
                    runner.refresh().await;
                }
            },
        )?;

        let runner = self.clone();
        scheduler.every(
            EXACT_POLL_TASK,
            Duration::from_secs(self.config.exact_poll_secs),
            move || {
                for alert in runner.poll_exact_time() {
                    info!(item = %alert.key, headline = %alert.headline, "exact-time alert");
                    if alerts.try_send(alert).is_err() {
                        warn!("alert channel full or closed; alert dropped");
                    }
                }
                std::future::ready(())
            },
        )?;

        info!(tasks = ?scheduler.task_names(), "agenda runner started");
        Ok(scheduler)
    }

    /// Stop the timers returned by [`start`](Self::start) and the probe.
    pub async fn stop(&self, scheduler: Scheduler) {
        scheduler.stop().await;
        self.monitor.stop().await;
        info!("agenda runner stopped");
    }
}
