//! `onair-scheduler` — keeps the agenda fresh on a running station.
//!
//! # Timers
//!
//! | Task                | Default | Work                                         |
//! |---------------------|---------|----------------------------------------------|
//! | `agenda-refresh`    | 60 s    | fetch + resolve, skipped while offline       |
//! | `exact-time-poll`   | 15 s    | re-classify items on display, emit alerts    |
//! | `connection-probe`  | 30 s    | ping the backend, flip the online flag       |
//!
//! All three are [`task::spawn_periodic`] loops (Tokio interval + a `watch`
//! stop signal), so tests drive them on paused virtual time.

pub mod alerts;
pub mod board;
pub mod error;
pub mod monitor;
pub mod runner;
pub mod task;

pub use alerts::{ExactTimeAlert, ExactTimeDetector};
pub use board::AgendaBoard;
pub use error::{Result, SchedulerError};
pub use monitor::ConnectionMonitor;
pub use runner::{AgendaRunner, RefreshOutcome};
pub use task::{Scheduler, TaskHandle};
