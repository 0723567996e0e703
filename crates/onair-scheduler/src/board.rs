use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use onair_agenda::{Resolution, ScheduledItem};
use tracing::debug;

#[derive(Default)]
struct BoardState {
    accepted: u64,
    current: Option<Resolution>,
    last_error: Option<String>,
}

/// The agenda currently on display.
///
/// Every refresh takes a generation number before it fetches. A result is
/// accepted only if no later generation has been accepted already, so a
/// slow fetch finishing after a fast one cannot overwrite newer data.
/// Failed refreshes leave the last accepted agenda in place.
#[derive(Default)]
pub struct AgendaBoard {
    issued: AtomicU64,
    state: Mutex<BoardState>,
}

impl AgendaBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the generation number for a refresh about to start.
    pub fn begin_refresh(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Install `resolution` if `generation` is newer than the one on
    /// display. Returns whether it was installed.
    pub fn accept(&self, generation: u64, resolution: Resolution) -> bool {
        let mut state = self.state.lock().unwrap();
        if generation <= state.accepted {
            debug!(
                generation,
                accepted = state.accepted,
                "discarding stale refresh result"
            );
            return false;
        }
        state.accepted = generation;
        state.current = Some(resolution);
        state.last_error = None;
        true
    }

    /// Record a failed refresh. The agenda on display is kept.
    pub fn record_failure(&self, generation: u64, error: impl ToString) {
        let mut state = self.state.lock().unwrap();
        if generation > state.accepted {
            state.last_error = Some(error.to_string());
        }
    }

    /// Generation of the agenda on display; 0 before the first success.
    pub fn generation(&self) -> u64 {
        self.state.lock().unwrap().accepted
    }

    pub fn current(&self) -> Option<Resolution> {
        self.state.lock().unwrap().current.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().unwrap().last_error.clone()
    }

    /// Items on display, for re-classification between refreshes.
    pub fn items(&self) -> Vec<ScheduledItem> {
        self.state
            .lock()
            .unwrap()
            .current
            .as_ref()
            .map(|r| r.entries.iter().map(|e| e.item.clone()).collect())
            .unwrap_or_default()
    }
}
