use std::collections::HashMap;

use chrono::NaiveDateTime;
use onair_core::config::{AgendaConfig, RecurrencePolicy};
use onair_core::ActorId;
use serde::Serialize;
use tracing::{debug, warn};

use crate::clock::NowParts;
use crate::item::{Program, Schedulable, ScheduledItem};
use crate::merge::merge_unique;
use crate::read_state::{filter_unread, ReadCache};
use crate::urgency::{classify, sort_entries, AgendaEntry, UrgencyWindow};
use crate::window::is_item_eligible;

/// One snapshot of backend rows.
#[derive(Debug, Clone, Default)]
pub struct AgendaInput {
    pub programs: Vec<Program>,
    /// Results of the overlapping item queries, in query order.
    pub batches: Vec<Vec<ScheduledItem>>,
}

/// Output of one resolution cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub at: NaiveDateTime,
    pub entries: Vec<AgendaEntry>,
    /// Items dropped because their time could not be parsed.
    pub malformed: usize,
    /// Items dropped for being past the late cutoff.
    pub missed: usize,
}

/// Runs merge → window → read filter → classify → sort.
#[derive(Debug, Clone)]
pub struct AgendaResolver {
    window: UrgencyWindow,
    policy: RecurrencePolicy,
}

impl Default for AgendaResolver {
    fn default() -> Self {
        Self::new(&AgendaConfig::default())
    }
}

impl AgendaResolver {
    pub fn new(config: &AgendaConfig) -> Self {
        Self {
            window: UrgencyWindow::from(config),
            policy: config.recurrence,
        }
    }

    pub fn policy(&self) -> RecurrencePolicy {
        self.policy
    }

    pub fn window(&self) -> &UrgencyWindow {
        &self.window
    }

    /// Resolve the agenda for `now`.
    ///
    /// The cache is consulted, and may be written to when the backend
    /// reports a same-day read the cache did not know about. Running twice
    /// on the same input and instant gives the same entries.
    pub fn resolve(
        &self,
        input: &AgendaInput,
        now: NaiveDateTime,
        actor: Option<&ActorId>,
        cache: &dyn ReadCache,
    ) -> Resolution {
        let at = NowParts::from_datetime(now);
        let programs: HashMap<_, _> = input.programs.iter().map(|p| (&p.id, p)).collect();

        let merged = merge_unique(input.batches.iter().cloned());
        let in_window: Vec<ScheduledItem> = merged
            .into_iter()
            .filter(|item| is_item_eligible(item, &at, &programs))
            .collect();
        let unread = filter_unread(in_window, actor, at.date, cache, self.policy);

        let resolution = self.classify_all(unread, now);
        debug!(
            entries = resolution.entries.len(),
            missed = resolution.missed,
            malformed = resolution.malformed,
            "agenda resolved"
        );
        resolution
    }

    /// Re-annotate already-filtered items at a new instant, without any
    /// window or read-state checks. Used by the exact-time poll.
    pub fn reclassify(&self, items: &[ScheduledItem], now: NaiveDateTime) -> Resolution {
        self.classify_all(items.to_vec(), now)
    }

    fn classify_all(&self, items: Vec<ScheduledItem>, now: NaiveDateTime) -> Resolution {
        let at = NowParts::from_datetime(now);
        let mut entries = Vec::with_capacity(items.len());
        let mut malformed = 0;
        let mut missed = 0;

        for item in items {
            let key = item.key();
            match classify(item, at.minute_of_day, &self.window, self.policy) {
                Ok(entry) if self.window.is_missed(entry.minutes_until_due) => missed += 1,
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(item = %key, error = %e, "skipping item with malformed time");
                    malformed += 1;
                }
            }
        }

        sort_entries(&mut entries);
        Resolution {
            at: now,
            entries,
            malformed,
            missed,
        }
    }
}
