use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::NaiveDate;
use onair_core::config::RecurrencePolicy;
use onair_core::{ActorId, ItemId, ItemKind};
use tracing::debug;

use crate::item::{ItemStatus, Schedulable, ScheduledItem};

/// Per-day set of items the current announcer has dismissed.
///
/// Keys rotate at local midnight (`read:YYYY-MM-DD`), so yesterday's
/// dismissals never hide anything today. Testimonials and content use
/// separate namespaces.
pub trait ReadCache: Send + Sync {
    fn contains(&self, kind: ItemKind, day: NaiveDate, id: &ItemId) -> bool;
    fn insert(&self, kind: ItemKind, day: NaiveDate, id: &ItemId);
}

/// Cache key for one calendar day.
pub fn day_key(day: NaiveDate) -> String {
    format!("read:{}", day.format("%Y-%m-%d"))
}

/// Process-local [`ReadCache`]. Lost on restart; see the store crate for a
/// persistent one.
#[derive(Debug, Default)]
pub struct LocalReadCache {
    days: Mutex<HashMap<(ItemKind, String), HashSet<ItemId>>>,
}

impl LocalReadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of dismissed items of `kind` on `day`.
    pub fn len_for(&self, kind: ItemKind, day: NaiveDate) -> usize {
        self.days
            .lock()
            .unwrap()
            .get(&(kind, day_key(day)))
            .map_or(0, HashSet::len)
    }

    /// Drop every day except `today`.
    pub fn prune_except(&self, today: NaiveDate) {
        let keep = day_key(today);
        self.days.lock().unwrap().retain(|(_, key), _| *key == keep);
    }
}

impl ReadCache for LocalReadCache {
    fn contains(&self, kind: ItemKind, day: NaiveDate, id: &ItemId) -> bool {
        self.days
            .lock()
            .unwrap()
            .get(&(kind, day_key(day)))
            .is_some_and(|ids| ids.contains(id))
    }

    fn insert(&self, kind: ItemKind, day: NaiveDate, id: &ItemId) {
        self.days
            .lock()
            .unwrap()
            .entry((kind, day_key(day)))
            .or_default()
            .insert(id.clone());
    }
}

/// Remove items the announcer has already dealt with.
///
/// Rules, in order:
/// 1. dismissed today in the local cache: drop;
/// 2. non-recurring and `status = read`: drop, read is terminal;
/// 3. read by `actor` today according to the backend: drop, and record the
///    read in the local cache so both trackers agree;
/// 4. read by `actor` on an earlier day: keep, a new day resets visibility.
///
/// Without an actor only rules 1 and 2 apply.
pub fn filter_unread(
    items: Vec<ScheduledItem>,
    actor: Option<&ActorId>,
    today: NaiveDate,
    cache: &dyn ReadCache,
    policy: RecurrencePolicy,
) -> Vec<ScheduledItem> {
    items
        .into_iter()
        .filter(|item| {
            let kind = item.kind();
            if cache.contains(kind, today, item.id()) {
                return false;
            }
            let read = item.read_state();
            if read.status == ItemStatus::Read && !item.is_recurring(policy) {
                return false;
            }
            if let Some(actor) = actor {
                if read.read_by_on(actor, today) {
                    debug!(item_id = %item.id(), %kind, "read earlier today; syncing local cache");
                    cache.insert(kind, today, item.id());
                    return false;
                }
            }
            true
        })
        .collect()
}
