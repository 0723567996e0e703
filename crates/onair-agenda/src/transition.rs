use chrono::NaiveDateTime;
use onair_core::config::RecurrencePolicy;
use onair_core::ActorId;
use serde::Serialize;

use crate::item::{ItemStatus, Schedulable, ScheduledItem};

/// Outcome of marking an item read.
///
/// `Recurring` items are hidden only until local midnight; `Done` items
/// are gone for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceResult {
    Recurring,
    Done,
}

/// Columns written back to the backend after a read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadPatch {
    pub status: ItemStatus,
    pub read_by: Vec<ActorId>,
    pub read_at: NaiveDateTime,
}

/// `Pending -> Read`. Appending `actor` is idempotent; `read_at` is
/// overwritten, last writer wins.
pub fn apply_read(
    item: &mut ScheduledItem,
    actor: &ActorId,
    now: NaiveDateTime,
    policy: RecurrencePolicy,
) -> (ReadPatch, RecurrenceResult) {
    let result = if item.is_recurring(policy) {
        RecurrenceResult::Recurring
    } else {
        RecurrenceResult::Done
    };

    let state = item.read_state_mut();
    state.read_by.insert(actor.clone());
    state.status = ItemStatus::Read;
    state.read_at = Some(now);

    let patch = ReadPatch {
        status: state.status,
        read_by: state.read_by.iter().cloned().collect(),
        read_at: now,
    };
    (patch, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::fixtures::*;

    #[test]
    fn marks_read_and_appends_actor_once() {
        let now = day(2026, 10, 15).and_hms_opt(9, 0, 0).unwrap();
        let mut item = testimonial("t1", "09:00");
        let ana = ActorId::from("ana");

        let (patch, result) = apply_read(&mut item, &ana, now, RecurrencePolicy::FlagOrDateRange);
        assert_eq!(result, RecurrenceResult::Done);
        assert_eq!(patch.status, ItemStatus::Read);
        assert_eq!(patch.read_by, vec![ana.clone()]);

        let later = now + chrono::Duration::minutes(5);
        let (patch, _) = apply_read(&mut item, &ana, later, RecurrencePolicy::FlagOrDateRange);
        assert_eq!(patch.read_by.len(), 1);
        assert_eq!(item.read_state().read_at, Some(later));
    }

    #[test]
    fn recurring_items_report_recurring() {
        let now = day(2026, 10, 15).and_hms_opt(9, 0, 0).unwrap();
        let mut item = with_schedule(testimonial("t1", "09:00"), |s| s.recurring = true);
        let (_, result) = apply_read(
            &mut item,
            &ActorId::from("ana"),
            now,
            RecurrencePolicy::ExplicitFlag,
        );
        assert_eq!(result, RecurrenceResult::Recurring);
    }

    #[test]
    fn concurrent_readers_accumulate() {
        let now = day(2026, 10, 15).and_hms_opt(9, 0, 0).unwrap();
        let mut item = testimonial("t1", "09:00");
        apply_read(&mut item, &ActorId::from("ana"), now, RecurrencePolicy::default());
        let (patch, _) = apply_read(&mut item, &ActorId::from("luis"), now, RecurrencePolicy::default());
        assert_eq!(patch.read_by.len(), 2);
    }
}
