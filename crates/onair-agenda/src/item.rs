use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use onair_core::config::RecurrencePolicy;
use onair_core::{ActorId, ItemId, ItemKind, ProgramId, Weekday};
use serde::{Deserialize, Serialize};

use crate::clock::parse_time_to_minutes;
use crate::error::Result;

/// A recurring show slot.
///
/// `start_time`/`end_time` are inclusive bounds within a single day.
/// A program missing either time, or with no days, is never on air.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub name: String,
    pub presenter: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub days: Vec<Weekday>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Pending,
    Read,
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Pending => write!(f, "pending"),
            ItemStatus::Read => write!(f, "read"),
        }
    }
}

/// Who read an item, and when it was last read. Local wall-clock time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReadState {
    pub status: ItemStatus,
    pub read_by: BTreeSet<ActorId>,
    pub read_at: Option<NaiveDateTime>,
}

impl ReadState {
    /// True if `actor` read the item on `day`.
    pub fn read_by_on(&self, actor: &ActorId, day: NaiveDate) -> bool {
        self.read_by.contains(actor) && self.read_at.is_some_and(|t| t.date() == day)
    }
}

/// Scheduling fields shared by both item variants.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemSchedule {
    /// Time of day the item is due, `HH:MM[:SS]`. Parsed lazily so a bad
    /// row only drops itself.
    pub time: String,
    pub program_id: Option<ProgramId>,
    pub recurring: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Inclusive calendar range in which an item may appear. Open ends are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ValidityWindow {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start.is_none_or(|s| s <= day) && self.end.is_none_or(|e| e >= day)
    }
}

/// A sponsor read-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testimonial {
    pub id: ItemId,
    pub sponsor: String,
    pub text: String,
    pub schedule: ItemSchedule,
    pub read: ReadState,
}

/// A produced segment tied to a program slot and a broadcast date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducedContent {
    pub id: ItemId,
    pub title: String,
    pub body: String,
    pub scheduled_date: Option<NaiveDate>,
    pub schedule: ItemSchedule,
    pub read: ReadState,
}

/// Identity of an item across both backend tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub kind: ItemKind,
    pub id: ItemId,
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// The fields the agenda pipeline needs from any schedulable row.
pub trait Schedulable {
    fn id(&self) -> &ItemId;
    fn kind(&self) -> ItemKind;
    fn schedule(&self) -> &ItemSchedule;
    fn read_state(&self) -> &ReadState;

    /// The calendar range this item may appear in.
    fn validity_window(&self) -> ValidityWindow;

    /// First calendar day of the item, if it has one.
    fn first_day(&self) -> Option<NaiveDate> {
        self.validity_window().start
    }

    fn scheduled_minute(&self) -> Result<u32> {
        parse_time_to_minutes(&self.schedule().time)
    }

    /// Whether the item comes back every day inside its validity window.
    /// Depends only on the row, never on the current day.
    fn is_recurring(&self, policy: RecurrencePolicy) -> bool {
        let schedule = self.schedule();
        match policy {
            RecurrencePolicy::ExplicitFlag => schedule.recurring,
            RecurrencePolicy::FlagOrDateRange => {
                schedule.recurring
                    || match (self.first_day(), schedule.end_date) {
                        (Some(first), Some(end)) => end > first,
                        // Open start: runs every day up to `end`.
                        (None, Some(_)) => true,
                        (_, None) => false,
                    }
            }
        }
    }

    fn key(&self) -> ItemKey {
        ItemKey {
            kind: self.kind(),
            id: self.id().clone(),
        }
    }
}

impl Schedulable for Testimonial {
    fn id(&self) -> &ItemId {
        &self.id
    }

    fn kind(&self) -> ItemKind {
        ItemKind::Testimonial
    }

    fn schedule(&self) -> &ItemSchedule {
        &self.schedule
    }

    fn read_state(&self) -> &ReadState {
        &self.read
    }

    fn validity_window(&self) -> ValidityWindow {
        ValidityWindow {
            start: self.schedule.start_date,
            end: self.schedule.end_date,
        }
    }
}

impl Schedulable for ProducedContent {
    fn id(&self) -> &ItemId {
        &self.id
    }

    fn kind(&self) -> ItemKind {
        ItemKind::Content
    }

    fn schedule(&self) -> &ItemSchedule {
        &self.schedule
    }

    fn read_state(&self) -> &ReadState {
        &self.read
    }

    // A content row without its own range airs on its scheduled date only,
    // unless explicitly flagged recurring.
    fn validity_window(&self) -> ValidityWindow {
        let start = self.schedule.start_date.or(self.scheduled_date);
        let end = match self.schedule.end_date {
            Some(end) => Some(end),
            None if self.schedule.recurring => None,
            None => self.scheduled_date,
        };
        ValidityWindow { start, end }
    }
}

/// A row from either item table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduledItem {
    Testimonial(Testimonial),
    Content(ProducedContent),
}

impl ScheduledItem {
    fn inner(&self) -> &dyn Schedulable {
        match self {
            ScheduledItem::Testimonial(t) => t,
            ScheduledItem::Content(c) => c,
        }
    }

    pub fn read_state_mut(&mut self) -> &mut ReadState {
        match self {
            ScheduledItem::Testimonial(t) => &mut t.read,
            ScheduledItem::Content(c) => &mut c.read,
        }
    }

    /// Headline shown on the agenda: the sponsor or the content title.
    pub fn headline(&self) -> &str {
        match self {
            ScheduledItem::Testimonial(t) => &t.sponsor,
            ScheduledItem::Content(c) => &c.title,
        }
    }

    /// Text the announcer reads out.
    pub fn body(&self) -> &str {
        match self {
            ScheduledItem::Testimonial(t) => &t.text,
            ScheduledItem::Content(c) => &c.body,
        }
    }

    /// Testimonials that carry their own date range run regardless of the
    /// owning program's live clock window.
    pub fn has_independent_window(&self) -> bool {
        match self {
            ScheduledItem::Testimonial(t) => {
                t.schedule.start_date.is_some() || t.schedule.end_date.is_some()
            }
            ScheduledItem::Content(_) => false,
        }
    }
}

impl Schedulable for ScheduledItem {
    fn id(&self) -> &ItemId {
        self.inner().id()
    }

    fn kind(&self) -> ItemKind {
        self.inner().kind()
    }

    fn schedule(&self) -> &ItemSchedule {
        self.inner().schedule()
    }

    fn read_state(&self) -> &ReadState {
        self.inner().read_state()
    }

    fn validity_window(&self) -> ValidityWindow {
        self.inner().validity_window()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn testimonial(id: &str, time: &str) -> ScheduledItem {
        ScheduledItem::Testimonial(Testimonial {
            id: ItemId::from(id),
            sponsor: format!("Sponsor {id}"),
            text: "Brought to you by".to_string(),
            schedule: ItemSchedule {
                time: time.to_string(),
                ..ItemSchedule::default()
            },
            read: ReadState::default(),
        })
    }

    pub fn content(id: &str, time: &str, date: NaiveDate) -> ScheduledItem {
        ScheduledItem::Content(ProducedContent {
            id: ItemId::from(id),
            title: format!("Segment {id}"),
            body: "Segment copy".to_string(),
            scheduled_date: Some(date),
            schedule: ItemSchedule {
                time: time.to_string(),
                ..ItemSchedule::default()
            },
            read: ReadState::default(),
        })
    }

    pub fn with_schedule(
        mut item: ScheduledItem,
        f: impl FnOnce(&mut ItemSchedule),
    ) -> ScheduledItem {
        match &mut item {
            ScheduledItem::Testimonial(t) => f(&mut t.schedule),
            ScheduledItem::Content(c) => f(&mut c.schedule),
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn content_defaults_to_single_day_window() {
        let item = content("c1", "10:00", day(2026, 10, 15));
        let window = item.validity_window();
        assert!(window.contains(day(2026, 10, 15)));
        assert!(!window.contains(day(2026, 10, 16)));
        assert!(!window.contains(day(2026, 10, 14)));
    }

    #[test]
    fn flagged_content_without_end_is_open_ended() {
        let item = with_schedule(content("c1", "10:00", day(2026, 10, 1)), |s| {
            s.recurring = true
        });
        assert!(item.validity_window().contains(day(2027, 1, 1)));
    }

    #[test]
    fn recurrence_policy_controls_date_range_inference() {
        let item = with_schedule(testimonial("t1", "09:00"), |s| {
            s.start_date = Some(day(2026, 10, 1));
            s.end_date = Some(day(2026, 10, 31));
        });
        assert!(item.is_recurring(RecurrencePolicy::FlagOrDateRange));
        assert!(!item.is_recurring(RecurrencePolicy::ExplicitFlag));
    }

    #[test]
    fn single_day_range_is_not_recurring() {
        let item = with_schedule(testimonial("t1", "09:00"), |s| {
            s.start_date = Some(day(2026, 10, 15));
            s.end_date = Some(day(2026, 10, 15));
        });
        assert!(!item.is_recurring(RecurrencePolicy::FlagOrDateRange));
    }

    #[test]
    fn end_date_without_start_recurs_through_its_last_day() {
        let item = with_schedule(testimonial("t1", "09:00"), |s| {
            s.end_date = Some(day(2026, 10, 31));
        });
        assert!(item.is_recurring(RecurrencePolicy::FlagOrDateRange));
        assert!(!item.is_recurring(RecurrencePolicy::ExplicitFlag));
    }

    #[test]
    fn independent_window_only_for_dated_testimonials() {
        let plain = testimonial("t1", "09:00");
        assert!(!plain.has_independent_window());
        let dated = with_schedule(plain, |s| s.end_date = Some(day(2026, 12, 1)));
        assert!(dated.has_independent_window());
        assert!(!content("c1", "09:00", day(2026, 10, 15)).has_independent_window());
    }

    #[test]
    fn item_serialises_with_kind_tag() {
        let json = serde_json::to_value(testimonial("t1", "09:00")).unwrap();
        assert_eq!(json["kind"], "testimonial");
        assert_eq!(json["read"]["status"], "pending");
    }
}
