use std::cmp::Ordering;

use chrono::NaiveDate;
use onair_core::config::{AgendaConfig, RecurrencePolicy};
use serde::Serialize;

use crate::error::Result;
use crate::item::{Schedulable, ScheduledItem};

/// Look-ahead / look-behind bounds, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrgencyWindow {
    pub look_ahead: i32,
    pub look_behind: i32,
    /// Items more than this many minutes overdue are treated as missed.
    pub late_cutoff: i32,
}

impl Default for UrgencyWindow {
    fn default() -> Self {
        Self::from(&AgendaConfig::default())
    }
}

impl From<&AgendaConfig> for UrgencyWindow {
    fn from(cfg: &AgendaConfig) -> Self {
        Self {
            look_ahead: cfg.look_ahead_minutes,
            look_behind: cfg.look_behind_minutes,
            late_cutoff: cfg.late_cutoff_minutes,
        }
    }
}

impl UrgencyWindow {
    pub fn is_upcoming(&self, minutes_until_due: i32) -> bool {
        -self.look_behind <= minutes_until_due && minutes_until_due <= self.look_ahead
    }

    pub fn is_missed(&self, minutes_until_due: i32) -> bool {
        minutes_until_due < -self.late_cutoff
    }
}

/// How an entry repeats, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecurrenceLabel {
    Once,
    Daily { until: Option<NaiveDate> },
}

impl std::fmt::Display for RecurrenceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecurrenceLabel::Once => write!(f, "once"),
            RecurrenceLabel::Daily { until: None } => write!(f, "daily"),
            RecurrenceLabel::Daily { until: Some(d) } => write!(f, "daily until {d}"),
        }
    }
}

/// One row of the agenda. Rebuilt from scratch on every cycle; key UI
/// state on `item.key()`, never on the entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgendaEntry {
    pub item: ScheduledItem,
    pub scheduled_minute: u32,
    /// Negative once the item is overdue.
    pub minutes_until_due: i32,
    pub is_exact_time: bool,
    pub is_upcoming: bool,
    /// Overdue but still inside the late cutoff.
    pub is_late: bool,
    pub recurrence: RecurrenceLabel,
}

/// Annotate `item` relative to `now_minute`.
pub fn classify(
    item: ScheduledItem,
    now_minute: u32,
    window: &UrgencyWindow,
    policy: RecurrencePolicy,
) -> Result<AgendaEntry> {
    let scheduled_minute = item.scheduled_minute()?;
    let minutes_until_due = scheduled_minute as i32 - now_minute as i32;
    let recurrence = if item.is_recurring(policy) {
        RecurrenceLabel::Daily {
            until: item.schedule().end_date,
        }
    } else {
        RecurrenceLabel::Once
    };
    Ok(AgendaEntry {
        scheduled_minute,
        minutes_until_due,
        is_exact_time: minutes_until_due == 0,
        is_upcoming: window.is_upcoming(minutes_until_due),
        is_late: minutes_until_due < 0,
        recurrence,
        item,
    })
}

/// Exact-time first, then upcoming, then soonest, then by the raw time
/// string. Stable.
pub fn sort_entries(entries: &mut [AgendaEntry]) {
    entries.sort_by(compare_entries);
}

fn compare_entries(a: &AgendaEntry, b: &AgendaEntry) -> Ordering {
    b.is_exact_time
        .cmp(&a.is_exact_time)
        .then_with(|| b.is_upcoming.cmp(&a.is_upcoming))
        .then_with(|| a.minutes_until_due.cmp(&b.minutes_until_due))
        .then_with(|| a.item.schedule().time.cmp(&b.item.schedule().time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::fixtures::*;

    const POLICY: RecurrencePolicy = RecurrencePolicy::FlagOrDateRange;

    fn entry(id: &str, time: &str, now_minute: u32) -> AgendaEntry {
        classify(
            testimonial(id, time),
            now_minute,
            &UrgencyWindow::default(),
            POLICY,
        )
        .unwrap()
    }

    #[test]
    fn flags_relative_to_now() {
        let now = 9 * 60; // 09:00
        let exact = entry("a", "09:00", now);
        assert!(exact.is_exact_time && exact.is_upcoming && !exact.is_late);

        let overdue = entry("b", "08:45", now);
        assert_eq!(overdue.minutes_until_due, -15);
        assert!(overdue.is_upcoming && overdue.is_late);

        let ahead = entry("c", "09:30", now);
        assert!(ahead.is_upcoming && !ahead.is_exact_time);

        let far = entry("d", "09:31", now);
        assert!(!far.is_upcoming);
    }

    #[test]
    fn missed_threshold_is_strict() {
        let w = UrgencyWindow::default();
        assert!(!w.is_missed(-15));
        assert!(w.is_missed(-16));
    }

    #[test]
    fn malformed_time_is_an_error() {
        let res = classify(
            testimonial("x", "soon"),
            0,
            &UrgencyWindow::default(),
            POLICY,
        );
        assert!(res.is_err());
    }

    #[test]
    fn sort_order() {
        let now = 12 * 60;
        let mut entries = vec![
            entry("late", "11:55", now),
            entry("far", "12:40", now),
            entry("soon", "12:10", now),
            entry("exact", "12:00", now),
        ];
        sort_entries(&mut entries);
        let ids: Vec<_> = entries.iter().map(|e| e.item.id().as_str()).collect();
        assert_eq!(ids, ["exact", "late", "soon", "far"]);
    }

    #[test]
    fn time_string_breaks_ties() {
        let now = 12 * 60;
        let mut entries = vec![entry("b", "12:10:30", now), entry("a", "12:10", now)];
        sort_entries(&mut entries);
        assert_eq!(entries[0].item.id().as_str(), "a");
    }

    #[test]
    fn recurrence_label_display() {
        assert_eq!(RecurrenceLabel::Once.to_string(), "once");
        let until = RecurrenceLabel::Daily {
            until: Some(day(2026, 10, 31)),
        };
        assert_eq!(until.to_string(), "daily until 2026-10-31");
    }
}
