use std::collections::HashMap;
use std::fmt::Write;

use onair_agenda::{AgendaEntry, Program, Resolution, Schedulable};
use onair_core::ActorId;

/// Short urgency tag for one entry.
pub fn urgency_tag(entry: &AgendaEntry) -> &'static str {
    if entry.is_exact_time {
        "NOW"
    } else if entry.is_late {
        "LATE"
    } else if entry.is_upcoming {
        "SOON"
    } else {
        ""
    }
}

/// `in 5 min`, `3 min ago`, `now`.
pub fn relative(minutes_until_due: i32) -> String {
    match minutes_until_due {
        0 => "now".to_string(),
        m if m > 0 => format!("in {m} min"),
        m => format!("{} min ago", -m),
    }
}

/// Plain-text agenda table. `emails` maps actor ids to display names for
/// the "last read by" column.
pub fn agenda(resolution: &Resolution, emails: &HashMap<ActorId, String>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Agenda at {}", resolution.at.format("%Y-%m-%d %H:%M"));
    if resolution.entries.is_empty() {
        let _ = writeln!(out, "  nothing to read");
    }
    for entry in &resolution.entries {
        let item = &entry.item;
        let _ = write!(
            out,
            "  {:<4} {:>5}  {:<12} {:<11} {:<24} {}",
            urgency_tag(entry),
            item.schedule().time,
            relative(entry.minutes_until_due),
            item.kind(),
            item.headline(),
            entry.recurrence,
        );
        let readers: Vec<&str> = item
            .read_state()
            .read_by
            .iter()
            .map(|id| emails.get(id).map_or(id.as_str(), String::as_str))
            .collect();
        if !readers.is_empty() {
            let _ = write!(out, "  (last read by {})", readers.join(", "));
        }
        out.push('\n');
    }
    if resolution.missed > 0 || resolution.malformed > 0 {
        let _ = writeln!(
            out,
            "  ({} missed, {} with unreadable times)",
            resolution.missed, resolution.malformed
        );
    }
    out
}

pub fn programs(programs: &[Program]) -> String {
    let mut out = String::new();
    if programs.is_empty() {
        let _ = writeln!(out, "no programs");
    }
    for p in programs {
        let days: Vec<&str> = p.days.iter().map(|d| d.as_str()).collect();
        let _ = writeln!(
            out,
            "  {:<24} {:<16} {}-{}  {}",
            p.name,
            p.presenter,
            p.start_time.as_deref().unwrap_or("?"),
            p.end_time.as_deref().unwrap_or("?"),
            days.join(","),
        );
    }
    out
}
