use std::collections::HashMap;

use chrono::NaiveDate;
use onair_core::ProgramId;
use tracing::debug;

use crate::clock::{parse_time_to_minutes, NowParts};
use crate::item::{Program, Schedulable, ScheduledItem};

/// True iff `at` falls on one of the program's days and inside its
/// inclusive `[start_time, end_time]` range. Fails closed on missing or
/// unparsable data.
pub fn is_program_active(program: &Program, at: &NowParts) -> bool {
    if !program.days.contains(&at.weekday) {
        return false;
    }
    let (Some(start), Some(end)) = (program.start_time.as_deref(), program.end_time.as_deref())
    else {
        return false;
    };
    match (parse_time_to_minutes(start), parse_time_to_minutes(end)) {
        (Ok(start), Ok(end)) => start <= at.minute_of_day && at.minute_of_day <= end,
        (Err(e), _) | (_, Err(e)) => {
            debug!(program_id = %program.id, error = %e, "program has unparsable times");
            false
        }
    }
}

/// Programs on air at `at`, in input order.
pub fn programs_on_air<'a>(programs: &'a [Program], at: &NowParts) -> Vec<&'a Program> {
    programs
        .iter()
        .filter(|p| is_program_active(p, at))
        .collect()
}

/// Validity-window check only: start/end dates against `today`.
pub fn is_item_in_window(item: &impl Schedulable, today: NaiveDate) -> bool {
    item.validity_window().contains(today)
}

/// Full membership test for one item at one instant.
///
/// On top of the validity window, an item owned by a program requires that
/// program to be on air, unless it is a testimonial with its own date range.
pub fn is_item_eligible(
    item: &ScheduledItem,
    at: &NowParts,
    programs: &HashMap<&ProgramId, &Program>,
) -> bool {
    if !is_item_in_window(item, at.date) {
        return false;
    }
    if item.has_independent_window() {
        return true;
    }
    match &item.schedule().program_id {
        None => true,
        Some(program_id) => programs
            .get(program_id)
            .is_some_and(|p| is_program_active(p, at)),
    }
}
