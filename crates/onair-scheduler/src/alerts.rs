use std::collections::HashSet;

use chrono::{NaiveDateTime, Timelike};
use onair_agenda::{ItemKey, Resolution, Schedulable};
use serde::Serialize;

/// An item has reached its due minute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExactTimeAlert {
    pub key: ItemKey,
    pub headline: String,
    /// The due minute, seconds truncated.
    pub minute: NaiveDateTime,
}

/// Turns exact-time entries into alerts, at most one per item per minute,
/// however often the same minute is polled.
#[derive(Debug, Default)]
pub struct ExactTimeDetector {
    fired: HashSet<(ItemKey, NaiveDateTime)>,
}

impl ExactTimeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detect(&mut self, resolution: &Resolution) -> Vec<ExactTimeAlert> {
        let minute = truncate_to_minute(resolution.at);
        self.fired.retain(|(_, m)| *m >= minute);

        resolution
            .entries
            .iter()
            .filter(|e| e.is_exact_time)
            .filter_map(|e| {
                let key = e.item.key();
                self.fired
                    .insert((key.clone(), minute))
                    .then(|| ExactTimeAlert {
                        key,
                        headline: e.item.headline().to_string(),
                        minute,
                    })
            })
            .collect()
    }
}

fn truncate_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}
