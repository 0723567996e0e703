use std::sync::Mutex;

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, Timelike};
use onair_core::Weekday;

use crate::error::{AgendaError, Result};

/// Source of the local wall-clock instant.
///
/// Resolution reads the clock once per cycle; nothing caches the result,
/// since a long-running process crosses midnight.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall clock of the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Settable clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    at: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(at: NaiveDateTime) -> Self {
        Self { at: Mutex::new(at) }
    }

    pub fn set(&self, at: NaiveDateTime) {
        *self.at.lock().unwrap() = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut at = self.at.lock().unwrap();
        *at += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.at.lock().unwrap()
    }
}

/// The pieces of an instant that the window rules look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowParts {
    pub date: NaiveDate,
    pub weekday: Weekday,
    /// Zero-padded `HH:MM`.
    pub hh_mm: String,
    pub minute_of_day: u32,
}

impl NowParts {
    pub fn from_datetime(at: NaiveDateTime) -> Self {
        let minute_of_day = at.hour() * 60 + at.minute();
        Self {
            date: at.date(),
            weekday: Weekday::from(at.weekday()),
            hh_mm: format!("{:02}:{:02}", at.hour(), at.minute()),
            minute_of_day,
        }
    }

    pub fn now(clock: &dyn Clock) -> Self {
        Self::from_datetime(clock.now())
    }
}

/// Parse `HH:MM` or `HH:MM:SS` into minutes since midnight. Seconds are ignored.
pub fn parse_time_to_minutes(s: &str) -> Result<u32> {
    let mut parts = s.trim().split(':');
    let (hours, minutes) = match (parts.next(), parts.next()) {
        (Some(h), Some(m)) => (h, m),
        _ => {
            return Err(AgendaError::Parse {
                input: s.to_string(),
                reason: "expected HH:MM".to_string(),
            })
        }
    };
    let hours: u32 = hours.trim().parse().map_err(|_| AgendaError::Parse {
        input: s.to_string(),
        reason: "hour is not numeric".to_string(),
    })?;
    let minutes: u32 = minutes.trim().parse().map_err(|_| AgendaError::Parse {
        input: s.to_string(),
        reason: "minute is not numeric".to_string(),
    })?;
    if hours > 23 || minutes > 59 {
        return Err(AgendaError::Parse {
            input: s.to_string(),
            reason: "out of range".to_string(),
        });
    }
    Ok(hours * 60 + minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn now_parts_of_tuesday_morning() {
        // 2026-10-13 is a Tuesday.
        let parts = NowParts::from_datetime(at(2026, 10, 13, 9, 5));
        assert_eq!(parts.weekday, Weekday::Tuesday);
        assert_eq!(parts.hh_mm, "09:05");
        assert_eq!(parts.minute_of_day, 545);
    }

    #[test]
    fn parses_with_and_without_seconds() {
        assert_eq!(parse_time_to_minutes("08:30").unwrap(), 510);
        assert_eq!(parse_time_to_minutes("23:59:59").unwrap(), 1439);
        assert_eq!(parse_time_to_minutes(" 7:05 ").unwrap(), 425);
    }

    #[test]
    fn rejects_malformed_times() {
        assert!(parse_time_to_minutes("0830").is_err());
        assert!(parse_time_to_minutes("").is_err());
        assert!(parse_time_to_minutes("ab:30").is_err());
        assert!(matches!(
            parse_time_to_minutes("08:xx"),
            Err(AgendaError::Parse { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_times() {
        for input in ["71582789:00", "25:00", "24:00", "10:60", "00:4294967295"] {
            assert!(
                matches!(parse_time_to_minutes(input), Err(AgendaError::Parse { .. })),
                "{input} should be rejected"
            );
        }
        assert_eq!(parse_time_to_minutes("00:00").unwrap(), 0);
    }

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::new(at(2026, 10, 13, 23, 59));
        clock.advance(Duration::minutes(2));
        assert_eq!(clock.now(), at(2026, 10, 14, 0, 1));
        assert_eq!(NowParts::now(&clock).weekday, Weekday::Wednesday);
    }
}
