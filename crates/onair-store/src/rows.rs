//! Backend row shapes and their mapping to agenda types.
//!
//! Rows are decoded leniently: unknown weekday tokens are dropped, ids may
//! be numbers or strings, timestamps may or may not carry an offset. A row
//! that still fails to decode is skipped by the caller, never fatal.

use std::collections::BTreeSet;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use onair_agenda::{
    ItemSchedule, ItemStatus, ProducedContent, Program, ReadPatch, ReadState, ScheduledItem,
    Testimonial,
};
use onair_core::{ActorId, ItemId, ItemKind, ProgramId, Weekday};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{Result, StoreError};

pub const COL_ID: &str = "id";
pub const COL_STATUS: &str = "status";
pub const COL_RECURRING: &str = "recurring";
pub const COL_END_DATE: &str = "end_date";
pub const COL_SCHEDULED_DATE: &str = "scheduled_date";
pub const COL_SCHEDULED_TIME: &str = "scheduled_time";
pub const COL_READ_BY: &str = "read_by";
pub const COL_READ_AT: &str = "read_at";

#[derive(Debug, Deserialize)]
struct ProgramRow {
    #[serde(deserialize_with = "de_id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default, alias = "host")]
    presenter: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    #[serde(default)]
    days: Option<Vec<String>>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemRow {
    #[serde(deserialize_with = "de_id")]
    id: String,
    // testimonial
    #[serde(default, alias = "sponsor_name")]
    sponsor: Option<String>,
    #[serde(default)]
    text: Option<String>,
    // produced content
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "body")]
    content: Option<String>,
    #[serde(default)]
    scheduled_date: Option<String>,
    // shared
    #[serde(default, alias = "schedule_time", alias = "time")]
    scheduled_time: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    program_id: Option<String>,
    status: Option<String>,
    #[serde(default)]
    recurring: Option<bool>,
    #[serde(default)]
    read_by: Option<Vec<String>>,
    read_at: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(id: RawId) -> Self {
        match id {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

fn de_id<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    RawId::deserialize(d).map(String::from)
}

fn de_opt_id<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(Option::<RawId>::deserialize(d)?.map(String::from))
}

/// Accepts `YYYY-MM-DD` or anything starting with it (timestamps).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    s.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

/// RFC 3339 timestamps are converted to local time; offset-less ones are
/// taken as already local.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Local wall-clock time rendered as RFC 3339 for writing back.
pub fn format_timestamp(at: NaiveDateTime) -> String {
    match Local.from_local_datetime(&at).earliest() {
        Some(dt) => dt.to_rfc3339(),
        // Inside a DST gap: no such local time exists, write it offset-less.
        None => at.format("%Y-%m-%dT%H:%M:%S").to_string(),
    }
}

fn parse_status(s: Option<&str>) -> ItemStatus {
    match s {
        Some("read") => ItemStatus::Read,
        _ => ItemStatus::Pending,
    }
}

fn parse_days(program_id: &str, raw: Option<Vec<String>>) -> Vec<Weekday> {
    raw.unwrap_or_default()
        .iter()
        .filter_map(|token| match token.parse::<Weekday>() {
            Ok(day) => Some(day),
            Err(e) => {
                warn!(program_id, token = %token, "dropping day token: {e}");
                None
            }
        })
        .collect()
}

pub fn program_from_row(row: Value) -> Result<Program> {
    let row: ProgramRow =
        serde_json::from_value(row).map_err(|e| StoreError::Decode(e.to_string()))?;
    let days = parse_days(&row.id, row.days);
    Ok(Program {
        id: ProgramId::from(row.id),
        name: row.name,
        presenter: row.presenter.unwrap_or_default(),
        start_time: row.start_time,
        end_time: row.end_time,
        days,
        status: row.status,
    })
}

pub fn item_from_row(kind: ItemKind, row: Value) -> Result<ScheduledItem> {
    let row: ItemRow =
        serde_json::from_value(row).map_err(|e| StoreError::Decode(e.to_string()))?;

    let schedule = ItemSchedule {
        time: row.scheduled_time.unwrap_or_default(),
        program_id: row.program_id.map(ProgramId::from),
        recurring: row.recurring.unwrap_or(false),
        start_date: row.start_date.as_deref().and_then(parse_date),
        end_date: row.end_date.as_deref().and_then(parse_date),
    };
    let read = ReadState {
        status: parse_status(row.status.as_deref()),
        read_by: row
            .read_by
            .unwrap_or_default()
            .into_iter()
            .map(ActorId::from)
            .collect::<BTreeSet<_>>(),
        read_at: row.read_at.as_deref().and_then(parse_timestamp),
    };
    let id = ItemId::from(row.id);

    Ok(match kind {
        ItemKind::Testimonial => ScheduledItem::Testimonial(Testimonial {
            id,
            sponsor: row.sponsor.unwrap_or_default(),
            text: row.text.or(row.content).unwrap_or_default(),
            schedule,
            read,
        }),
        ItemKind::Content => ScheduledItem::Content(ProducedContent {
            id,
            title: row.title.unwrap_or_default(),
            body: row.content.or(row.text).unwrap_or_default(),
            scheduled_date: row.scheduled_date.as_deref().and_then(parse_date),
            schedule,
            read,
        }),
    })
}

/// JSON body for the mark-as-read `update`.
pub fn patch_to_json(patch: &ReadPatch) -> Value {
    let read_by: Vec<&str> = patch.read_by.iter().map(ActorId::as_str).collect();
    json!({
        COL_STATUS: patch.status.to_string(),
        COL_READ_BY: read_by,
        COL_READ_AT: format_timestamp(patch.read_at),
    })
}

/// Decode `rows`, skipping (and logging) the ones that don't fit.
pub fn decode_rows<T>(
    table: &str,
    rows: Vec<Value>,
    decode: impl Fn(Value) -> Result<T>,
) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match decode(row) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(table, error = %e, "skipping undecodable row");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use onair_agenda::Schedulable;

    #[test]
    fn program_row_with_numeric_id_and_bad_day() {
        let row = json!({
            "id": 12,
            "name": "Tarde Libre",
            "host": "Luis",
            "start_time": "14:00:00",
            "end_time": "16:00:00",
            "days": ["monday", "Funday", "friday"],
        });
        let p = program_from_row(row).unwrap();
        assert_eq!(p.id.as_str(), "12");
        assert_eq!(p.presenter, "Luis");
        assert_eq!(p.days, vec![Weekday::Monday, Weekday::Friday]);
    }

    #[test]
    fn testimonial_row() {
        let row = json!({
            "id": "9b1c",
            "sponsor": "Acme",
            "text": "Acme, open late",
            "scheduled_time": "09:30",
            "program_id": 4,
            "status": "read",
            "recurring": true,
            "read_by": ["u1"],
            "read_at": "2026-10-15T09:31:00",
            "start_date": "2026-10-01",
            "end_date": "2026-10-31T00:00:00+00:00",
        });
        let item = item_from_row(ItemKind::Testimonial, row).unwrap();
        assert_eq!(item.kind(), ItemKind::Testimonial);
        assert_eq!(item.headline(), "Acme");
        assert_eq!(item.schedule().program_id, Some(ProgramId::from("4")));
        assert_eq!(item.schedule().end_date, NaiveDate::from_ymd_opt(2026, 10, 31));
        let read = item.read_state();
        assert_eq!(read.status, ItemStatus::Read);
        assert!(read.read_by.contains(&ActorId::from("u1")));
        assert_eq!(
            read.read_at,
            NaiveDate::from_ymd_opt(2026, 10, 15).and_then(|d| d.and_hms_opt(9, 31, 0))
        );
    }

    #[test]
    fn content_row_defaults() {
        let row = json!({
            "id": 3,
            "title": "Agenda cultural",
            "content": "Esta semana...",
            "scheduled_date": "2026-10-15",
            "time": "11:00",
        });
        let item = item_from_row(ItemKind::Content, row).unwrap();
        assert_eq!(item.body(), "Esta semana...");
        assert_eq!(item.schedule().time, "11:00");
        assert!(!item.schedule().recurring);
        assert_eq!(item.read_state().status, ItemStatus::Pending);
    }

    #[test]
    fn row_without_id_is_rejected() {
        assert!(item_from_row(ItemKind::Content, json!({"title": "x"})).is_err());
        let decoded = decode_rows("produced_content", vec![json!({}), json!({"id": 1})], |r| {
            item_from_row(ItemKind::Content, r)
        });
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn timestamp_round_trip_through_local_time() {
        let at = NaiveDate::from_ymd_opt(2026, 10, 15)
            .and_then(|d| d.and_hms_opt(9, 1, 0))
            .unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(at)), Some(at));
    }

    #[test]
    fn patch_body_shape() {
        let patch = ReadPatch {
            status: ItemStatus::Read,
            read_by: vec![ActorId::from("u1"), ActorId::from("u2")],
            read_at: NaiveDate::from_ymd_opt(2026, 10, 15)
                .and_then(|d| d.and_hms_opt(9, 1, 0))
                .unwrap(),
        };
        let body = patch_to_json(&patch);
        assert_eq!(body["status"], "read");
        assert_eq!(body["read_by"], json!(["u1", "u2"]));
        assert!(body["read_at"].as_str().unwrap().starts_with("2026-10-15T09:01:00"));
    }
}
