use std::cmp::Ordering;
use std::fmt;

use onair_core::ItemKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Backend resources the agenda reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Programs,
    Testimonials,
    ProducedContent,
    /// Actor id → e-mail, for showing who read an item.
    Profiles,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Programs => "programs",
            Table::Testimonials => "testimonials",
            Table::ProducedContent => "produced_content",
            Table::Profiles => "profiles",
        }
    }

    pub fn for_kind(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Testimonial => Table::Testimonials,
            ItemKind::Content => Table::ProducedContent,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One column predicate. Multiple filters in a query are AND-ed.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Gte(String, Value),
    Lte(String, Value),
    IsNull(String),
    NotNull(String),
    In(String, Vec<Value>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _)
            | Filter::Gte(c, _)
            | Filter::Lte(c, _)
            | Filter::IsNull(c)
            | Filter::NotNull(c)
            | Filter::In(c, _) => c,
        }
    }

    /// PostgREST operator expression, e.g. `gte.2026-10-15` or `not.is.null`.
    pub fn to_param(&self) -> (String, String) {
        let expr = match self {
            Filter::Eq(_, v) => format!("eq.{}", literal(v)),
            Filter::Gte(_, v) => format!("gte.{}", literal(v)),
            Filter::Lte(_, v) => format!("lte.{}", literal(v)),
            Filter::IsNull(_) => "is.null".to_string(),
            Filter::NotNull(_) => "not.is.null".to_string(),
            Filter::In(_, vs) => {
                let list: Vec<String> = vs.iter().map(literal).collect();
                format!("in.({})", list.join(","))
            }
        };
        (self.column().to_string(), expr)
    }

    /// Evaluate against an in-memory row.
    pub fn matches(&self, row: &Value) -> bool {
        let cell = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Filter::Eq(_, v) => loose_eq(cell, v),
            Filter::Gte(_, v) => compare(cell, v).is_some_and(|o| o != Ordering::Less),
            Filter::Lte(_, v) => compare(cell, v).is_some_and(|o| o != Ordering::Greater),
            Filter::IsNull(_) => cell.is_null(),
            Filter::NotNull(_) => !cell.is_null(),
            Filter::In(_, vs) => vs.iter().any(|v| loose_eq(cell, v)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Filters plus ordering for a `select`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn gte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Gte(column.to_string(), value.into()));
        self
    }

    pub fn lte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Lte(column.to_string(), value.into()));
        self
    }

    pub fn is_null(mut self, column: &str) -> Self {
        self.filters.push(Filter::IsNull(column.to_string()));
        self
    }

    pub fn not_null(mut self, column: &str) -> Self {
        self.filters.push(Filter::NotNull(column.to_string()));
        self
    }

    pub fn within(mut self, column: &str, values: Vec<Value>) -> Self {
        self.filters.push(Filter::In(column.to_string(), values));
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            ascending: true,
        });
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            ascending: false,
        });
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Query-string pairs for a PostgREST `GET /rest/v1/{table}`.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(self.filters.iter().map(Filter::to_param));
        if !self.order.is_empty() {
            let order: Vec<String> = self
                .order
                .iter()
                .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
                .collect();
            params.push(("order".to_string(), order.join(",")));
        }
        if let Some(n) = self.limit {
            params.push(("limit".to_string(), n.to_string()));
        }
        params
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Sort rows in place by the query's ordering. Nulls sort last.
    pub fn sort(&self, rows: &mut [Value]) {
        rows.sort_by(|a, b| {
            for o in &self.order {
                let x = a.get(&o.column).unwrap_or(&Value::Null);
                let y = b.get(&o.column).unwrap_or(&Value::Null);
                let ord = match (x.is_null(), y.is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => {
                        let ord = compare(x, y).unwrap_or(Ordering::Equal);
                        if o.ascending {
                            ord
                        } else {
                            ord.reverse()
                        }
                    }
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }
}

fn literal(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

// Ids may be stored as numbers while filters carry strings, so compare
// scalars by their literal form when the JSON types differ.
fn loose_eq(a: &Value, b: &Value) -> bool {
    if a.is_null() || b.is_null() {
        return false;
    }
    a == b || literal(a) == literal(b)
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn postgrest_params() {
        let q = Query::new()
            .eq("status", "pending")
            .gte("end_date", "2026-10-15")
            .not_null("scheduled_time")
            .within("id", vec![json!(1), json!("b")])
            .order_asc("scheduled_time")
            .limit(5);
        let params = q.to_params();
        assert!(params.contains(&("select".into(), "*".into())));
        assert!(params.contains(&("status".into(), "eq.pending".into())));
        assert!(params.contains(&("end_date".into(), "gte.2026-10-15".into())));
        assert!(params.contains(&("scheduled_time".into(), "not.is.null".into())));
        assert!(params.contains(&("id".into(), "in.(1,b)".into())));
        assert!(params.contains(&("order".into(), "scheduled_time.asc".into())));
        assert!(params.contains(&("limit".into(), "5".into())));
    }

    #[test]
    fn in_memory_matching() {
        let row = json!({"id": 7, "status": "pending", "end_date": "2026-10-20", "read_at": null});
        assert!(Filter::eq("id", "7").matches(&row));
        assert!(Query::new().gte("end_date", "2026-10-15").matches(&row));
        assert!(!Query::new().lte("end_date", "2026-10-15").matches(&row));
        assert!(Query::new().is_null("read_at").is_null("missing").matches(&row));
        assert!(!Query::new().not_null("read_at").matches(&row));
        // A null cell never satisfies a comparison.
        assert!(!Query::new().gte("read_at", "2026-01-01").matches(&row));
    }

    #[test]
    fn sort_puts_nulls_last() {
        let mut rows = vec![
            json!({"t": "10:00"}),
            json!({"t": null}),
            json!({"t": "08:00"}),
        ];
        Query::new().order_asc("t").sort(&mut rows);
        assert_eq!(rows[0]["t"], "08:00");
        assert_eq!(rows[2]["t"], Value::Null);
    }
}
