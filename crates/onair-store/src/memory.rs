use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::collaborator::{Actor, Collaborator};
use crate::error::{Result, StoreError};
use crate::query::{Filter, Query, Table};

/// In-process backend. Used by the CLI's `--fixture` mode and by tests.
///
/// `set_online(false)` makes every call fail with a connectivity error;
/// `fail_updates(true)` makes `update` fail with an API error while reads
/// keep working.
pub struct MemoryCollaborator {
    tables: Mutex<HashMap<Table, Vec<Value>>>,
    actor: Mutex<Option<Actor>>,
    online: AtomicBool,
    fail_updates: AtomicBool,
}

/// On-disk shape of a fixture file.
#[derive(Debug, Default, Deserialize)]
struct Fixture {
    #[serde(default)]
    programs: Vec<Value>,
    #[serde(default)]
    testimonials: Vec<Value>,
    #[serde(default)]
    produced_content: Vec<Value>,
    #[serde(default)]
    profiles: Vec<Value>,
    actor: Option<Actor>,
}

impl Default for MemoryCollaborator {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCollaborator {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            actor: Mutex::new(None),
            online: AtomicBool::new(true),
            fail_updates: AtomicBool::new(false),
        }
    }

    /// Load tables and the signed-in actor from a JSON fixture.
    pub fn from_fixture(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let fixture: Fixture =
            serde_json::from_str(&raw).map_err(|e| StoreError::Decode(e.to_string()))?;
        let backend = Self::new()
            .with_rows(Table::Programs, fixture.programs)
            .with_rows(Table::Testimonials, fixture.testimonials)
            .with_rows(Table::ProducedContent, fixture.produced_content)
            .with_rows(Table::Profiles, fixture.profiles);
        backend.set_actor(fixture.actor);
        info!(path = %path.display(), "loaded fixture backend");
        Ok(backend)
    }

    pub fn with_rows(self, table: Table, rows: Vec<Value>) -> Self {
        for row in rows {
            self.insert(table, row);
        }
        self
    }

    /// Append a row, assigning a UUID `id` if it has none.
    pub fn insert(&self, table: Table, mut row: Value) {
        if let Some(obj) = row.as_object_mut() {
            obj.entry("id")
                .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
        }
        self.tables.lock().unwrap().entry(table).or_default().push(row);
    }

    pub fn set_actor(&self, actor: Option<Actor>) {
        *self.actor.lock().unwrap() = actor;
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of a table.
    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    fn check_online(&self) -> Result<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Connectivity("memory backend offline".to_string()))
        }
    }
}

#[async_trait]
impl Collaborator for MemoryCollaborator {
    fn name(&self) -> &str {
        "memory"
    }

    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>> {
        self.check_online()?;
        let mut rows: Vec<Value> = self
            .tables
            .lock()
            .unwrap()
            .get(&table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();
        query.sort(&mut rows);
        if let Some(n) = query.limit {
            rows.truncate(n);
        }
        debug!(%table, count = rows.len(), "select");
        Ok(rows)
    }

    async fn update(&self, table: Table, patch: Value, filters: &[Filter]) -> Result<Vec<Value>> {
        self.check_online()?;
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                status: 409,
                message: "update rejected".to_string(),
            });
        }
        let Some(fields) = patch.as_object() else {
            return Err(StoreError::Decode("patch must be a JSON object".to_string()));
        };

        let mut tables = self.tables.lock().unwrap();
        let mut updated = Vec::new();
        for row in tables.entry(table).or_default().iter_mut() {
            if !filters.iter().all(|f| f.matches(row)) {
                continue;
            }
            if let Some(obj) = row.as_object_mut() {
                for (k, v) in fields {
                    obj.insert(k.clone(), v.clone());
                }
            }
            updated.push(row.clone());
        }
        debug!(%table, count = updated.len(), "update");
        Ok(updated)
    }

    async fn current_actor(&self) -> Result<Option<Actor>> {
        self.check_online()?;
        Ok(self.actor.lock().unwrap().clone())
    }
}
