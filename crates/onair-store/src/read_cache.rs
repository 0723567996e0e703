use std::path::Path;
use std::sync::Mutex;

use chrono::{Local, NaiveDate};
use onair_agenda::read_state::{day_key, ReadCache};
use onair_core::{ItemId, ItemKind};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::error::Result;

/// Create the read-cache schema in `conn`. Idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS read_cache (
            namespace   TEXT NOT NULL,   -- 'testimonials' | 'produced_content'
            day_key     TEXT NOT NULL,   -- read:YYYY-MM-DD
            item_id     TEXT NOT NULL,
            marked_at   TEXT NOT NULL,
            PRIMARY KEY (namespace, day_key, item_id)
        ) STRICT;
        ",
    )?;
    Ok(())
}

/// [`ReadCache`] that survives restarts, so a dismissal made before a crash
/// stays dismissed for the rest of the day.
///
/// The trait is infallible; SQLite errors are logged and treated as a miss.
pub struct SqliteReadCache {
    conn: Mutex<Connection>,
}

impl SqliteReadCache {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        Self::new(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Delete entries for days before `today`. Returns the number removed.
    pub fn prune_before(&self, today: NaiveDate) -> Result<usize> {
        let removed = self.conn.lock().unwrap().execute(
            "DELETE FROM read_cache WHERE day_key < ?1",
            params![day_key(today)],
        )?;
        if removed > 0 {
            debug!(removed, "pruned stale read-cache days");
        }
        Ok(removed)
    }

    fn lookup(&self, kind: ItemKind, day: NaiveDate, id: &ItemId) -> Result<bool> {
        let hit = self
            .conn
            .lock()
            .unwrap()
            .query_row(
                "SELECT 1 FROM read_cache WHERE namespace = ?1 AND day_key = ?2 AND item_id = ?3",
                params![kind.cache_namespace(), day_key(day), id.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(hit.is_some())
    }

    fn store(&self, kind: ItemKind, day: NaiveDate, id: &ItemId) -> Result<()> {
        self.conn.lock().unwrap().execute(
            "INSERT OR IGNORE INTO read_cache (namespace, day_key, item_id, marked_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                kind.cache_namespace(),
                day_key(day),
                id.as_str(),
                Local::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }
}

impl ReadCache for SqliteReadCache {
    fn contains(&self, kind: ItemKind, day: NaiveDate, id: &ItemId) -> bool {
        self.lookup(kind, day, id).unwrap_or_else(|e| {
            warn!(%kind, item_id = %id, error = %e, "read-cache lookup failed");
            false
        })
    }

    fn insert(&self, kind: ItemKind, day: NaiveDate, id: &ItemId) {
        if let Err(e) = self.store(kind, day, id) {
            warn!(%kind, item_id = %id, error = %e, "read-cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn insert_is_idempotent_and_namespaced() {
        let cache = SqliteReadCache::in_memory().unwrap();
        let id = ItemId::from("42");
        cache.insert(ItemKind::Testimonial, day(15), &id);
        cache.insert(ItemKind::Testimonial, day(15), &id);
        assert!(cache.contains(ItemKind::Testimonial, day(15), &id));
        assert!(!cache.contains(ItemKind::Content, day(15), &id));
        assert!(!cache.contains(ItemKind::Testimonial, day(16), &id));
    }

    #[test]
    fn rows_are_stored_under_the_kind_namespace() {
        let cache = SqliteReadCache::in_memory().unwrap();
        cache.insert(ItemKind::Content, day(15), &ItemId::from("7"));
        let namespace: String = cache
            .conn
            .lock()
            .unwrap()
            .query_row("SELECT namespace FROM read_cache", [], |row| row.get(0))
            .unwrap();
        assert_eq!(namespace, "produced_content");
    }

    #[test]
    fn prune_drops_earlier_days() {
        let cache = SqliteReadCache::in_memory().unwrap();
        let id = ItemId::from("1");
        cache.insert(ItemKind::Content, day(13), &id);
        cache.insert(ItemKind::Content, day(14), &id);
        cache.insert(ItemKind::Content, day(15), &id);
        assert_eq!(cache.prune_before(day(15)).unwrap(), 2);
        assert!(cache.contains(ItemKind::Content, day(15), &id));
        assert!(!cache.contains(ItemKind::Content, day(14), &id));
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("read_cache.db");
        let id = ItemId::from("7");
        {
            let cache = SqliteReadCache::open(&path).unwrap();
            cache.insert(ItemKind::Testimonial, day(15), &id);
        }
        let cache = SqliteReadCache::open(&path).unwrap();
        assert!(cache.contains(ItemKind::Testimonial, day(15), &id));
    }
}
