use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use onair_core::ActorId;
use serde_json::Value;
use tracing::debug;

use crate::collaborator::Collaborator;
use crate::error::Result;
use crate::query::{Query, Table};
use crate::rows::COL_ID;

/// Maximum number of actor id → e-mail pairs kept in memory. When full,
/// the oldest half is dropped.
const CACHE_MAX: usize = 256;

/// Resolves actor ids (as stored in `read_by`) to display e-mails.
///
/// Every agenda refresh may ask about the same handful of announcers, so
/// answers are cached and only misses hit the `profiles` table.
pub struct UserDirectory {
    backend: Arc<dyn Collaborator>,
    cache: DashMap<ActorId, String>,
    order: Mutex<VecDeque<ActorId>>,
}

impl UserDirectory {
    pub fn new(backend: Arc<dyn Collaborator>) -> Self {
        Self {
            backend,
            cache: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
        }
    }

    /// E-mail for one actor, `None` if the profile does not exist.
    pub async fn email_for(&self, id: &ActorId) -> Result<Option<String>> {
        let mut found = self.emails_for(std::slice::from_ref(id)).await?;
        Ok(found.remove(id))
    }

    /// E-mails for several actors at once. Unknown ids are absent from the map.
    pub async fn emails_for(&self, ids: &[ActorId]) -> Result<HashMap<ActorId, String>> {
        let mut found = HashMap::new();
        let mut missing = Vec::new();
        for id in ids {
            match self.cache.get(id) {
                Some(email) => {
                    found.insert(id.clone(), email.value().clone());
                }
                None if !missing.contains(id) => missing.push(id.clone()),
                None => {}
            }
        }
        if missing.is_empty() {
            return Ok(found);
        }

        debug!(count = missing.len(), "profile lookup");
        let query = Query::new().within(
            COL_ID,
            missing.iter().map(|id| Value::from(id.as_str())).collect(),
        );
        for row in self.backend.select(Table::Profiles, &query).await? {
            let Some(id) = row.get(COL_ID).map(id_literal) else {
                continue;
            };
            let Some(email) = row.get("email").and_then(Value::as_str) else {
                continue;
            };
            let id = ActorId::from(id);
            self.remember(id.clone(), email.to_string());
            found.insert(id, email.to_string());
        }
        Ok(found)
    }

    pub fn remember(&self, id: ActorId, email: String) {
        if self.cache.insert(id.clone(), email).is_some() {
            return;
        }
        let mut order = self.order.lock().unwrap();
        if order.len() >= CACHE_MAX {
            let evict = CACHE_MAX / 2;
            for old in order.drain(..evict) {
                self.cache.remove(&old);
            }
            debug!(evicted = evict, "directory cache eviction");
        }
        order.push_back(id);
    }

    pub fn invalidate(&self, id: &ActorId) {
        if self.cache.remove(id).is_some() {
            self.order.lock().unwrap().retain(|k| k != id);
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

fn id_literal(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
