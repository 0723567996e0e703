use async_trait::async_trait;
use onair_core::ActorId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::query::{Filter, Query, Table};

/// The signed-in announcer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Narrow contract with the hosted database. Rows travel as raw JSON and
/// are mapped to domain types in [`crate::rows`].
#[async_trait]
pub trait Collaborator: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>>;

    /// Apply `patch` to every row matching `filters`; returns the updated rows.
    async fn update(&self, table: Table, patch: Value, filters: &[Filter]) -> Result<Vec<Value>>;

    /// `None` when nobody is signed in.
    async fn current_actor(&self) -> Result<Option<Actor>>;

    /// Cheap reachability check used by the connection monitor.
    /// Default: a one-row select on `programs`.
    async fn ping(&self) -> Result<()> {
        self.select(Table::Programs, &Query::new().limit(1))
            .await
            .map(|_| ())
    }
}
