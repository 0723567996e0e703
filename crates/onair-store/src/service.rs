use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use futures_util::future::{try_join, try_join_all};
use onair_agenda::read_state::ReadCache;
use onair_agenda::{
    apply_read, AgendaInput, AgendaResolver, Clock, NowParts, Program, RecurrenceResult,
    Resolution, ScheduledItem,
};
use onair_core::{ItemId, ItemKind};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::collaborator::{Actor, Collaborator};
use crate::error::{MarkReadError, Result, StoreError};
use crate::query::{Filter, Query, Table};
use crate::rows::{
    decode_rows, item_from_row, patch_to_json, program_from_row, COL_END_DATE, COL_ID,
    COL_RECURRING, COL_SCHEDULED_DATE, COL_SCHEDULED_TIME, COL_STATUS,
};

/// Binds a collaborator, a read cache and a clock to the resolver.
///
/// The backend cannot express "scheduled today OR recurring OR still in its
/// date range" in one request, so each item table is queried three times
/// and the batches are merged by the resolver.
pub struct AgendaService {
    backend: Arc<dyn Collaborator>,
    cache: Arc<dyn ReadCache>,
    clock: Arc<dyn Clock>,
    resolver: AgendaResolver,
}

impl AgendaService {
    pub fn new(
        backend: Arc<dyn Collaborator>,
        cache: Arc<dyn ReadCache>,
        clock: Arc<dyn Clock>,
        resolver: AgendaResolver,
    ) -> Self {
        Self {
            backend,
            cache,
            clock,
            resolver,
        }
    }

    pub fn backend(&self) -> &Arc<dyn Collaborator> {
        &self.backend
    }

    pub fn resolver(&self) -> &AgendaResolver {
        &self.resolver
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub async fn current_actor(&self) -> Result<Option<Actor>> {
        self.backend.current_actor().await
    }

    pub async fn fetch_programs(&self) -> Result<Vec<Program>> {
        let rows = self
            .backend
            .select(Table::Programs, &Query::new().order_asc("start_time"))
            .await?;
        Ok(decode_rows(Table::Programs.name(), rows, program_from_row))
    }

    /// Fetch programs and every candidate item for `today`.
    pub async fn fetch_snapshot(&self, today: NaiveDate) -> Result<AgendaInput> {
        let queries = item_queries(today);
        let items = try_join_all(
            queries
                .iter()
                .map(|(kind, query)| self.backend.select(Table::for_kind(*kind), query)),
        );
        let (programs, batches) = try_join(self.fetch_programs(), items).await?;

        let batches = queries
            .iter()
            .zip(batches)
            .map(|((kind, _), rows)| {
                decode_rows(kind.table(), rows, |row| item_from_row(*kind, row))
            })
            .collect::<Vec<Vec<ScheduledItem>>>();
        debug!(
            programs = programs.len(),
            rows = batches.iter().map(Vec::len).sum::<usize>(),
            "snapshot fetched"
        );
        Ok(AgendaInput { programs, batches })
    }

    /// Fetch and resolve the agenda at the clock's current instant.
    pub async fn resolve_now(&self) -> Result<Resolution> {
        let now = self.clock.now();
        let (input, actor) = try_join(self.fetch_snapshot(now.date()), self.current_actor()).await?;
        Ok(self.resolver.resolve(
            &input,
            now,
            actor.as_ref().map(|a| &a.id),
            self.cache.as_ref(),
        ))
    }

    /// Programs on air right now.
    pub async fn programs_on_air(&self) -> Result<Vec<Program>> {
        let at = NowParts::now(self.clock.as_ref());
        let programs = self.fetch_programs().await?;
        Ok(onair_agenda::programs_on_air(&programs, &at)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Mark an item read by the signed-in actor.
    ///
    /// The local cache is written only after the backend accepted the
    /// update; on any failure the item stays on the agenda.
    pub async fn mark_as_read(
        &self,
        kind: ItemKind,
        id: &ItemId,
    ) -> std::result::Result<RecurrenceResult, MarkReadError> {
        let Some(actor) = self.backend.current_actor().await? else {
            warn!(%kind, item_id = %id, "mark-as-read without a signed-in actor");
            return Err(MarkReadError::Unauthenticated);
        };

        let table = Table::for_kind(kind);
        let by_id = Filter::eq(COL_ID, id.as_str());
        let not_found = || StoreError::NotFound {
            table: table.name().to_string(),
            id: id.to_string(),
        };

        let query = Query {
            filters: vec![by_id.clone()],
            ..Query::new()
        };
        let row = self
            .backend
            .select(table, &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(not_found)?;
        let mut item = item_from_row(kind, row)?;

        let now = self.clock.now();
        let (patch, result) = apply_read(&mut item, &actor.id, now, self.resolver.policy());
        let updated = match self
            .backend
            .update(table, patch_to_json(&patch), &[by_id])
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(%kind, item_id = %id, error = %e, "failed to persist read state");
                return Err(MarkReadError::Persistence(e));
            }
        };
        if updated.is_empty() {
            warn!(%kind, item_id = %id, "update matched no rows");
            return Err(MarkReadError::Persistence(not_found()));
        }

        self.cache.insert(kind, now.date(), id);
        info!(%kind, item_id = %id, actor = %actor.id, ?result, "marked as read");
        Ok(result)
    }
}

/// The three overlapping queries per item table, in merge order.
fn item_queries(today: NaiveDate) -> Vec<(ItemKind, Query)> {
    let today = Value::from(today.format("%Y-%m-%d").to_string());
    let by_time = |q: Query| q.order_asc(COL_SCHEDULED_TIME);
    vec![
        (
            ItemKind::Testimonial,
            by_time(Query::new().eq(COL_STATUS, "pending")),
        ),
        (
            ItemKind::Testimonial,
            by_time(Query::new().eq(COL_RECURRING, true)),
        ),
        (
            ItemKind::Testimonial,
            by_time(Query::new().gte(COL_END_DATE, today.clone())),
        ),
        (
            ItemKind::Content,
            by_time(Query::new().eq(COL_SCHEDULED_DATE, today.clone())),
        ),
        (
            ItemKind::Content,
            by_time(Query::new().eq(COL_RECURRING, true)),
        ),
        (
            ItemKind::Content,
            by_time(Query::new().gte(COL_END_DATE, today)),
        ),
    ]
}
