use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use utoipa::ToSchema;
use uuid::Uuid;

use super::collection::Collection;
use super::error::AccessError;
use super::resolver::Resolution;
use super::scope::{AccessScope, Ownership};
use crate::errors::AppResult;
use crate::models::Priority;

/// A soft-deletable record owned by an office and a user.
///
/// The backing table is named after [`ScopedRecord::COLLECTION`] and carries
/// `id`, `owner_office_id`, `owner_id`, `priority`, `created_at`,
/// `updated_at` and `deleted_at`.
pub trait ScopedRecord: for<'r> FromRow<'r, SqliteRow> + Serialize + Send + Unpin + 'static {
    const COLLECTION: Collection;
    const COLUMNS: &'static str;

    fn id(&self) -> Uuid;

    fn ownership(&self) -> Ownership;

    /// Strip fields a field-restricted role must not see.
    fn redact(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkMutation {
    SoftDelete,
    SetPriority(Priority),
}

impl BulkMutation {
    pub fn action(self) -> &'static str {
        match self {
            BulkMutation::SoftDelete => "bulk_deleted",
            BulkMutation::SetPriority(_) => "bulk_priority_updated",
        }
    }
}

/// Per-id result of a bulk mutation. Ids keep request order, duplicates dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct BulkOutcome {
    pub applied: Vec<Uuid>,
    /// Ids outside the scope, or not found at all.
    pub rejected: Vec<Uuid>,
}

impl BulkOutcome {
    pub fn is_partial(&self) -> bool {
        !self.applied.is_empty() && !self.rejected.is_empty()
    }

    pub fn violation(&self) -> Option<AccessError> {
        if self.rejected.is_empty() {
            None
        } else {
            Some(AccessError::ScopeViolation {
                rejected: self.rejected.clone(),
            })
        }
    }
}

/// The only code allowed to query scoped tables.
///
/// Every statement it issues carries the scope predicate, and mutations
/// check each target id against the scope inside the same transaction before
/// touching anything.
#[derive(Debug, Clone)]
pub struct ScopedQuery<'a> {
    pool: &'a SqlitePool,
    scope: AccessScope,
    field_restricted: bool,
}

impl<'a> ScopedQuery<'a> {
    pub fn new(pool: &'a SqlitePool, scope: AccessScope) -> Self {
        Self {
            pool,
            scope,
            field_restricted: false,
        }
    }

    pub fn for_resolution(pool: &'a SqlitePool, resolution: &Resolution) -> Self {
        Self {
            pool,
            scope: resolution.scope,
            field_restricted: resolution.field_restricted,
        }
    }

    pub fn scope(&self) -> AccessScope {
        self.scope
    }

    fn select<T: ScopedRecord>(&self, columns: &str) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {} FROM {} WHERE deleted_at IS NULL",
            columns,
            T::COLLECTION.key()
        ));
        self.scope.push_predicate(&mut qb);
        qb
    }

    fn finish<T: ScopedRecord>(&self, mut record: T) -> T {
        if self.field_restricted {
            record.redact();
        }
        record
    }

    pub async fn list<T: ScopedRecord>(&self) -> AppResult<Vec<T>> {
        let mut qb = self.select::<T>(T::COLUMNS);
        qb.push(" ORDER BY created_at DESC");

        let rows = qb.build_query_as::<T>().fetch_all(self.pool).await?;
        debug_assert!(rows.iter().all(|r| self.scope.permits(&r.ownership())));
        Ok(rows.into_iter().map(|r| self.finish(r)).collect())
    }

    pub async fn count<T: ScopedRecord>(&self) -> AppResult<i64> {
        let mut qb = self.select::<T>("COUNT(1)");
        Ok(qb.build_query_scalar::<i64>().fetch_one(self.pool).await?)
    }

    /// `None` both for missing records and for records outside the scope.
    pub async fn get<T: ScopedRecord>(&self, id: Uuid) -> AppResult<Option<T>> {
        let mut qb = self.select::<T>(T::COLUMNS);
        qb.push(" AND id = ").push_bind(id);

        let row = qb.build_query_as::<T>().fetch_optional(self.pool).await?;
        debug_assert!(row.as_ref().map_or(true, |r| r.id() == id && self.scope.permits(&r.ownership())));
        Ok(row.map(|r| self.finish(r)))
    }

    pub async fn bulk_delete<T: ScopedRecord>(&self, ids: &[Uuid]) -> AppResult<BulkOutcome> {
        self.bulk::<T>(ids, BulkMutation::SoftDelete).await
    }

    pub async fn bulk_set_priority<T: ScopedRecord>(&self, ids: &[Uuid], priority: Priority) -> AppResult<BulkOutcome> {
        self.bulk::<T>(ids, BulkMutation::SetPriority(priority)).await
    }

    pub async fn bulk<T: ScopedRecord>(&self, ids: &[Uuid], mutation: BulkMutation) -> AppResult<BulkOutcome> {
        let requested = dedupe(ids);
        if requested.is_empty() {
            return Ok(BulkOutcome::default());
        }

        let mut tx = self.pool.begin().await?;
        let mut outcome = BulkOutcome::default();
        let now = Utc::now();

        for chunk in requested.chunks(BULK_CHUNK_SIZE) {
            let part = self.partition::<T>(&mut tx, chunk).await?;

            if !part.applied.is_empty() {
                let mut qb = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", T::COLLECTION.key()));
                match mutation {
                    BulkMutation::SoftDelete => {
                        qb.push("deleted_at = ").push_bind(now);
                    }
                    BulkMutation::SetPriority(priority) => {
                        qb.push("priority = ").push_bind(priority);
                    }
                }
                qb.push(", updated_at = ").push_bind(now);
                qb.push(" WHERE deleted_at IS NULL");
                self.scope.push_predicate(&mut qb);
                push_id_list(&mut qb, &part.applied);

                qb.build().execute(&mut *tx).await?;
            }

            outcome.applied.extend(part.applied);
            outcome.rejected.extend(part.rejected);
        }

        tx.commit().await?;

        if !outcome.rejected.is_empty() {
            tracing::warn!(
                collection = %T::COLLECTION,
                scope = %self.scope,
                action = mutation.action(),
                applied = outcome.applied.len(),
                rejected = outcome.rejected.len(),
                "bulk mutation rejected out-of-scope records"
            );
        }

        Ok(outcome)
    }

    /// Split ids into those visible through the scope and the rest.
    async fn partition<T: ScopedRecord>(&self, conn: &mut SqliteConnection, ids: &[Uuid]) -> AppResult<BulkOutcome> {
        let mut qb = self.select::<T>("id");
        push_id_list(&mut qb, ids);

        let visible: HashSet<Uuid> = qb
            .build_query_scalar::<Uuid>()
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .collect();

        let (applied, rejected): (Vec<Uuid>, Vec<Uuid>) = ids.iter().copied().partition(|id| visible.contains(id));
        Ok(BulkOutcome { applied, rejected })
    }
}

/// Ids bound per statement, well under SQLite's bound-parameter limit.
const BULK_CHUNK_SIZE: usize = 500;

fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[Uuid]) {
    qb.push(" AND id IN (");
    let mut list = qb.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    list.push_unseparated(")");
}

fn dedupe(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
