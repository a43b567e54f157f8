use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::errors::AppResult;

/// Drains the bus into `access_audit`. Runs until every sender is dropped.
pub async fn start_audit_listener(mut rx: broadcast::Receiver<Value>, pool: SqlitePool) {
    tracing::info!("audit listener started");
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let Err(err) = record_event(&pool, &event).await {
                    tracing::error!(error = %err, "failed to write audit entry");
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "audit listener lagged, events dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
    tracing::info!("audit listener stopped");
}

/// Append one event to the chain. Callers must not write concurrently; the
/// listener is the only writer.
pub async fn record_event(pool: &SqlitePool, event: &Value) -> AppResult<()> {
    let name = event.get("name").and_then(Value::as_str).unwrap_or("unknown");
    let actor_id = parse_uuid(event.get("actor_id")).map(|id| id.to_string());
    let subject_id = parse_uuid(event.get("subject_id")).map(|id| id.to_string());
    let occurred_at = event
        .get("occurred_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let severity = event
        .get("payload")
        .and_then(|p| p.get("severity"))
        .and_then(Value::as_str)
        .unwrap_or("important");
    let id = parse_uuid(event.get("id")).unwrap_or_else(Uuid::new_v4).to_string();

    let payload = serde_json::to_string(event).unwrap_or_default();

    let mut tx = pool.begin().await?;

    let prev_hash: Option<String> = sqlx::query_scalar("SELECT hash FROM access_audit ORDER BY seq DESC LIMIT 1")
        .fetch_optional(&mut *tx)
        .await?;

    let hash = chain_hash(prev_hash.as_deref(), &payload);

    sqlx::query(
        r#"
        INSERT INTO access_audit (id, event_name, actor_id, subject_id, occurred_at, severity, payload, prev_hash, hash)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(name)
    .bind(&actor_id)
    .bind(&subject_id)
    .bind(occurred_at)
    .bind(severity)
    .bind(&payload)
    .bind(&prev_hash)
    .bind(&hash)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    pub entries: u64,
    /// `seq` of the first entry whose link or digest does not match.
    pub broken_at: Option<i64>,
}

impl ChainReport {
    pub fn is_intact(&self) -> bool {
        self.broken_at.is_none()
    }
}

#[derive(sqlx::FromRow)]
struct ChainRow {
    seq: i64,
    payload: String,
    prev_hash: Option<String>,
    hash: String,
}

/// Recompute every link of the audit chain in insertion order.
pub async fn verify_chain(pool: &SqlitePool) -> AppResult<ChainReport> {
    let rows: Vec<ChainRow> = sqlx::query_as("SELECT seq, payload, prev_hash, hash FROM access_audit ORDER BY seq")
        .fetch_all(pool)
        .await?;

    let mut previous: Option<String> = None;
    for (index, row) in rows.iter().enumerate() {
        let linked = row.prev_hash == previous;
        if !linked || chain_hash(row.prev_hash.as_deref(), &row.payload) != row.hash {
            tracing::warn!(seq = row.seq, "audit chain broken");
            return Ok(ChainReport {
                entries: index as u64,
                broken_at: Some(row.seq),
            });
        }
        previous = Some(row.hash.clone());
    }

    Ok(ChainReport {
        entries: rows.len() as u64,
        broken_at: None,
    })
}

fn chain_hash(prev_hash: Option<&str>, payload: &str) -> String {
    let mut hasher = Sha256::new();
    if let Some(prev) = prev_hash {
        hasher.update(prev.as_bytes());
    }
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

fn parse_uuid(value: Option<&Value>) -> Option<Uuid> {
    value.and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_hash_depends_on_predecessor() {
        let first = chain_hash(None, "{}");
        assert_eq!(first.len(), 64);
        assert_ne!(chain_hash(Some(&first), "{}"), first);
        assert_eq!(chain_hash(Some(&first), "{}"), chain_hash(Some(&first), "{}"));
    }
}
