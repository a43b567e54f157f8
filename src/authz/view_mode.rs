use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;

use super::actor::Actor;
use super::collection::Collection;
use super::error::AccessError;
use crate::errors::AppResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Scoped,
    Broad,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Scoped => "scoped",
            ViewMode::Broad => "broad",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown view mode: {0}")]
pub struct UnknownViewMode(pub String);

impl FromStr for ViewMode {
    type Err = UnknownViewMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scoped" => Ok(ViewMode::Scoped),
            "broad" => Ok(ViewMode::Broad),
            _ => Err(UnknownViewMode(s.to_string())),
        }
    }
}

/// Durable storage for per-(actor, collection) view modes.
#[async_trait]
pub trait ViewModeStore: Send + Sync {
    async fn load(&self, actor_id: Uuid, collection: Collection) -> AppResult<Option<ViewMode>>;
    /// Last writer wins.
    async fn save(&self, actor_id: Uuid, collection: Collection, mode: ViewMode) -> AppResult<()>;
}

#[derive(Debug, Clone)]
pub struct SqliteViewModeStore {
    pool: SqlitePool,
}

impl SqliteViewModeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ViewModeStore for SqliteViewModeStore {
    async fn load(&self, actor_id: Uuid, collection: Collection) -> AppResult<Option<ViewMode>> {
        let stored: Option<String> = sqlx::query_scalar(
            "SELECT mode FROM view_mode_preferences WHERE actor_id = ? AND collection = ?",
        )
        .bind(actor_id)
        .bind(collection.key())
        .fetch_optional(&self.pool)
        .await?;

        Ok(stored.map(|raw| {
            raw.parse().unwrap_or_else(|_| {
                tracing::warn!(actor_id = %actor_id, collection = %collection, mode = %raw, "unreadable stored view mode, using scoped");
                ViewMode::Scoped
            })
        }))
    }

    async fn save(&self, actor_id: Uuid, collection: Collection, mode: ViewMode) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO view_mode_preferences (actor_id, collection, mode, updated_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(actor_id, collection) DO UPDATE SET mode = excluded.mode, updated_at = excluded.updated_at",
        )
        .bind(actor_id)
        .bind(collection.key())
        .bind(mode.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Process-local store, handy for tests and the CLI's dry runs.
#[derive(Debug, Default)]
pub struct MemoryViewModeStore {
    modes: RwLock<HashMap<(Uuid, Collection), ViewMode>>,
}

impl MemoryViewModeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ViewModeStore for MemoryViewModeStore {
    async fn load(&self, actor_id: Uuid, collection: Collection) -> AppResult<Option<ViewMode>> {
        Ok(self.modes.read().await.get(&(actor_id, collection)).copied())
    }

    async fn save(&self, actor_id: Uuid, collection: Collection, mode: ViewMode) -> AppResult<()> {
        self.modes.write().await.insert((actor_id, collection), mode);
        Ok(())
    }
}

/// Result of a toggle request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Applied { mode: ViewMode },
    /// The role may not toggle; `mode` is the unchanged stored mode.
    Denied { mode: ViewMode, reason: AccessError },
}

impl ToggleOutcome {
    pub fn mode(&self) -> ViewMode {
        match self {
            ToggleOutcome::Applied { mode } | ToggleOutcome::Denied { mode, .. } => *mode,
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, ToggleOutcome::Denied { .. })
    }
}

/// Toggle-gated access to the view mode store.
#[derive(Clone)]
pub struct ViewModeState {
    store: Arc<dyn ViewModeStore>,
}

impl ViewModeState {
    pub fn new(store: Arc<dyn ViewModeStore>) -> Self {
        Self { store }
    }

    /// Stored mode, `Scoped` when nothing was ever stored. This is the raw
    /// preference; the resolver still clamps it by role.
    pub async fn get(&self, actor_id: Uuid, collection: Collection) -> AppResult<ViewMode> {
        Ok(self.store.load(actor_id, collection).await?.unwrap_or_default())
    }

    pub async fn set(&self, actor: &Actor, collection: Collection, requested: ViewMode) -> AppResult<ToggleOutcome> {
        if !actor.role.can_toggle() {
            let current = self.get(actor.id, collection).await?;
            tracing::warn!(
                actor_id = %actor.id,
                role = %actor.role,
                collection = %collection,
                requested = %requested,
                "view mode toggle denied"
            );
            return Ok(ToggleOutcome::Denied {
                mode: current,
                reason: AccessError::ToggleDenied { role: actor.role },
            });
        }

        self.store.save(actor.id, collection, requested).await?;
        tracing::info!(
            actor_id = %actor.id,
            collection = %collection,
            mode = %requested,
            "view mode toggled"
        );
        Ok(ToggleOutcome::Applied { mode: requested })
    }
}
