use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use super::error::AccessError;
use super::role::Role;
use crate::errors::AppResult;

/// The authenticated identity making a request, as known to the user store.
///
/// Built once per request and never persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
    pub home_office_id: Option<Uuid>,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self {
            id,
            role,
            home_office_id: None,
        }
    }

    pub fn with_home_office(mut self, office_id: impl Into<Option<Uuid>>) -> Self {
        self.home_office_id = office_id.into();
        self
    }

    /// Derived, never stored. Only super admins are elevated, whatever their
    /// current view mode.
    pub fn is_elevated(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}

/// Resolves a verified identity into an [`Actor`].
///
/// Implementations must read the authoritative user store on every call; any
/// caching is the caller's business and limited to a single request.
#[async_trait]
pub trait ActorDirectory: Send + Sync {
    async fn resolve(&self, user_id: Uuid) -> AppResult<Actor>;
}

#[derive(Debug, Clone, FromRow)]
struct DbActor {
    id: Uuid,
    role: Option<String>,
    home_office_id: Option<Uuid>,
}

impl From<DbActor> for Actor {
    fn from(row: DbActor) -> Self {
        Actor {
            id: row.id,
            role: Role::from_stored(row.role.as_deref()),
            home_office_id: row.home_office_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqliteActorDirectory {
    pool: SqlitePool,
}

impl SqliteActorDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActorDirectory for SqliteActorDirectory {
    async fn resolve(&self, user_id: Uuid) -> AppResult<Actor> {
        let row = sqlx::query_as::<_, DbActor>(
            "SELECT id, role, home_office_id FROM users WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let actor = Actor::from(row);
                tracing::debug!(actor_id = %actor.id, role = %actor.role, "actor resolved");
                Ok(actor)
            }
            None => {
                tracing::warn!(actor_id = %user_id, "identity does not match a user record");
                Err(AccessError::UnknownActor { actor_id: user_id }.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_super_admin_is_elevated() {
        let id = Uuid::new_v4();
        assert!(Actor::new(id, Role::SuperAdmin).is_elevated());
        assert!(!Actor::new(id, Role::OfficeAdmin).is_elevated());
        assert!(!Actor::new(id, Role::StandardUser).is_elevated());
        assert!(!Actor::new(id, Role::LimitedUser).is_elevated());
    }

    #[test]
    fn db_row_with_bad_role_fails_closed() {
        let row = DbActor {
            id: Uuid::new_v4(),
            role: Some("root".to_string()),
            home_office_id: Some(Uuid::new_v4()),
        };
        let actor = Actor::from(row);
        assert_eq!(actor.role, Role::LimitedUser);
        assert!(!actor.is_elevated());
    }
}
