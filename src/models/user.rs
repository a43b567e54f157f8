use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::authz::{Actor, Role};

/// Row of the authoritative user store. `role` is kept as stored so that
/// bad values stay visible to administrators; [`User::actor`] applies the
/// fail-closed parse.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Option<String>,
    pub home_office_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn actor(&self) -> Actor {
        Actor::new(self.id, Role::from_stored(self.role.as_deref())).with_home_office(self.home_office_id)
    }
}
