use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::{Collection, Ownership, ScopedRecord};
use crate::models::Priority;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Person {
    pub id: Uuid,
    pub owner_office_id: Option<Uuid>,
    pub owner_id: Uuid,
    #[schema(example = "Ada")]
    pub first_name: String,
    #[schema(example = "Lovelace")]
    pub last_name: String,
    #[schema(example = "ada@example.com")]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScopedRecord for Person {
    const COLLECTION: Collection = Collection::People;
    const COLUMNS: &'static str =
        "id, owner_office_id, owner_id, first_name, last_name, email, phone, priority, created_at, updated_at";

    fn id(&self) -> Uuid {
        self.id
    }

    fn ownership(&self) -> Ownership {
        Ownership {
            owner_office_id: self.owner_office_id,
            owner_id: self.owner_id,
        }
    }

    fn redact(&mut self) {
        self.email = None;
        self.phone = None;
    }
}
