use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::{Collection, Ownership, ScopedRecord};
use crate::models::Priority;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Task {
    pub id: Uuid,
    pub owner_office_id: Option<Uuid>,
    pub owner_id: Uuid,
    #[schema(example = "Follow up with new visitors")]
    pub title: String,
    #[schema(format = DateTime, example = "2025-10-10T10:00:00Z")]
    pub due_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScopedRecord for Task {
    const COLLECTION: Collection = Collection::Tasks;
    const COLUMNS: &'static str =
        "id, owner_office_id, owner_id, title, due_date, completed, priority, created_at, updated_at";

    fn id(&self) -> Uuid {
        self.id
    }

    fn ownership(&self) -> Ownership {
        Ownership {
            owner_office_id: self.owner_office_id,
            owner_id: self.owner_id,
        }
    }
}
