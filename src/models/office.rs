use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Office {
    pub id: Uuid,
    #[schema(example = "Nairobi")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}
