use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::authz::{AccessScope, BulkOutcome, Collection, Role, ViewMode};
use crate::events::{Loggable, Severity};
use crate::models::Priority;

/// Optional toggle carried by list-style requests.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ViewQuery {
    /// `broad` or `scoped`; persisted as the new preference when permitted.
    #[param(example = "broad")]
    pub view: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScopedPage {
    pub collection: Collection,
    pub mode: ViewMode,
    #[schema(value_type = Object)]
    pub scope: AccessScope,
    pub notices: Vec<String>,
    pub count: usize,
    #[schema(value_type = Vec<Object>)]
    pub records: Vec<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScopedCount {
    pub collection: Collection,
    pub mode: ViewMode,
    #[schema(value_type = Object)]
    pub scope: AccessScope,
    pub count: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkDeleteRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkPriorityRequest {
    pub ids: Vec<Uuid>,
    pub priority: Priority,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkReport {
    pub collection: Collection,
    #[schema(value_type = Object)]
    pub scope: AccessScope,
    pub applied: Vec<Uuid>,
    pub rejected: Vec<Uuid>,
    pub partial: bool,
}

impl BulkReport {
    pub fn new(collection: Collection, scope: AccessScope, outcome: BulkOutcome) -> Self {
        let partial = outcome.is_partial();
        Self {
            collection,
            scope,
            applied: outcome.applied,
            rejected: outcome.rejected,
            partial,
        }
    }
}

impl Loggable for BulkReport {
    fn entity_type() -> &'static str {
        "records"
    }

    fn severity_for_action(&self, action: &str) -> Severity {
        match action {
            "bulk_deleted" | "scope_violation" => Severity::Critical,
            _ => Severity::Important,
        }
    }
}

impl Loggable for ViewModeStatus {
    fn entity_type() -> &'static str {
        "view_mode"
    }

    fn severity_for_action(&self, action: &str) -> Severity {
        match action {
            "toggle_denied" => Severity::Important,
            _ => Severity::Noise,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ToggleRequest {
    pub mode: ViewMode,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ViewModeStatus {
    pub collection: Collection,
    /// Preference as stored.
    pub stored_mode: ViewMode,
    /// Mode applied after role clamping.
    pub mode: ViewMode,
    pub can_toggle: bool,
    pub denied: bool,
    #[schema(value_type = Object)]
    pub scope: AccessScope,
    pub notices: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CollectionAccess {
    pub collection: Collection,
    pub stored_mode: ViewMode,
    pub mode: ViewMode,
    #[schema(value_type = Object)]
    pub scope: AccessScope,
    pub notices: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccessSummary {
    pub actor_id: Uuid,
    pub role: Role,
    pub rank: u8,
    pub is_elevated: bool,
    pub home_office_id: Option<Uuid>,
    pub can_toggle: bool,
    pub field_restricted: bool,
    pub collections: Vec<CollectionAccess>,
}
