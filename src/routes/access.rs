use axum::extract::State;
use axum::Json;

use crate::app::AppState;
use crate::authz::{Actor, Collection};
use crate::errors::AppResult;
use crate::models::access::{AccessSummary, CollectionAccess};
use crate::routes::records::notice_strings;

/// Who the caller is as far as access control is concerned, and what each
/// collection currently resolves to for them.
#[utoipa::path(
    get,
    path = "/me/access",
    tag = "Access",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Resolved access for the current actor", body = AccessSummary),
        (status = 401, description = "Unknown or missing identity")
    )
)]
pub async fn my_access(State(state): State<AppState>, actor: Actor) -> AppResult<Json<AccessSummary>> {
    let mut collections = Vec::with_capacity(Collection::ALL.len());
    for collection in Collection::ALL {
        let decision = state.gate.decide(&actor, collection, None).await?;
        let stored_mode = state.gate.view_modes().get(actor.id, collection).await?;
        collections.push(CollectionAccess {
            collection,
            stored_mode,
            mode: decision.resolution.mode,
            scope: decision.resolution.scope,
            notices: notice_strings(&decision),
        });
    }

    Ok(Json(AccessSummary {
        actor_id: actor.id,
        role: actor.role,
        rank: actor.role.rank(),
        is_elevated: actor.is_elevated(),
        home_office_id: actor.home_office_id,
        can_toggle: actor.role.can_toggle(),
        field_restricted: actor.role.is_field_restricted(),
        collections,
    }))
}
