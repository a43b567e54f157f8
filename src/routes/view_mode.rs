use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};

use crate::app::AppState;
use crate::authz::{Actor, Collection, GateDecision};
use crate::errors::AppResult;
use crate::events::{emit, RequestContext};
use crate::models::access::{ToggleRequest, ViewModeStatus};
use crate::routes::records::{notice_strings, parse_collection};

pub fn routes() -> Router<AppState> {
    Router::new().route("/:collection", get(get_view_mode).put(set_view_mode))
}

pub(crate) async fn status(state: &AppState, actor: &Actor, collection: Collection, decision: &GateDecision) -> AppResult<ViewModeStatus> {
    let stored_mode = state.gate.view_modes().get(actor.id, collection).await?;

    Ok(ViewModeStatus {
        collection,
        stored_mode,
        mode: decision.resolution.mode,
        can_toggle: actor.role.can_toggle(),
        denied: decision.toggle.as_ref().is_some_and(|t| t.is_denied()),
        scope: decision.resolution.scope,
        notices: notice_strings(decision),
    })
}

#[utoipa::path(
    get,
    path = "/view-mode/{collection}",
    tag = "View mode",
    security(("bearerAuth" = [])),
    params(("collection" = String, Path, description = "people, churches or tasks")),
    responses(
        (status = 200, description = "Stored and effective view mode", body = ViewModeStatus),
        (status = 401, description = "Unknown or missing identity"),
        (status = 404, description = "Unknown collection")
    )
)]
pub async fn get_view_mode(
    State(state): State<AppState>,
    actor: Actor,
    Path(collection): Path<String>,
) -> AppResult<Json<ViewModeStatus>> {
    let collection = parse_collection(&collection)?;
    let decision = state.gate.decide(&actor, collection, None).await?;

    Ok(Json(status(&state, &actor, collection, &decision).await?))
}

/// Toggle the view mode for one collection. A role without the toggle
/// permission gets its current mode back with `denied` set.
#[utoipa::path(
    put,
    path = "/view-mode/{collection}",
    tag = "View mode",
    security(("bearerAuth" = [])),
    params(("collection" = String, Path, description = "people, churches or tasks")),
    request_body = ToggleRequest,
    responses(
        (status = 200, description = "Mode after the toggle attempt", body = ViewModeStatus),
        (status = 401, description = "Unknown or missing identity"),
        (status = 404, description = "Unknown collection")
    )
)]
pub async fn set_view_mode(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    Path(collection): Path<String>,
    Json(payload): Json<ToggleRequest>,
) -> AppResult<Json<ViewModeStatus>> {
    let collection = parse_collection(&collection)?;
    let decision = state.gate.decide(&actor, collection, Some(payload.mode)).await?;
    let status = status(&state, &actor, collection, &decision).await?;
    emit_toggle(&state, &actor, &headers, &status);

    Ok(Json(status))
}

/// Audit a toggle attempt, wherever it came from.
pub(crate) fn emit_toggle(state: &AppState, actor: &Actor, headers: &HeaderMap, status: &ViewModeStatus) {
    let action = if status.denied { "toggle_denied" } else { "toggled" };
    emit(
        &state.event_bus,
        action,
        Some(actor.id),
        status,
        Some(RequestContext::from_headers(headers)),
    );
}
