use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Actor, BulkMutation, BulkOutcome, Collection, GateDecision, ScopedQuery, ScopedRecord, ViewMode};
use crate::errors::{AppError, AppResult};
use crate::events::{emit, RequestContext};
use crate::models::access::{BulkDeleteRequest, BulkPriorityRequest, BulkReport, ScopedCount, ScopedPage, ViewQuery};
use crate::models::{Church, Person, Task};
use crate::routes::view_mode;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:collection", get(list_records))
        .route("/:collection/count", get(count_records))
        .route("/:collection/export", get(export_records))
        .route("/:collection/bulk-delete", post(bulk_delete))
        .route("/:collection/bulk-priority", post(bulk_priority))
        .route("/:collection/:id", get(get_record))
}

pub(crate) fn parse_collection(raw: &str) -> AppResult<Collection> {
    raw.parse::<Collection>().map_err(|err| AppError::not_found(err.to_string()))
}

pub(crate) fn parse_view(query: &ViewQuery) -> AppResult<Option<ViewMode>> {
    query
        .view
        .as_deref()
        .map(|raw| raw.parse::<ViewMode>().map_err(|err| AppError::bad_request(err.to_string())))
        .transpose()
}

pub(crate) fn notice_strings(decision: &GateDecision) -> Vec<String> {
    decision.resolution.notices.iter().map(ToString::to_string).collect()
}

async fn list_values<T: ScopedRecord>(query: &ScopedQuery<'_>) -> AppResult<Vec<Value>> {
    let rows = query.list::<T>().await?;
    rows.iter()
        .map(|row| serde_json::to_value(row).map_err(|err| AppError::internal(err.to_string())))
        .collect()
}

async fn get_value<T: ScopedRecord>(query: &ScopedQuery<'_>, id: Uuid) -> AppResult<Option<Value>> {
    match query.get::<T>(id).await? {
        Some(row) => Ok(Some(serde_json::to_value(&row).map_err(|err| AppError::internal(err.to_string()))?)),
        None => Ok(None),
    }
}

async fn export_csv<T: ScopedRecord>(query: &ScopedQuery<'_>) -> AppResult<Vec<u8>> {
    let rows = query.list::<T>().await?;
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in &rows {
        writer.serialize(row).map_err(|err| AppError::internal(err.to_string()))?;
    }
    writer.into_inner().map_err(|err| AppError::internal(err.to_string()))
}

async fn apply_bulk(query: &ScopedQuery<'_>, collection: Collection, ids: &[Uuid], mutation: BulkMutation) -> AppResult<BulkOutcome> {
    match collection {
        Collection::People => query.bulk::<Person>(ids, mutation).await,
        Collection::Churches => query.bulk::<Church>(ids, mutation).await,
        Collection::Tasks => query.bulk::<Task>(ids, mutation).await,
    }
}

#[utoipa::path(
    get,
    path = "/records/{collection}",
    tag = "Records",
    security(("bearerAuth" = [])),
    params(
        ("collection" = String, Path, description = "people, churches or tasks"),
        ViewQuery
    ),
    responses(
        (status = 200, description = "Records visible to the actor", body = ScopedPage),
        (status = 400, description = "Invalid view mode"),
        (status = 401, description = "Unknown or missing identity"),
        (status = 404, description = "Unknown collection")
    )
)]
pub async fn list_records(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    Path(collection): Path<String>,
    Query(view): Query<ViewQuery>,
) -> AppResult<Json<ScopedPage>> {
    let collection = parse_collection(&collection)?;
    let decision = state.gate.decide(&actor, collection, parse_view(&view)?).await?;
    if decision.toggle.is_some() {
        let status = view_mode::status(&state, &actor, collection, &decision).await?;
        view_mode::emit_toggle(&state, &actor, &headers, &status);
    }
    let query = ScopedQuery::for_resolution(&state.pool, &decision.resolution);

    let records = match collection {
        Collection::People => list_values::<Person>(&query).await?,
        Collection::Churches => list_values::<Church>(&query).await?,
        Collection::Tasks => list_values::<Task>(&query).await?,
    };

    Ok(Json(ScopedPage {
        collection,
        mode: decision.resolution.mode,
        scope: decision.resolution.scope,
        notices: notice_strings(&decision),
        count: records.len(),
        records,
    }))
}

#[utoipa::path(
    get,
    path = "/records/{collection}/count",
    tag = "Records",
    security(("bearerAuth" = [])),
    params(("collection" = String, Path, description = "people, churches or tasks")),
    responses(
        (status = 200, description = "Number of visible records", body = ScopedCount),
        (status = 401, description = "Unknown or missing identity"),
        (status = 404, description = "Unknown collection")
    )
)]
pub async fn count_records(
    State(state): State<AppState>,
    actor: Actor,
    Path(collection): Path<String>,
) -> AppResult<Json<ScopedCount>> {
    let collection = parse_collection(&collection)?;
    let decision = state.gate.decide(&actor, collection, None).await?;
    let query = ScopedQuery::for_resolution(&state.pool, &decision.resolution);

    let count = match collection {
        Collection::People => query.count::<Person>().await?,
        Collection::Churches => query.count::<Church>().await?,
        Collection::Tasks => query.count::<Task>().await?,
    };

    Ok(Json(ScopedCount {
        collection,
        mode: decision.resolution.mode,
        scope: decision.resolution.scope,
        count,
    }))
}

#[utoipa::path(
    get,
    path = "/records/{collection}/export",
    tag = "Records",
    security(("bearerAuth" = [])),
    params(("collection" = String, Path, description = "people, churches or tasks")),
    responses(
        (status = 200, description = "CSV of visible records", content_type = "text/csv", body = String),
        (status = 401, description = "Unknown or missing identity"),
        (status = 404, description = "Unknown collection")
    )
)]
pub async fn export_records(
    State(state): State<AppState>,
    actor: Actor,
    Path(collection): Path<String>,
) -> AppResult<Response> {
    let collection = parse_collection(&collection)?;
    let decision = state.gate.decide(&actor, collection, None).await?;
    let query = ScopedQuery::for_resolution(&state.pool, &decision.resolution);

    let body = match collection {
        Collection::People => export_csv::<Person>(&query).await?,
        Collection::Churches => export_csv::<Church>(&query).await?,
        Collection::Tasks => export_csv::<Task>(&query).await?,
    };

    tracing::info!(actor_id = %actor.id, %collection, scope = %query.scope(), bytes = body.len(), "records exported");

    let disposition = format!("attachment; filename=\"{}.csv\"", collection.key());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/records/{collection}/{id}",
    tag = "Records",
    security(("bearerAuth" = [])),
    params(
        ("collection" = String, Path, description = "people, churches or tasks"),
        ("id" = Uuid, Path, description = "Record id")
    ),
    responses(
        (status = 200, description = "Record detail"),
        (status = 401, description = "Unknown or missing identity"),
        (status = 404, description = "Unknown collection, or record missing or outside the actor's scope")
    )
)]
pub async fn get_record(
    State(state): State<AppState>,
    actor: Actor,
    Path((collection, id)): Path<(String, Uuid)>,
) -> AppResult<Json<Value>> {
    let collection = parse_collection(&collection)?;
    let decision = state.gate.decide(&actor, collection, None).await?;
    let query = ScopedQuery::for_resolution(&state.pool, &decision.resolution);

    let record = match collection {
        Collection::People => get_value::<Person>(&query, id).await?,
        Collection::Churches => get_value::<Church>(&query, id).await?,
        Collection::Tasks => get_value::<Task>(&query, id).await?,
    };

    record
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("{} record {} not found", collection, id)))
}

#[utoipa::path(
    post,
    path = "/records/{collection}/bulk-delete",
    tag = "Records",
    security(("bearerAuth" = [])),
    params(("collection" = String, Path, description = "people, churches or tasks")),
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, description = "Per-id outcome; out-of-scope ids are listed as rejected", body = BulkReport),
        (status = 401, description = "Unknown or missing identity"),
        (status = 404, description = "Unknown collection")
    )
)]
pub async fn bulk_delete(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    Path(collection): Path<String>,
    Json(payload): Json<BulkDeleteRequest>,
) -> AppResult<Json<BulkReport>> {
    let collection = parse_collection(&collection)?;
    run_bulk(&state, &actor, &headers, collection, &payload.ids, BulkMutation::SoftDelete).await
}

#[utoipa::path(
    post,
    path = "/records/{collection}/bulk-priority",
    tag = "Records",
    security(("bearerAuth" = [])),
    params(("collection" = String, Path, description = "people, churches or tasks")),
    request_body = BulkPriorityRequest,
    responses(
        (status = 200, description = "Per-id outcome; out-of-scope ids are listed as rejected", body = BulkReport),
        (status = 401, description = "Unknown or missing identity"),
        (status = 404, description = "Unknown collection")
    )
)]
pub async fn bulk_priority(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    Path(collection): Path<String>,
    Json(payload): Json<BulkPriorityRequest>,
) -> AppResult<Json<BulkReport>> {
    let collection = parse_collection(&collection)?;
    let mutation = BulkMutation::SetPriority(payload.priority);
    run_bulk(&state, &actor, &headers, collection, &payload.ids, mutation).await
}

async fn run_bulk(
    state: &AppState,
    actor: &Actor,
    headers: &HeaderMap,
    collection: Collection,
    ids: &[Uuid],
    mutation: BulkMutation,
) -> AppResult<Json<BulkReport>> {
    let decision = state.gate.decide(actor, collection, None).await?;
    let query = ScopedQuery::for_resolution(&state.pool, &decision.resolution);

    let outcome = apply_bulk(&query, collection, ids, mutation).await?;
    let report = BulkReport::new(collection, query.scope(), outcome);

    let context = RequestContext::from_headers(headers);
    if !report.applied.is_empty() {
        emit(&state.event_bus, mutation.action(), Some(actor.id), &report, Some(context.clone()));
    }
    if !report.rejected.is_empty() {
        emit(&state.event_bus, "scope_violation", Some(actor.id), &report, Some(context));
    }

    Ok(Json(report))
}
