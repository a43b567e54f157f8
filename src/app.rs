use std::sync::Arc;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{AccessGate, ActorDirectory, DefaultScopeResolver, SqliteActorDirectory, SqliteViewModeStore, ViewModeState};
use crate::errors::AppError;
use crate::events::{init_event_bus, start_audit_listener, EventBus};
use crate::jwt::JwtConfig;
use crate::routes::{access, health, records, view_mode};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub actors: Arc<dyn ActorDirectory>,
    pub gate: AccessGate,
    pub event_bus: EventBus,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, event_bus: EventBus) -> Self {
        let actors = Arc::new(SqliteActorDirectory::new(pool.clone()));
        let view_modes = ViewModeState::new(Arc::new(SqliteViewModeStore::new(pool.clone())));
        let gate = AccessGate::new(view_modes, Arc::new(DefaultScopeResolver::new()));

        Self {
            pool,
            jwt: Arc::new(jwt),
            actors,
            gate,
            event_bus,
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;

    let (event_bus, rx) = init_event_bus();
    tokio::spawn(start_audit_listener(rx, pool.clone()));

    let state = AppState::new(pool, jwt_config, event_bus);
    Ok(router(state))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health::health))
        .route("/me/access", get(access::my_access))
        .nest("/records", records::routes())
        .nest("/view-mode", view_mode::routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
