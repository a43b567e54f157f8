use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{authz, models, routes};

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::access::my_access,
		routes::records::list_records,
		routes::records::count_records,
		routes::records::export_records,
		routes::records::get_record,
		routes::records::bulk_delete,
		routes::records::bulk_priority,
		routes::view_mode::get_view_mode,
		routes::view_mode::set_view_mode
	),
	components(
		schemas(
			routes::health::HealthResponse,
			authz::Role,
			authz::ViewMode,
			authz::Collection,
			models::Priority,
			models::Person,
			models::Church,
			models::Task,
			models::Office,
			models::access::ScopedPage,
			models::access::ScopedCount,
			models::access::BulkDeleteRequest,
			models::access::BulkPriorityRequest,
			models::access::BulkReport,
			models::access::ToggleRequest,
			models::access::ViewModeStatus,
			models::access::CollectionAccess,
			models::access::AccessSummary
		)
	),
	modifiers(&SecurityAddon),
	tags(
		(name = "Health", description = "Liveness"),
		(name = "Access", description = "Resolved access for the caller"),
		(name = "Records", description = "Office-scoped record collections"),
		(name = "View mode", description = "Per-collection broad/scoped preference")
	)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
	fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
		let components = openapi.components.get_or_insert_with(Default::default);
		components.add_security_scheme(
			"bearerAuth",
			SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
		);
	}
}

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;
	ensure_servers(&mut doc, port);
	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.persist_authorization(true);

	let doc_json = Arc::new(serde_json::to_value(&doc)?);

	let json_route = {
		let doc_json = Arc::clone(&doc_json);
		get(move || {
			let doc_json = Arc::clone(&doc_json);
			async move { Json((*doc_json).clone()) }
		})
	};

	Ok(Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config)))
}

fn ensure_servers(doc: &mut Value, port: u16) {
	let server_url = format!("http://localhost:{}", port);

	match doc.get_mut("servers") {
		Some(Value::Array(arr)) => {
			let has = arr.iter().any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !has {
				arr.push(json!({ "url": server_url }));
			}
		}
		_ => {
			doc["servers"] = json!([{ "url": server_url }]);
		}
	}
}
