#![allow(dead_code)]

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt; // for `oneshot`
use uuid::Uuid;

use office_scope::create_app;
use office_scope::jwt::JwtConfig;

pub const JWT_SECRET: &str = "test-secret";

pub async fn app(pool: &SqlitePool) -> Result<Router> {
    std::env::set_var("JWT_SECRET", JWT_SECRET);
    Ok(create_app(pool.clone()).await?)
}

pub fn token(user_id: Uuid) -> String {
    JwtConfig::new(JWT_SECRET, 1).encode(user_id).expect("token must encode")
}

pub async fn office(pool: &SqlitePool, name: &str) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO offices (id, name, created_at) VALUES (?, ?, ?)")
        .bind(id)
        .bind(name)
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(id)
}

pub async fn user(pool: &SqlitePool, name: &str, role: Option<&str>, office: Option<Uuid>) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO users (id, name, email, role, home_office_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(name)
    .bind(format!("{}-{}@example.com", name.to_lowercase(), id.simple()))
    .bind(role)
    .bind(office)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn person(pool: &SqlitePool, office: Option<Uuid>, owner: Uuid, first_name: &str) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO people (id, owner_office_id, owner_id, first_name, last_name, email, phone, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 'Tester', ?, '555-0100', ?, ?)",
    )
    .bind(id)
    .bind(office)
    .bind(owner)
    .bind(first_name)
    .bind(format!("{}@example.com", first_name.to_lowercase()))
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn church(pool: &SqlitePool, office: Option<Uuid>, owner: Uuid, name: &str) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO churches (id, owner_office_id, owner_id, name, city, phone, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 'Springfield', '555-0199', ?, ?)",
    )
    .bind(id)
    .bind(office)
    .bind(owner)
    .bind(name)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn task(pool: &SqlitePool, office: Option<Uuid>, owner: Uuid, title: &str) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO tasks (id, owner_office_id, owner_id, title, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(office)
    .bind(owner)
    .bind(title)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Vec<u8>)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let resp = app.clone().oneshot(req).await?;
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await?;
    Ok((status, bytes.to_vec()))
}

pub async fn get_json(app: &Router, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
    let (status, bytes) = send(app, "GET", uri, Some(token), None).await?;
    Ok((status, serde_json::from_slice(&bytes).unwrap_or(Value::Null)))
}

pub async fn send_json(app: &Router, method: &str, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
    let (status, bytes) = send(app, method, uri, Some(token), Some(body)).await?;
    Ok((status, serde_json::from_slice(&bytes).unwrap_or(Value::Null)))
}

/// Ids of the records in a list response, as strings.
pub fn record_ids(page: &Value) -> Vec<String> {
    page["records"]
        .as_array()
        .map(|records| {
            records
                .iter()
                .filter_map(|r| r["id"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
