mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use common::{app, church, get_json, office, person, record_ids, send, send_json, task, token, user};

struct Offices {
    home: Uuid,
    other: Uuid,
}

async fn offices(pool: &SqlitePool) -> Result<Offices> {
    Ok(Offices {
        home: office(pool, "Home").await?,
        other: office(pool, "Other").await?,
    })
}

#[sqlx::test]
async fn office_admin_scoped_sees_own_and_broad_sees_office(pool: SqlitePool) -> Result<()> {
    let app = app(&pool).await?;
    let o = offices(&pool).await?;
    let admin = user(&pool, "Admin", Some("office_admin"), Some(o.home)).await?;
    let colleague = user(&pool, "Colleague", Some("standard_user"), Some(o.home)).await?;
    let outsider = user(&pool, "Outsider", Some("standard_user"), Some(o.other)).await?;

    let mine = person(&pool, Some(o.home), admin, "Mine").await?;
    let theirs = person(&pool, Some(o.home), colleague, "Theirs").await?;
    let foreign = person(&pool, Some(o.other), outsider, "Foreign").await?;
    let token = token(admin);

    let (status, page) = get_json(&app, "/records/people", &token).await?;
    assert_eq!(status, StatusCode::OK, "{}", page);
    assert_eq!(page["mode"], "scoped");
    assert_eq!(page["scope"], json!({ "kind": "owned_by", "id": admin.to_string() }));
    assert_eq!(record_ids(&page), vec![mine.to_string()]);

    let (status, page) = get_json(&app, "/records/people?view=broad", &token).await?;
    assert_eq!(status, StatusCode::OK, "{}", page);
    assert_eq!(page["mode"], "broad");
    assert_eq!(page["scope"], json!({ "kind": "office", "id": o.home.to_string() }));
    let ids = record_ids(&page);
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&mine.to_string()));
    assert!(ids.contains(&theirs.to_string()));
    assert!(!ids.contains(&foreign.to_string()));

    // The toggle sticks for later requests without `?view=`.
    let (_, page) = get_json(&app, "/records/people", &token).await?;
    assert_eq!(page["mode"], "broad");
    assert_eq!(page["count"], 2);

    Ok(())
}

#[sqlx::test]
async fn super_admin_without_office_sees_everything(pool: SqlitePool) -> Result<()> {
    let app = app(&pool).await?;
    let o = offices(&pool).await?;
    let root = user(&pool, "Root", Some("super_admin"), None).await?;
    let a = user(&pool, "Alice", Some("standard_user"), Some(o.home)).await?;
    let b = user(&pool, "Bob", Some("standard_user"), Some(o.other)).await?;
    person(&pool, Some(o.home), a, "One").await?;
    person(&pool, Some(o.other), b, "Two").await?;
    person(&pool, None, b, "Three").await?;

    let (status, page) = get_json(&app, "/records/people?view=broad", &token(root)).await?;
    assert_eq!(status, StatusCode::OK, "{}", page);
    assert_eq!(page["scope"], json!({ "kind": "all" }));
    assert_eq!(page["count"], 3);

    Ok(())
}

#[sqlx::test]
async fn super_admin_with_office_is_office_scoped_until_broad(pool: SqlitePool) -> Result<()> {
    let app = app(&pool).await?;
    let o = offices(&pool).await?;
    let root = user(&pool, "Root", Some("super_admin"), Some(o.home)).await?;
    let b = user(&pool, "Bob", Some("standard_user"), Some(o.other)).await?;
    task(&pool, Some(o.home), root, "Home task").await?;
    task(&pool, Some(o.other), b, "Other task").await?;
    let token = token(root);

    let (_, page) = get_json(&app, "/records/tasks", &token).await?;
    assert_eq!(page["scope"], json!({ "kind": "office", "id": o.home.to_string() }));
    assert_eq!(page["count"], 1);

    let (_, page) = get_json(&app, "/records/tasks?view=broad", &token).await?;
    assert_eq!(page["scope"], json!({ "kind": "all" }));
    assert_eq!(page["count"], 2);

    Ok(())
}

#[sqlx::test]
async fn standard_user_broad_request_is_clamped(pool: SqlitePool) -> Result<()> {
    let app = app(&pool).await?;
    let o = offices(&pool).await?;
    let member = user(&pool, "Member", Some("standard_user"), Some(o.home)).await?;
    let colleague = user(&pool, "Colleague", Some("standard_user"), Some(o.home)).await?;
    let mine = church(&pool, Some(o.home), member, "Mine").await?;
    church(&pool, Some(o.home), colleague, "Theirs").await?;

    let (status, page) = get_json(&app, "/records/churches?view=broad", &token(member)).await?;
    assert_eq!(status, StatusCode::OK, "{}", page);
    assert_eq!(page["mode"], "scoped");
    assert_eq!(page["scope"], json!({ "kind": "owned_by", "id": member.to_string() }));
    assert_eq!(record_ids(&page), vec![mine.to_string()]);
    assert!(!page["notices"].as_array().map(Vec::is_empty).unwrap_or(true));

    Ok(())
}

#[sqlx::test]
async fn bulk_delete_reports_partial_success(pool: SqlitePool) -> Result<()> {
    let app = app(&pool).await?;
    let o = offices(&pool).await?;
    let admin = user(&pool, "Admin", Some("office_admin"), Some(o.home)).await?;
    let colleague = user(&pool, "Colleague", Some("standard_user"), Some(o.home)).await?;
    let outsider = user(&pool, "Outsider", Some("standard_user"), Some(o.other)).await?;

    let first = person(&pool, Some(o.home), admin, "First").await?;
    let second = person(&pool, Some(o.other), outsider, "Second").await?;
    let third = person(&pool, Some(o.home), colleague, "Third").await?;
    let token = token(admin);

    let (status, _) = send_json(&app, "PUT", "/view-mode/people", &token, json!({ "mode": "broad" })).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, report) = send_json(
        &app,
        "POST",
        "/records/people/bulk-delete",
        &token,
        json!({ "ids": [first, second, third] }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "{}", report);
    assert_eq!(report["applied"], json!([first.to_string(), third.to_string()]));
    assert_eq!(report["rejected"], json!([second.to_string()]));
    assert_eq!(report["partial"], true);

    let live: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM people WHERE deleted_at IS NULL")
        .fetch_all(&pool)
        .await?;
    assert_eq!(live, vec![second]);

    Ok(())
}

#[sqlx::test]
async fn scoped_bulk_delete_rejects_colleague_records(pool: SqlitePool) -> Result<()> {
    let app = app(&pool).await?;
    let o = offices(&pool).await?;
    let admin = user(&pool, "Admin", Some("office_admin"), Some(o.home)).await?;
    let colleague = user(&pool, "Colleague", Some("standard_user"), Some(o.home)).await?;
    let theirs = person(&pool, Some(o.home), colleague, "Theirs").await?;
    let missing = Uuid::new_v4();

    let (status, report) = send_json(
        &app,
        "POST",
        "/records/people/bulk-delete",
        &token(admin),
        json!({ "ids": [theirs, missing] }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "{}", report);
    assert_eq!(report["applied"], json!([]));
    assert_eq!(report["rejected"], json!([theirs.to_string(), missing.to_string()]));
    assert_eq!(report["partial"], false);

    let deleted: Option<String> = sqlx::query_scalar("SELECT deleted_at FROM people WHERE id = ?")
        .bind(theirs)
        .fetch_one(&pool)
        .await?;
    assert!(deleted.is_none());

    Ok(())
}

#[sqlx::test]
async fn bulk_priority_updates_only_in_scope_records(pool: SqlitePool) -> Result<()> {
    let app = app(&pool).await?;
    let o = offices(&pool).await?;
    let member = user(&pool, "Member", Some("standard_user"), Some(o.home)).await?;
    let colleague = user(&pool, "Colleague", Some("standard_user"), Some(o.home)).await?;
    let mine = task(&pool, Some(o.home), member, "Mine").await?;
    let theirs = task(&pool, Some(o.home), colleague, "Theirs").await?;

    let (status, report) = send_json(
        &app,
        "POST",
        "/records/tasks/bulk-priority",
        &token(member),
        json!({ "ids": [mine, theirs], "priority": "urgent" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "{}", report);
    assert_eq!(report["applied"], json!([mine.to_string()]));
    assert_eq!(report["rejected"], json!([theirs.to_string()]));

    let priority_of = |id: Uuid| {
        let pool = pool.clone();
        async move {
            sqlx::query_scalar::<_, String>("SELECT priority FROM tasks WHERE id = ?")
                .bind(id)
                .fetch_one(&pool)
                .await
        }
    };
    assert_eq!(priority_of(mine).await?, "urgent");
    assert_eq!(priority_of(theirs).await?, "medium");

    Ok(())
}

#[sqlx::test]
async fn detail_outside_scope_is_not_found(pool: SqlitePool) -> Result<()> {
    let app = app(&pool).await?;
    let o = offices(&pool).await?;
    let member = user(&pool, "Member", Some("standard_user"), Some(o.home)).await?;
    let colleague = user(&pool, "Colleague", Some("standard_user"), Some(o.home)).await?;
    let mine = person(&pool, Some(o.home), member, "Mine").await?;
    let theirs = person(&pool, Some(o.home), colleague, "Theirs").await?;
    let token = token(member);

    let (status, record) = get_json(&app, &format!("/records/people/{}", mine), &token).await?;
    assert_eq!(status, StatusCode::OK, "{}", record);
    assert_eq!(record["first_name"], "Mine");

    let (status, _) = get_json(&app, &format!("/records/people/{}", theirs), &token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get_json(&app, "/records/invoices", &token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[sqlx::test]
async fn count_matches_list(pool: SqlitePool) -> Result<()> {
    let app = app(&pool).await?;
    let o = offices(&pool).await?;
    let admin = user(&pool, "Admin", Some("office_admin"), Some(o.home)).await?;
    let colleague = user(&pool, "Colleague", Some("standard_user"), Some(o.home)).await?;
    task(&pool, Some(o.home), admin, "A").await?;
    task(&pool, Some(o.home), colleague, "B").await?;
    task(&pool, Some(o.home), colleague, "C").await?;
    let token = token(admin);

    let (_, count) = get_json(&app, "/records/tasks/count", &token).await?;
    assert_eq!(count["count"], 1);

    get_json(&app, "/records/tasks?view=broad", &token).await?;
    let (_, count) = get_json(&app, "/records/tasks/count", &token).await?;
    let (_, page) = get_json(&app, "/records/tasks", &token).await?;
    assert_eq!(count["count"], 3);
    assert_eq!(page["count"], 3);

    Ok(())
}

#[sqlx::test]
async fn limited_user_output_is_field_restricted(pool: SqlitePool) -> Result<()> {
    let app = app(&pool).await?;
    let o = offices(&pool).await?;
    let limited = user(&pool, "Limited", Some("limited_user"), Some(o.home)).await?;
    let standard = user(&pool, "Standard", Some("standard_user"), Some(o.home)).await?;
    person(&pool, Some(o.home), limited, "Guarded").await?;
    person(&pool, Some(o.home), standard, "Open").await?;

    let (_, page) = get_json(&app, "/records/people", &token(limited)).await?;
    assert_eq!(page["count"], 1);
    assert_eq!(page["records"][0]["first_name"], "Guarded");
    assert!(page["records"][0]["email"].is_null());
    assert!(page["records"][0]["phone"].is_null());

    let (status, csv) = send(&app, "GET", "/records/people/export", Some(&token(limited)), None).await?;
    assert_eq!(status, StatusCode::OK);
    let csv = String::from_utf8(csv)?;
    assert!(csv.starts_with("id,"), "{}", csv);
    assert!(csv.contains("Guarded"));
    assert!(!csv.contains("@example.com"));
    assert!(!csv.contains("Open"));

    let (_, csv) = send(&app, "GET", "/records/people/export", Some(&token(standard)), None).await?;
    let csv = String::from_utf8(csv)?;
    assert!(csv.contains("open@example.com"));
    assert!(!csv.contains("Guarded"));

    Ok(())
}
