use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use office_scope::authz::{
    AccessGate, ActorDirectory, Collection, DefaultScopeResolver, Role, SqliteActorDirectory, SqliteViewModeStore,
    ViewModeState,
};
use office_scope::db;
use office_scope::events::verify_chain;
use office_scope::models::{Office, User};

#[derive(Parser, Debug)]
#[command(author, version, about = "office-scope administration tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Create an office and print its id
    CreateOffice { name: String },
    /// List offices
    ListOffices,
    /// Create a user and print its id
    CreateUser {
        name: String,
        email: String,
        #[arg(long)]
        role: Option<Role>,
        #[arg(long)]
        office: Option<Uuid>,
    },
    /// List users with their stored and effective roles
    ListUsers,
    /// Change a user's role
    SetRole { user: Uuid, role: Role },
    /// Change or clear a user's home office
    SetOffice { user: Uuid, office: Option<Uuid> },
    /// Print the scope a user currently resolves to for a collection
    Explain { user: Uuid, collection: Collection },
    /// Recompute the audit hash chain
    AuditVerify,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();
    let pool = get_pool().await?;

    match cli.command {
        Commands::MigrateRun => {
            db::migrate(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => print_status(&pool).await?,
        Commands::CreateOffice { name } => {
            let id = Uuid::new_v4();
            sqlx::query("INSERT INTO offices (id, name, created_at) VALUES (?, ?, ?)")
                .bind(id)
                .bind(&name)
                .bind(Utc::now())
                .execute(&pool)
                .await
                .with_context(|| format!("failed to create office {}", name))?;
            println!("{}", id);
        }
        Commands::ListOffices => {
            let offices: Vec<Office> = sqlx::query_as("SELECT id, name, created_at FROM offices ORDER BY name")
                .fetch_all(&pool)
                .await?;
            for office in offices {
                println!("{:<38} {:<24} {}", office.id, office.name, office.created_at.format("%Y-%m-%d"));
            }
        }
        Commands::CreateUser { name, email, role, office } => {
            let id = Uuid::new_v4();
            let now = Utc::now();
            sqlx::query(
                "INSERT INTO users (id, name, email, role, home_office_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(&name)
            .bind(&email)
            .bind(role.map(Role::as_str))
            .bind(office)
            .bind(now)
            .bind(now)
            .execute(&pool)
            .await
            .with_context(|| format!("failed to create user {}", email))?;
            println!("{}", id);
        }
        Commands::ListUsers => {
            let users: Vec<User> = sqlx::query_as(
                "SELECT id, name, email, role, home_office_id, created_at, updated_at FROM users WHERE deleted_at IS NULL ORDER BY name",
            )
            .fetch_all(&pool)
            .await?;

            println!("{:<38} {:<16} {:<16} {:<38} {}", "Id", "Stored role", "Effective", "Office", "Email");
            for user in users {
                let actor = user.actor();
                println!(
                    "{:<38} {:<16} {:<16} {:<38} {}",
                    user.id,
                    user.role.as_deref().unwrap_or("-"),
                    actor.role.as_str(),
                    user.home_office_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
                    user.email
                );
            }
        }
        Commands::SetRole { user, role } => {
            let updated = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(role.as_str())
                .bind(Utc::now())
                .bind(user)
                .execute(&pool)
                .await?
                .rows_affected();
            anyhow::ensure!(updated == 1, "no active user {}", user);
            println!("{} is now {}", user, role);
        }
        Commands::SetOffice { user, office } => {
            let updated =
                sqlx::query("UPDATE users SET home_office_id = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
                    .bind(office)
                    .bind(Utc::now())
                    .bind(user)
                    .execute(&pool)
                    .await?
                    .rows_affected();
            anyhow::ensure!(updated == 1, "no active user {}", user);
            match office {
                Some(office) => println!("{} now belongs to office {}", user, office),
                None => println!("{} has no home office", user),
            }
        }
        Commands::Explain { user, collection } => explain(&pool, user, collection).await?,
        Commands::AuditVerify => {
            let report = verify_chain(&pool).await?;
            match report.broken_at {
                None => println!("audit chain intact ({} entries)", report.entries),
                Some(seq) => anyhow::bail!("audit chain broken at seq {} after {} valid entries", seq, report.entries),
            }
        }
    }

    Ok(())
}

async fn explain(pool: &SqlitePool, user: Uuid, collection: Collection) -> anyhow::Result<()> {
    let actor = SqliteActorDirectory::new(pool.clone()).resolve(user).await?;
    let gate = AccessGate::new(
        ViewModeState::new(Arc::new(SqliteViewModeStore::new(pool.clone()))),
        Arc::new(DefaultScopeResolver::new()),
    );

    let stored = gate.view_modes().get(actor.id, collection).await?;
    let decision = gate.decide(&actor, collection, None).await?;
    let resolution = decision.resolution;

    println!("actor       {}", actor.id);
    println!("role        {} (rank {})", actor.role, actor.role.rank());
    println!(
        "office      {}",
        actor.home_office_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string())
    );
    println!("collection  {}", collection);
    println!("stored mode {}", stored);
    println!("mode        {}", resolution.mode);
    println!("scope       {}", resolution.scope);
    if resolution.field_restricted {
        println!("fields      restricted");
    }
    for notice in &resolution.notices {
        println!("notice      {}", notice);
    }

    Ok(())
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    db::connect(&database_url, 5).await
}

async fn print_status(pool: &SqlitePool) -> anyhow::Result<()> {
    let has_table: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
            .fetch_optional(pool)
            .await?;

    let applied_versions: HashSet<i64> = if has_table.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in db::MIGRATOR.iter() {
        let status = if applied_versions.contains(&migration.version) { "applied" } else { "pending" };
        let desc = migration.description.as_ref().trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, migration.version, name);
    }

    Ok(())
}
