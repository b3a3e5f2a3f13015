//! Database initialization
//!
//! Tables are created with `CREATE TABLE IF NOT EXISTS`, so opening an existing database is
//! safe and a missing one is created on first run.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the database file and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Single-connection in-memory database with the schema applied
pub async fn init_memory_database() -> Result<SqlitePool> {
    // One connection: every pooled connection to :memory: would otherwise be its own database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_pages_table(pool).await?;
    create_statements_table(pool).await?;
    create_verifications_table(pool).await?;
    create_reconciliations_table(pool).await?;
    Ok(())
}

async fn create_pages_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pages (
            title TEXT PRIMARY KEY,
            position_held_item TEXT NOT NULL,
            parliamentary_term_item TEXT UNIQUE,
            reference_url TEXT NOT NULL,
            csv_source_url TEXT,
            executive_position INTEGER NOT NULL DEFAULT 0,
            country_item TEXT,
            new_item_description_en TEXT,
            new_item_label_language TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_statements_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS statements (
            transaction_id TEXT PRIMARY KEY,
            page_title TEXT NOT NULL REFERENCES pages(title) ON DELETE CASCADE,
            person_name TEXT NOT NULL,
            person_item TEXT,
            parliamentary_group_name TEXT,
            parliamentary_group_item TEXT,
            electoral_district_name TEXT,
            electoral_district_item TEXT,
            parliamentary_term_item TEXT,
            position_start TEXT,
            position_end TEXT,
            statement_uuid TEXT,
            force_type TEXT,
            removed_from_source INTEGER NOT NULL DEFAULT 0,
            actioned_at TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_statements_page ON statements(page_title)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_verifications_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS verifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id TEXT NOT NULL REFERENCES statements(transaction_id) ON DELETE CASCADE,
            user TEXT NOT NULL,
            status INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_reconciliations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reconciliations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id TEXT NOT NULL REFERENCES statements(transaction_id) ON DELETE CASCADE,
            resource_type TEXT NOT NULL,
            item TEXT NOT NULL,
            user TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
