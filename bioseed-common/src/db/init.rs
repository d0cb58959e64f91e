//! Database initialization
//!
//! Opens (creating if needed) the SQLite database and makes sure the
//! specimen, visit and effort tables exist. Safe to run on every start.

use crate::db::schema::{effort_ddl, specimens_ddl, visits_ddl, EFFORT_TABLE, VISITS_TABLE};
use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL lets a reader page through visits while effort rows are written
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// Every pooled connection to `sqlite::memory:` would see its own empty
/// database, so the pool is capped at one connection.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(&specimens_ddl()).execute(pool).await?;
    sqlx::query(&visits_ddl()).execute(pool).await?;
    sqlx::query(&effort_ddl()).execute(pool).await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_specimens_locality ON specimens (locality_id, start_date)",
    )
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_visits_location_day ON {VISITS_TABLE} (location_id, start_epoch_day)"
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_effort_richness ON {EFFORT_TABLE} (is_final, species_count DESC, location_id)"
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_effort_location ON {EFFORT_TABLE} (location_id, visit_count)"
    ))
    .execute(pool)
    .await?;

    Ok(())
}
