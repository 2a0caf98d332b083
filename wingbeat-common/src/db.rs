//! Database access for the Wingbeat station
//!
//! One SQLite database holds the `predictions` table: one row per completed
//! submission, read back in bulk by the map.

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Creates the parent directory and the database file when missing, then
/// runs the table migration.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Initialize station tables
///
/// `species_id`, `confidence` and `geo` are JSON-encoded TEXT columns:
/// `species_id` may be a string or an integer, `confidence` a number or a
/// boolean, and `geo` is always the structured `{"lat": .., "lon": ..}`
/// object, never flattened into two scalar columns.
async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS predictions (
            id TEXT PRIMARY KEY,
            image_path TEXT NOT NULL,
            image_url TEXT NOT NULL,
            species_name TEXT NOT NULL,
            species_id TEXT,
            confidence TEXT,
            geo TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (predictions)");

    Ok(())
}
