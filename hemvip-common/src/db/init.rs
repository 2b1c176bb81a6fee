//! Database initialization
//!
//! Creates the database on first run and brings the schema up idempotently.
//! Studies, pages and videos are provisioned by the experiment operators;
//! this only guarantees the tables exist with the expected shape.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas are per-connection; every pooled connection gets them
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_videos_table(&pool).await?;
    create_studies_table(&pool).await?;
    create_pages_table(&pool).await?;

    Ok(pool)
}

/// Create the videos table
///
/// Read-only reference data for the comparison pages.
pub async fn create_videos_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS videos (
            id INTEGER PRIMARY KEY,
            title TEXT,
            url TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the studies table
///
/// `status` is constrained to the lifecycle states. Structured columns hold
/// compact JSON text.
pub async fn create_studies_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS studies (
            id INTEGER PRIMARY KEY,
            name TEXT,
            status TEXT NOT NULL DEFAULT 'new'
                CHECK (status IN ('new', 'started', 'finish', 'failed', 'uncomplete')),
            prolific_userid TEXT,
            prolific_studyid TEXT,
            prolific_sessionid TEXT,
            time_start TEXT,
            global_actions TEXT,
            failed_attention_check TEXT,
            skipped_pages TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_studies_status ON studies(status)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the pages table
///
/// Outcome columns (`actions`, `selected`, `juiceOptions`, `juiceOtherReason`)
/// stay NULL until the owning study completes.
pub async fn create_pages_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pages (
            id INTEGER PRIMARY KEY,
            studyid INTEGER NOT NULL REFERENCES studies(id),
            name TEXT,
            video1 INTEGER NOT NULL REFERENCES videos(id),
            video2 INTEGER NOT NULL REFERENCES videos(id),
            options TEXT NOT NULL DEFAULT '[]',
            actions TEXT,
            selected TEXT,
            juiceOptions TEXT,
            juiceOtherReason TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pages_studyid ON pages(studyid)")
        .execute(pool)
        .await?;

    Ok(())
}
