use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

/// Creates and returns the SQLite connection pool, creating the database
/// file on first run.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    info!("Opening SQLite database...");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    info!("SQLite connection pool established");
    Ok(pool)
}

/// One DDL statement per table, executed in order at every startup.
/// Id columns are BLOBs holding raw UUID bytes; timestamps are RFC 3339 text
/// bound from Rust, never generated by SQLite.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id BLOB PRIMARY KEY,
        title TEXT NOT NULL,
        company TEXT,
        description TEXT NOT NULL,
        pipeline_status TEXT NOT NULL DEFAULT 'idle'
            CHECK (pipeline_status IN ('idle', 'sourcing', 'matching', 'complete', 'error')),
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS candidates (
        id BLOB PRIMARY KEY,
        job_id BLOB NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        headline TEXT NOT NULL,
        summary TEXT NOT NULL,
        email TEXT NOT NULL,
        profile_url TEXT,
        location TEXT NOT NULL,
        years_experience INTEGER NOT NULL,
        skills TEXT NOT NULL DEFAULT '[]',
        review_status TEXT NOT NULL DEFAULT 'pending'
            CHECK (review_status IN ('pending', 'viewed', 'accepted', 'rejected', 'contacted')),
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS match_scores (
        candidate_id BLOB PRIMARY KEY REFERENCES candidates(id) ON DELETE CASCADE,
        score REAL NOT NULL CHECK (score >= 0.0 AND score <= 100.0),
        rationale TEXT NOT NULL,
        highlights TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pitches (
        id BLOB PRIMARY KEY,
        candidate_id BLOB NOT NULL UNIQUE REFERENCES candidates(id) ON DELETE CASCADE,
        subject TEXT NOT NULL,
        body TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS outreach_records (
        id BLOB PRIMARY KEY,
        pitch_id BLOB NOT NULL UNIQUE REFERENCES pitches(id) ON DELETE CASCADE,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'sent', 'failed')),
        detail TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_candidates_job_status ON candidates(job_id, review_status)",
];

/// Creates all tables if they do not exist. Safe to run at every startup.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Database schema ready");
    Ok(())
}

/// In-memory pool for tests: a single connection that is never recycled, so
/// the in-memory database survives for the life of the pool.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid sqlite url")
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("in-memory pool");

    init_schema(&pool).await.expect("schema init");
    pool
}
