//! Job records and the pipeline-status state machine.
//!
//! Run admission is a guarded UPDATE so concurrent attempts resolve in the
//! database, not in process memory: exactly one caller wins, everyone else
//! sees zero rows affected.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::models::candidate::{ReviewStats, ReviewStatus};
use crate::models::job::{Job, PipelineStatus};

/// Inserts a new job in `idle` state and returns it.
pub async fn create(
    pool: &SqlitePool,
    title: &str,
    company: Option<&str>,
    description: &str,
) -> Result<Job, sqlx::Error> {
    let job = Job {
        id: Uuid::new_v4(),
        title: title.to_string(),
        company: company.map(str::to_string),
        description: description.to_string(),
        pipeline_status: PipelineStatus::Idle,
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO jobs (id, title, company, description, pipeline_status, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(job.id)
    .bind(&job.title)
    .bind(job.company.as_deref())
    .bind(&job.description)
    .bind(job.pipeline_status)
    .bind(job.created_at)
    .execute(pool)
    .await?;

    info!("Created job {} ('{}')", job.id, job.title);
    Ok(job)
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Admits a new pipeline run by flipping the job to `sourcing`.
///
/// Returns false when a run is already in progress (`sourcing`/`matching`)
/// or the job does not exist. `idle`, `complete` and `error` all admit.
pub async fn try_begin_run(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE jobs SET pipeline_status = 'sourcing'
        WHERE id = ? AND pipeline_status IN ('idle', 'complete', 'error')
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Moves the job to the given status. Used by the orchestrator for the
/// in-run transitions after admission.
pub async fn set_status(
    pool: &SqlitePool,
    id: Uuid,
    status: PipelineStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE jobs SET pipeline_status = ? WHERE id = ?")
        .bind(status)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Marks every job stuck in an in-flight status as `error`.
///
/// Runs at startup: a process that died mid-run leaves its job in
/// `sourcing`/`matching`, and `try_begin_run` would reject that job forever.
/// Partial candidates and scores stay put; the next run picks them up.
pub async fn sweep_stale_runs(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE jobs SET pipeline_status = 'error' WHERE pipeline_status IN ('sourcing', 'matching')",
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Candidate counts by review status for one job.
pub async fn stats(pool: &SqlitePool, job_id: Uuid) -> Result<ReviewStats, sqlx::Error> {
    let rows: Vec<(ReviewStatus, i64)> = sqlx::query_as(
        "SELECT review_status, COUNT(*) FROM candidates WHERE job_id = ? GROUP BY review_status",
    )
    .bind(job_id)
    .fetch_all(pool)
    .await?;

    let mut stats = ReviewStats::default();
    for (status, count) in rows {
        stats.total += count;
        match status {
            ReviewStatus::Pending => stats.pending = count,
            ReviewStatus::Viewed => stats.viewed = count,
            ReviewStatus::Accepted => stats.accepted = count,
            ReviewStatus::Rejected => stats.rejected = count,
            ReviewStatus::Contacted => stats.contacted = count,
        }
    }
    Ok(stats)
}
