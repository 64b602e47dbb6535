//! Candidate records, match scores and the review state machine.
//!
//! Accept/reject is a guarded UPDATE: it only fires for an undecided
//! candidate that already has a match score, so write-once decisions and
//! the "no review before scoring" rule hold under concurrent callers.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::candidate::{Candidate, CandidateWithScore, MatchScore, ReviewStatus};

/// Columns selected whenever a candidate is joined with its match score.
const WITH_SCORE_COLUMNS: &str = r#"
    c.id, c.job_id, c.name, c.headline, c.summary, c.email, c.profile_url,
    c.location, c.years_experience, c.skills, c.review_status, c.created_at,
    m.score, m.rationale, m.highlights
"#;

/// Persists one sourced batch atomically.
pub async fn insert_batch(pool: &SqlitePool, candidates: &[Candidate]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for candidate in candidates {
        sqlx::query(
            r#"
            INSERT INTO candidates
                (id, job_id, name, headline, summary, email, profile_url,
                 location, years_experience, skills, review_status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(candidate.id)
        .bind(candidate.job_id)
        .bind(&candidate.name)
        .bind(&candidate.headline)
        .bind(&candidate.summary)
        .bind(&candidate.email)
        .bind(candidate.profile_url.as_deref())
        .bind(&candidate.location)
        .bind(candidate.years_experience)
        .bind(&candidate.skills)
        .bind(candidate.review_status)
        .bind(candidate.created_at)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Option<Candidate>, sqlx::Error> {
    sqlx::query_as::<_, Candidate>("SELECT * FROM candidates WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Names already sourced for a job, fed back to the sourcing prompt so
/// additive batches do not repeat people.
pub async fn names_for_job(pool: &SqlitePool, job_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT name FROM candidates WHERE job_id = ?")
        .bind(job_id)
        .fetch_all(pool)
        .await
}

pub async fn count_for_job(pool: &SqlitePool, job_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM candidates WHERE job_id = ?")
        .bind(job_id)
        .fetch_one(pool)
        .await
}

/// Candidates with no match score yet, oldest first. The matching stage
/// works through this set, which also picks up leftovers from a run that
/// failed between sourcing and scoring.
pub async fn unscored_for_job(pool: &SqlitePool, job_id: Uuid) -> Result<Vec<Candidate>, sqlx::Error> {
    sqlx::query_as::<_, Candidate>(
        r#"
        SELECT c.* FROM candidates c
        LEFT JOIN match_scores m ON m.candidate_id = c.id
        WHERE c.job_id = ? AND m.candidate_id IS NULL
        ORDER BY c.created_at ASC, c.rowid ASC
        "#,
    )
    .bind(job_id)
    .fetch_all(pool)
    .await
}

/// Persists one scored batch atomically. A candidate that already has a
/// score keeps it; re-scoring never overwrites.
pub async fn insert_scores(pool: &SqlitePool, scores: &[MatchScore]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for score in scores {
        sqlx::query(
            r#"
            INSERT INTO match_scores (candidate_id, score, rationale, highlights, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(candidate_id) DO NOTHING
            "#,
        )
        .bind(score.candidate_id)
        .bind(score.score)
        .bind(&score.rationale)
        .bind(&score.highlights)
        .bind(score.created_at)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn get_score(pool: &SqlitePool, candidate_id: Uuid) -> Result<Option<MatchScore>, sqlx::Error> {
    sqlx::query_as::<_, MatchScore>("SELECT * FROM match_scores WHERE candidate_id = ?")
        .bind(candidate_id)
        .fetch_optional(pool)
        .await
}

/// Serves the oldest undecided scored candidate for a job, transitioning it
/// to `viewed`. Candidates without a match score are never served.
pub async fn next_to_review(
    pool: &SqlitePool,
    job_id: Uuid,
) -> Result<Option<CandidateWithScore>, sqlx::Error> {
    let query = format!(
        r#"
        SELECT {WITH_SCORE_COLUMNS}
        FROM candidates c
        JOIN match_scores m ON m.candidate_id = c.id
        WHERE c.job_id = ? AND c.review_status IN ('pending', 'viewed')
        ORDER BY c.created_at ASC, c.rowid ASC
        LIMIT 1
        "#
    );
    let next = sqlx::query_as::<_, CandidateWithScore>(&query)
        .bind(job_id)
        .fetch_optional(pool)
        .await?;

    let Some(mut with_score) = next else {
        return Ok(None);
    };

    if with_score.candidate.review_status == ReviewStatus::Pending {
        sqlx::query("UPDATE candidates SET review_status = 'viewed' WHERE id = ? AND review_status = 'pending'")
            .bind(with_score.candidate.id)
            .execute(pool)
            .await?;
        with_score.candidate.review_status = ReviewStatus::Viewed;
    }

    Ok(Some(with_score))
}

/// Applies a terminal accept/reject decision.
///
/// Returns false without touching the row when the candidate is missing,
/// already decided, or has no match score yet; callers classify which.
pub async fn mark_decided(
    pool: &SqlitePool,
    id: Uuid,
    decision: ReviewStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE candidates SET review_status = ?
        WHERE id = ? AND review_status IN ('pending', 'viewed')
          AND EXISTS (SELECT 1 FROM match_scores m WHERE m.candidate_id = candidates.id)
        "#,
    )
    .bind(decision)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Puts an accepted candidate back under review. Used to undo an accept
/// whose pitch composition failed, so the accept can be retried.
pub async fn reopen_review(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE candidates SET review_status = 'viewed' WHERE id = ? AND review_status = 'accepted'",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// All scored candidates for a job in one review status, best fit first.
pub async fn by_status(
    pool: &SqlitePool,
    job_id: Uuid,
    status: ReviewStatus,
) -> Result<Vec<CandidateWithScore>, sqlx::Error> {
    let query = format!(
        r#"
        SELECT {WITH_SCORE_COLUMNS}
        FROM candidates c
        JOIN match_scores m ON m.candidate_id = c.id
        WHERE c.job_id = ? AND c.review_status = ?
        ORDER BY m.score DESC
        "#
    );
    sqlx::query_as::<_, CandidateWithScore>(&query)
        .bind(job_id)
        .bind(status)
        .fetch_all(pool)
        .await
}
