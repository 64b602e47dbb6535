//! HTTP handlers for the candidate review flow.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{Candidate, CandidateWithScore, ReviewStats, ReviewStatus};
use crate::models::job::PipelineStatus;
use crate::models::outreach::Pitch;
use crate::pipeline::orchestrator;
use crate::state::AppState;
use crate::store::{candidates, jobs};

// ─────────────────────────────────────────────
// Response types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct NextCandidateResponse {
    pub candidate: Option<CandidateWithScore>,
    pub pipeline_status: PipelineStatus,
    pub stats: ReviewStats,
}

#[derive(Debug, Serialize)]
pub struct AcceptResponse {
    pub candidate_id: Uuid,
    pub pitch: Pitch,
    pub outreach_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct RejectResponse {
    pub candidate_id: Uuid,
    pub next: Option<CandidateWithScore>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub job_id: Uuid,
    pub pipeline_status: PipelineStatus,
    pub stats: ReviewStats,
}

#[derive(Debug, Serialize)]
pub struct CandidatesByStatusResponse {
    pub job_id: Uuid,
    pub review_status: ReviewStatus,
    pub candidates: Vec<CandidateWithScore>,
}

// ─────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────

/// Applies a write-once accept/reject decision, classifying why the guarded
/// update did not fire when it doesn't.
async fn decide_candidate(
    db: &SqlitePool,
    candidate_id: Uuid,
    decision: ReviewStatus,
) -> Result<Candidate, AppError> {
    let updated = candidates::mark_decided(db, candidate_id, decision).await?;
    if !updated {
        let current = candidates::get(db, candidate_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))?;
        return Err(match current.review_status {
            ReviewStatus::Pending | ReviewStatus::Viewed => {
                AppError::Validation(format!("Candidate {candidate_id} has not been scored yet"))
            }
            status => AppError::Conflict(format!(
                "Candidate {candidate_id} is already {}",
                status.as_str()
            )),
        });
    }
    candidates::get(db, candidate_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))
}

/// GET /api/jobs/:id/candidates/next
///
/// Serves the oldest undecided scored candidate, marking it `viewed`.
pub async fn handle_next_candidate(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<NextCandidateResponse>, AppError> {
    let job = jobs::get(&state.db, job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    let candidate = candidates::next_to_review(&state.db, job_id).await?;
    let stats = jobs::stats(&state.db, job_id).await?;

    Ok(Json(NextCandidateResponse {
        candidate,
        pipeline_status: job.pipeline_status,
        stats,
    }))
}

/// PUT /api/candidates/:id/accept
///
/// Accepts the candidate, composes their pitch and stages a pending outreach
/// record. If the pitch cannot be composed the decision is rolled back to
/// `viewed` so the accept can be retried.
pub async fn handle_accept(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<AcceptResponse>, AppError> {
    let candidate = decide_candidate(&state.db, candidate_id, ReviewStatus::Accepted).await?;

    let outcome = match orchestrator::accept_flow(&state, &candidate).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Accept tail failed for candidate {}: {}", candidate.id, e);
            if let Err(rollback_err) = candidates::reopen_review(&state.db, candidate.id).await {
                error!(
                    "Failed to reopen candidate {} after a failed accept: {}",
                    candidate.id, rollback_err
                );
            }
            return Err(e);
        }
    };

    info!("Accepted candidate {} ({})", candidate.id, candidate.name);

    Ok(Json(AcceptResponse {
        candidate_id: candidate.id,
        pitch: outcome.pitch,
        outreach_id: outcome.outreach_id,
    }))
}

/// PUT /api/candidates/:id/reject
///
/// Rejects the candidate and hands back the next one to review, saving the
/// client a round trip.
pub async fn handle_reject(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<RejectResponse>, AppError> {
    let candidate = decide_candidate(&state.db, candidate_id, ReviewStatus::Rejected).await?;
    let next = candidates::next_to_review(&state.db, candidate.job_id).await?;

    info!("Rejected candidate {} ({})", candidate.id, candidate.name);

    Ok(Json(RejectResponse {
        candidate_id: candidate.id,
        next,
    }))
}

/// GET /api/jobs/:id/stats
pub async fn handle_stats(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<StatsResponse>, AppError> {
    let job = jobs::get(&state.db, job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;
    let stats = jobs::stats(&state.db, job_id).await?;

    Ok(Json(StatsResponse {
        job_id: job.id,
        pipeline_status: job.pipeline_status,
        stats,
    }))
}

/// GET /api/jobs/:id/candidates/by-status/:status
pub async fn handle_candidates_by_status(
    State(state): State<AppState>,
    Path((job_id, status)): Path<(Uuid, String)>,
) -> Result<Json<CandidatesByStatusResponse>, AppError> {
    let review_status = ReviewStatus::parse(&status)
        .ok_or_else(|| AppError::Validation(format!("Unknown review status '{status}'")))?;
    let job = jobs::get(&state.db, job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    let candidates = candidates::by_status(&state.db, job.id, review_status).await?;

    Ok(Json(CandidatesByStatusResponse {
        job_id: job.id,
        review_status,
        candidates,
    }))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
