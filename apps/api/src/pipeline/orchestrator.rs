//! Pipeline orchestration for one job.
//!
//! A run walks the stage sequence: sourcing fills the candidate pool in
//! chunks, then matching scores everything still unscored. Any stage failure
//! marks the job `error`, emits `pipeline_error` and keeps everything already
//! persisted, so a later run resumes from the partial state instead of
//! redoing it.

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::events::{PipelineEvent, Stage};
use crate::models::candidate::Candidate;
use crate::models::job::{Job, PipelineStatus};
use crate::models::outreach::{DeliveryStatus, OutreachRecord, Pitch};
use crate::pipeline::matching::{self, MATCHING_CHUNK};
use crate::pipeline::pitch;
use crate::pipeline::sourcing::{self, SOURCING_CHUNK};
use crate::pipeline::StageError;
use crate::state::AppState;
use crate::store::{candidates, jobs, outreach};

/// Candidates sourced when a job's pipeline first runs.
pub const INITIAL_BATCH: usize = 25;
/// Candidates added per source-more run.
pub const SOURCE_MORE_BATCH: usize = 15;

/// Stages a run executes, in order.
#[derive(Debug, Clone, Copy)]
enum RunStage {
    Sourcing,
    Matching,
}

const RUN_SEQUENCE: [RunStage; 2] = [RunStage::Sourcing, RunStage::Matching];

/// Drives one admitted pipeline run to a terminal status.
///
/// The caller has already moved the job to `sourcing`; this function owns the
/// rest of the lifecycle, ending with `complete` or `error` and closing the
/// job's progress channel.
pub async fn run_pipeline(state: AppState, job: Job, batch_size: usize) {
    let job_id = job.id;

    match run_stages(&state, &job, batch_size).await {
        Ok(total) => {
            if let Err(e) = jobs::set_status(&state.db, job_id, PipelineStatus::Complete).await {
                error!("Failed to mark job {} complete: {}", job_id, e);
            }
            state
                .progress
                .publish(PipelineEvent::complete(
                    job_id,
                    Stage::Pipeline,
                    total as u32,
                    format!("Pipeline complete: {total} candidates ready for review"),
                ))
                .await;
        }
        Err(e) => {
            warn!("Pipeline for job {} failed: {}", job_id, e);
            if let Err(set_err) = jobs::set_status(&state.db, job_id, PipelineStatus::Error).await {
                error!("Failed to mark job {} errored: {}", job_id, set_err);
            }
            state
                .progress
                .publish(PipelineEvent::error(job_id, format!("Pipeline failed: {e}")))
                .await;
        }
    }

    state.progress.close(job_id).await;
}

async fn run_stages(state: &AppState, job: &Job, batch_size: usize) -> Result<usize, StageError> {
    state
        .progress
        .publish(PipelineEvent::start(
            job.id,
            Stage::Pipeline,
            format!("Pipeline started for '{}'", job.title),
        ))
        .await;

    for stage in RUN_SEQUENCE {
        match stage {
            RunStage::Sourcing => run_sourcing_stage(state, job, batch_size).await?,
            RunStage::Matching => {
                jobs::set_status(&state.db, job.id, PipelineStatus::Matching).await?;
                run_matching_stage(state, job).await?;
            }
        }
    }

    let total = candidates::count_for_job(&state.db, job.id).await?;
    Ok(total as usize)
}

/// Sources `batch_size` new candidates in chunks, persisting each chunk as
/// it lands so a failure keeps the partial batch.
async fn run_sourcing_stage(
    state: &AppState,
    job: &Job,
    batch_size: usize,
) -> Result<(), StageError> {
    state
        .progress
        .publish(PipelineEvent::start(
            job.id,
            Stage::Sourcing,
            format!("Sourcing {batch_size} candidates"),
        ))
        .await;

    let mut avoid_names = candidates::names_for_job(&state.db, job.id).await?;
    let mut sourced = 0usize;

    while sourced < batch_size {
        let want = (batch_size - sourced).min(SOURCING_CHUNK);
        let profiles =
            sourcing::generate_profiles(state.model.as_ref(), job, want, &avoid_names).await?;

        let batch: Vec<Candidate> =
            profiles.into_iter().map(|p| p.into_candidate(job.id)).collect();
        candidates::insert_batch(&state.db, &batch).await?;

        sourced += batch.len();
        avoid_names.extend(batch.into_iter().map(|c| c.name));

        state
            .progress
            .publish(PipelineEvent::progress(
                job.id,
                Stage::Sourcing,
                sourced as u32,
                batch_size as u32,
                format!("Sourced {sourced} of {batch_size} candidates"),
            ))
            .await;
    }

    state
        .progress
        .publish(PipelineEvent::complete(
            job.id,
            Stage::Sourcing,
            sourced as u32,
            format!("Sourcing complete: {sourced} new candidates"),
        ))
        .await;

    Ok(())
}

/// Scores every candidate the job has no match score for yet. Working from
/// the unscored set also sweeps up leftovers of an earlier failed run.
async fn run_matching_stage(state: &AppState, job: &Job) -> Result<(), StageError> {
    let unscored = candidates::unscored_for_job(&state.db, job.id).await?;
    let total = unscored.len();

    state
        .progress
        .publish(PipelineEvent::start(
            job.id,
            Stage::Matching,
            format!("Scoring {total} candidates"),
        ))
        .await;

    let mut scored = 0usize;
    for chunk in unscored.chunks(MATCHING_CHUNK) {
        let scores = matching::score_candidates(state.model.as_ref(), job, chunk).await?;
        candidates::insert_scores(&state.db, &scores).await?;

        scored += chunk.len();
        state
            .progress
            .publish(PipelineEvent::progress(
                job.id,
                Stage::Matching,
                scored as u32,
                total as u32,
                format!("Scored {scored} of {total} candidates"),
            ))
            .await;
    }

    state
        .progress
        .publish(PipelineEvent::complete(
            job.id,
            Stage::Matching,
            scored as u32,
            format!("Matching complete: {scored} candidates scored"),
        ))
        .await;

    Ok(())
}

/// What acceptance produces: the stored pitch and its pending outreach record.
#[derive(Debug)]
pub struct AcceptOutcome {
    pub pitch: Pitch,
    pub outreach_id: Uuid,
}

/// The on-accept tail of the pipeline: compose a pitch from the candidate's
/// match rationale, store it and stage a pending outreach record. Dispatch
/// happens in a separate request so a human sees the draft first.
pub async fn accept_flow(
    state: &AppState,
    candidate: &Candidate,
) -> Result<AcceptOutcome, AppError> {
    let job = jobs::get(&state.db, candidate.job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", candidate.job_id)))?;
    let score = candidates::get_score(&state.db, candidate.id).await?.ok_or_else(|| {
        AppError::Validation(format!("Candidate {} has not been scored yet", candidate.id))
    })?;

    let composed = pitch::compose_pitch(state.model.as_ref(), &job, candidate, &score).await?;

    let pitch = Pitch {
        id: Uuid::new_v4(),
        candidate_id: candidate.id,
        subject: composed.subject,
        body: composed.body,
        created_at: Utc::now(),
    };
    let record = OutreachRecord {
        id: Uuid::new_v4(),
        pitch_id: pitch.id,
        status: DeliveryStatus::Pending,
        detail: None,
        created_at: Utc::now(),
    };
    outreach::stage_outreach(&state.db, &pitch, &record).await?;

    info!(
        "Composed pitch {} for candidate {} ({})",
        pitch.id, candidate.id, candidate.name
    );

    Ok(AcceptOutcome {
        pitch,
        outreach_id: record.id,
    })
}
