//! HTTP handlers for starting pipeline runs and watching their progress.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{ConnectInfo, Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::future::Either;
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::PipelineStatus;
use crate::pipeline::orchestrator::{self, INITIAL_BATCH, SOURCE_MORE_BATCH};
use crate::state::AppState;
use crate::store::jobs;

/// Run launches admitted per client address per hour.
const CREATE_JOB_LIMIT: usize = 10;
const SOURCE_MORE_LIMIT: usize = 5;
const LIMIT_WINDOW: Duration = Duration::from_secs(3600);

// ─────────────────────────────────────────────
// Request / Response types
// ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub company: Option<String>,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct CreateJobResponse {
    pub job_id: Uuid,
    pub pipeline_status: PipelineStatus,
}

#[derive(Debug, Serialize)]
pub struct SourceMoreResponse {
    pub job_id: Uuid,
    pub pipeline_status: PipelineStatus,
}

// ─────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────

/// POST /api/jobs
///
/// Creates the job and immediately starts its initial pipeline run in the
/// background. The response returns as soon as the run is admitted.
pub async fn handle_create_job(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    Json(request): Json<CreateJobRequest>,
) -> Result<Json<CreateJobResponse>, AppError> {
    if !state.limits.check("create_job", client.ip(), CREATE_JOB_LIMIT, LIMIT_WINDOW).await {
        return Err(AppError::RateLimited(
            "Too many jobs created from this address; try again later".to_string(),
        ));
    }

    let title = request.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title cannot be empty".to_string()));
    }
    let description = request.description.trim();
    if description.is_empty() {
        return Err(AppError::Validation("description cannot be empty".to_string()));
    }
    let company = request.company.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let mut job = jobs::create(&state.db, title, company, description).await?;

    if !jobs::try_begin_run(&state.db, job.id).await? {
        return Err(AppError::Conflict(format!(
            "A pipeline run is already in progress for job {}",
            job.id
        )));
    }
    job.pipeline_status = PipelineStatus::Sourcing;

    info!("Starting initial pipeline for job {} ({})", job.id, job.title);
    tokio::spawn(orchestrator::run_pipeline(state, job.clone(), INITIAL_BATCH));

    Ok(Json(CreateJobResponse {
        job_id: job.id,
        pipeline_status: job.pipeline_status,
    }))
}

/// POST /api/jobs/:id/source-more
///
/// Admits another sourcing run for a settled job. Rejected with a conflict
/// while a run is still in flight.
pub async fn handle_source_more(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<SourceMoreResponse>, AppError> {
    if !state.limits.check("source_more", client.ip(), SOURCE_MORE_LIMIT, LIMIT_WINDOW).await {
        return Err(AppError::RateLimited(
            "Too many sourcing runs requested from this address; try again later".to_string(),
        ));
    }

    let mut job = jobs::get(&state.db, job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    if !jobs::try_begin_run(&state.db, job.id).await? {
        return Err(AppError::Conflict(format!(
            "A pipeline run is already in progress for job {}",
            job.id
        )));
    }
    job.pipeline_status = PipelineStatus::Sourcing;

    info!("Starting source-more run for job {}", job.id);
    tokio::spawn(orchestrator::run_pipeline(state, job.clone(), SOURCE_MORE_BATCH));

    Ok(Json(SourceMoreResponse {
        job_id: job.id,
        pipeline_status: job.pipeline_status,
    }))
}

/// GET /api/jobs/:id/pipeline/events
///
/// SSE stream of the job's pipeline progress. When no run is in flight the
/// stream emits a single `closed` frame instead of hanging; during a run it
/// relays broadcast events until the orchestrator closes the channel.
pub async fn handle_progress_stream(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    // Subscribe before reading the status. The orchestrator sets the terminal
    // status before its final publish and close, so a status that still reads
    // in-flight here means the channel we hold will be closed, and a terminal
    // one means nothing will publish again and we must not keep the channel.
    let receiver = state.progress.subscribe(job_id).await;
    let job = match jobs::get(&state.db, job_id).await? {
        Some(job) => job,
        None => {
            drop(receiver);
            state.progress.close(job_id).await;
            return Err(AppError::NotFound(format!("Job {job_id} not found")));
        }
    };

    let stream = if job.pipeline_status.is_terminal() {
        drop(receiver);
        state.progress.close(job_id).await;
        let frame = Event::default().event("closed").data(
            json!({"job_id": job.id, "pipeline_status": job.pipeline_status}).to_string(),
        );
        Either::Left(stream::iter([Ok::<_, Infallible>(frame)]))
    } else {
        Either::Right(stream::unfold(receiver, move |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => match Event::default().event(event.label()).json_data(&event) {
                        Ok(frame) => return Some((Ok::<_, Infallible>(frame), receiver)),
                        Err(e) => {
                            warn!("Failed to serialize progress event: {}", e);
                            continue;
                        }
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(
                            "Progress subscriber for job {} lagged, skipped {} events",
                            job_id, skipped
                        );
                        continue;
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        }))
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
