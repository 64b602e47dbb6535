pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::outreach::handlers as outreach_handlers;
use crate::pipeline::handlers as pipeline_handlers;
use crate::review::handlers as review_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs and pipeline runs
        .route("/api/jobs", post(pipeline_handlers::handle_create_job))
        .route(
            "/api/jobs/:id/source-more",
            post(pipeline_handlers::handle_source_more),
        )
        .route(
            "/api/jobs/:id/pipeline/events",
            get(pipeline_handlers::handle_progress_stream),
        )
        // Review flow
        .route(
            "/api/jobs/:id/candidates/next",
            get(review_handlers::handle_next_candidate),
        )
        .route("/api/jobs/:id/stats", get(review_handlers::handle_stats))
        .route(
            "/api/jobs/:id/candidates/by-status/:status",
            get(review_handlers::handle_candidates_by_status),
        )
        .route(
            "/api/candidates/:id/accept",
            put(review_handlers::handle_accept),
        )
        .route(
            "/api/candidates/:id/reject",
            put(review_handlers::handle_reject),
        )
        // Outreach dispatch
        .route(
            "/api/outreach/send",
            post(outreach_handlers::handle_send_outreach),
        )
        .with_state(state)
}
