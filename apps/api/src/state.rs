use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::events::PipelineEvents;
use crate::llm_client::ModelCapability;
use crate::outreach::OutreachTransport;
use crate::rate_limit::RateLimiter;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    /// Model boundary for the pipeline stages. Production wires the Anthropic
    /// client; tests swap in a scripted model.
    pub model: Arc<dyn ModelCapability>,
    /// Delivery boundary for outreach. Default: ConsoleTransport.
    pub outreach: Arc<dyn OutreachTransport>,
    /// Per-job progress channels feeding the SSE endpoint.
    pub progress: PipelineEvents,
    /// Per-client limits on the run-launching endpoints.
    pub limits: RateLimiter,
}
