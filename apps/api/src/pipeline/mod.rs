//! The candidate pipeline: sourcing, matching, pitch composition and the
//! orchestrator that runs the stages in order for one job.

use thiserror::Error;

use crate::errors::AppError;
use crate::llm_client::LlmError;

pub mod handlers;
pub mod matching;
pub mod orchestrator;
pub mod pitch;
pub mod prompts;
pub mod sourcing;

/// Why a pipeline stage aborted.
///
/// A stage makes exactly one model call per batch; any failure (upstream
/// error, malformed output, store write) aborts the run with no retry.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("model output did not match the expected schema: {0}")]
    Schema(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<StageError> for AppError {
    fn from(err: StageError) -> Self {
        match err {
            StageError::Model(e) => AppError::Llm(e.to_string()),
            StageError::Schema(msg) => AppError::Llm(msg),
            StageError::Database(e) => AppError::Database(e),
        }
    }
}
