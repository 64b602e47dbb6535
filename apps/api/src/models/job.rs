use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Job-level pipeline state machine.
///
/// `idle → sourcing → matching → complete`, with `error` reachable from
/// `sourcing` and `matching`. A job in `complete` or `error` may re-enter
/// `sourcing` for an additive batch; a job already in `sourcing` or
/// `matching` admits no second run. Admission is enforced by a guarded
/// UPDATE in the store, never by process-local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PipelineStatus {
    Idle,
    Sourcing,
    Matching,
    Complete,
    Error,
}

impl PipelineStatus {
    /// True once the most recent run has finished, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStatus::Complete | PipelineStatus::Error)
    }
}

/// A recruiting job and the pipeline state of its candidate batch.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub company: Option<String>,
    pub description: String,
    pub pipeline_status: PipelineStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(PipelineStatus::Complete.is_terminal());
        assert!(PipelineStatus::Error.is_terminal());
        assert!(!PipelineStatus::Idle.is_terminal());
        assert!(!PipelineStatus::Sourcing.is_terminal());
        assert!(!PipelineStatus::Matching.is_terminal());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&PipelineStatus::Sourcing).unwrap();
        assert_eq!(json, "\"sourcing\"");
        let back: PipelineStatus = serde_json::from_str("\"complete\"").unwrap();
        assert_eq!(back, PipelineStatus::Complete);
    }
}
