//! Per-job progress broadcasting.
//!
//! Each pipeline run publishes coarse stage events to a per-job broadcast
//! channel; SSE subscribers attach to the channel for the job they watch.
//! The channel is a liveness aid only. Events may be dropped when a slow
//! subscriber lags or when nobody is listening, and the review store remains
//! the source of truth for what actually happened.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Buffered events per job channel before a lagging subscriber starts
/// losing the oldest ones.
const CHANNEL_CAPACITY: usize = 128;

// ─────────────────────────────────────────────
// Event types
// ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pipeline,
    Sourcing,
    Matching,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Pipeline => "pipeline",
            Stage::Sourcing => "sourcing",
            Stage::Matching => "matching",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    Progress,
    Complete,
    Error,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Progress => "progress",
            EventKind::Complete => "complete",
            EventKind::Error => "error",
        }
    }
}

/// One progress update from a pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineEvent {
    pub job_id: Uuid,
    pub stage: Stage,
    pub kind: EventKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

impl PipelineEvent {
    fn new(job_id: Uuid, stage: Stage, kind: EventKind, message: String) -> Self {
        Self {
            job_id,
            stage,
            kind,
            message,
            count: None,
            total: None,
            timestamp: Utc::now(),
        }
    }

    pub fn start(job_id: Uuid, stage: Stage, message: impl Into<String>) -> Self {
        Self::new(job_id, stage, EventKind::Start, message.into())
    }

    pub fn progress(
        job_id: Uuid,
        stage: Stage,
        count: u32,
        total: u32,
        message: impl Into<String>,
    ) -> Self {
        let mut event = Self::new(job_id, stage, EventKind::Progress, message.into());
        event.count = Some(count);
        event.total = Some(total);
        event
    }

    pub fn complete(job_id: Uuid, stage: Stage, count: u32, message: impl Into<String>) -> Self {
        let mut event = Self::new(job_id, stage, EventKind::Complete, message.into());
        event.count = Some(count);
        event
    }

    pub fn error(job_id: Uuid, message: impl Into<String>) -> Self {
        Self::new(job_id, Stage::Pipeline, EventKind::Error, message.into())
    }

    /// SSE event name, e.g. `sourcing_progress` or `pipeline_error`.
    pub fn label(&self) -> String {
        format!("{}_{}", self.stage.as_str(), self.kind.as_str())
    }
}

// ─────────────────────────────────────────────
// Channel registry
// ─────────────────────────────────────────────

/// Registry of per-job broadcast channels.
///
/// Channels are created lazily on first publish or subscribe and removed when
/// the run reaches a terminal status, which disconnects every subscriber.
#[derive(Clone, Default)]
pub struct PipelineEvents {
    channels: Arc<RwLock<HashMap<Uuid, broadcast::Sender<PipelineEvent>>>>,
}

impl PipelineEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, job_id: Uuid) -> broadcast::Receiver<PipelineEvent> {
        let mut channels = self.channels.write().await;
        channels
            .entry(job_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub async fn publish(&self, event: PipelineEvent) {
        let sender = {
            let mut channels = self.channels.write().await;
            channels
                .entry(event.job_id)
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                .clone()
        };
        // No active receivers is fine; the event is simply dropped.
        let _ = sender.send(event);
    }

    /// Drops the job's channel so every subscriber sees the stream end.
    pub async fn close(&self, job_id: Uuid) {
        self.channels.write().await.remove(&job_id);
    }

    /// Whether a sender currently exists for the job.
    #[cfg(test)]
    pub async fn is_open(&self, job_id: Uuid) -> bool {
        self.channels.read().await.contains_key(&job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_labels_combine_stage_and_kind() {
        let job_id = Uuid::new_v4();
        assert_eq!(PipelineEvent::start(job_id, Stage::Pipeline, "go").label(), "pipeline_start");
        assert_eq!(PipelineEvent::start(job_id, Stage::Sourcing, "go").label(), "sourcing_start");
        assert_eq!(
            PipelineEvent::progress(job_id, Stage::Sourcing, 5, 25, "tick").label(),
            "sourcing_progress"
        );
        assert_eq!(
            PipelineEvent::complete(job_id, Stage::Matching, 25, "done").label(),
            "matching_complete"
        );
        assert_eq!(PipelineEvent::error(job_id, "boom").label(), "pipeline_error");
    }

    #[test]
    fn test_event_serializes_snake_case_and_skips_empty_counts() {
        let event = PipelineEvent::start(Uuid::new_v4(), Stage::Matching, "Scoring 5 candidates");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["stage"], "matching");
        assert_eq!(value["kind"], "start");
        assert!(value.get("count").is_none());
        assert!(value.get("total").is_none());

        let progress = PipelineEvent::progress(Uuid::new_v4(), Stage::Sourcing, 10, 25, "tick");
        let value = serde_json::to_value(&progress).unwrap();
        assert_eq!(value["count"], 10);
        assert_eq!(value["total"], 25);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_dropped() {
        let events = PipelineEvents::new();
        let job_id = Uuid::new_v4();

        events.publish(PipelineEvent::start(job_id, Stage::Pipeline, "go")).await;

        // a later subscriber starts fresh, earlier events are gone
        let mut rx = events.subscribe(job_id).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_publish_order() {
        let events = PipelineEvents::new();
        let job_id = Uuid::new_v4();
        let mut rx = events.subscribe(job_id).await;

        events.publish(PipelineEvent::start(job_id, Stage::Sourcing, "go")).await;
        events.publish(PipelineEvent::progress(job_id, Stage::Sourcing, 5, 25, "tick")).await;
        events.publish(PipelineEvent::complete(job_id, Stage::Sourcing, 25, "done")).await;

        assert_eq!(rx.try_recv().unwrap().label(), "sourcing_start");
        assert_eq!(rx.try_recv().unwrap().label(), "sourcing_progress");
        assert_eq!(rx.try_recv().unwrap().label(), "sourcing_complete");
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_close_disconnects_after_drain() {
        let events = PipelineEvents::new();
        let job_id = Uuid::new_v4();
        let mut rx = events.subscribe(job_id).await;

        events.publish(PipelineEvent::complete(job_id, Stage::Pipeline, 25, "done")).await;
        events.close(job_id).await;

        // buffered events still drain, then the stream ends
        assert_eq!(rx.try_recv().unwrap().label(), "pipeline_complete");
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Closed)));
    }

    #[tokio::test]
    async fn test_channels_are_isolated_per_job() {
        let events = PipelineEvents::new();
        let job_a = Uuid::new_v4();
        let job_b = Uuid::new_v4();
        let mut rx_a = events.subscribe(job_a).await;
        let mut rx_b = events.subscribe(job_b).await;

        events.publish(PipelineEvent::start(job_a, Stage::Pipeline, "go")).await;

        assert_eq!(rx_a.try_recv().unwrap().job_id, job_a);
        assert!(matches!(rx_b.try_recv(), Err(TryRecvError::Empty)));
    }
}
