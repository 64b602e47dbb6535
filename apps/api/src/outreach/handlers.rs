//! HTTP handler for dispatching a staged outreach record.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::outreach::DeliveryStatus;
use crate::outreach::OutboundMessage;
use crate::state::AppState;
use crate::store::outreach as outreach_store;

// ─────────────────────────────────────────────
// Request / Response types
// ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SendOutreachRequest {
    pub outreach_id: Uuid,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct SendOutreachResponse {
    pub outreach_id: Uuid,
    pub delivery_status: DeliveryStatus,
    pub detail: String,
}

// ─────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────

/// POST /api/outreach/send
///
/// Dispatches one staged outreach record exactly once. The stored pitch is
/// only the draft; the subject and body actually sent travel in this request,
/// so reviewer edits are honored. A transport failure still resolves the
/// record (to `failed`) and is reported in the response, not as an HTTP error.
pub async fn handle_send_outreach(
    State(state): State<AppState>,
    Json(request): Json<SendOutreachRequest>,
) -> Result<Json<SendOutreachResponse>, AppError> {
    if request.subject.trim().is_empty() {
        return Err(AppError::Validation("subject cannot be empty".to_string()));
    }
    if request.body.trim().is_empty() {
        return Err(AppError::Validation("body cannot be empty".to_string()));
    }

    let row = outreach_store::load_dispatch(&state.db, request.outreach_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Outreach record {} not found", request.outreach_id))
        })?;

    if row.status != DeliveryStatus::Pending {
        return Err(AppError::Conflict(format!(
            "Outreach record {} was already dispatched",
            row.outreach_id
        )));
    }

    let message = OutboundMessage {
        to_name: row.candidate_name.clone(),
        to_email: row.candidate_email.clone(),
        from: state.config.outreach_from.clone(),
        subject: request.subject,
        body: request.body,
    };

    let (status, detail) = match state.outreach.deliver(&message).await {
        Ok(receipt) => (DeliveryStatus::Sent, receipt),
        Err(e) => {
            warn!("Delivery failed for outreach record {}: {}", row.outreach_id, e);
            (DeliveryStatus::Failed, e.to_string())
        }
    };

    // a concurrent dispatch may have resolved the record first
    if !outreach_store::complete_record(&state.db, row.outreach_id, status, &detail).await? {
        return Err(AppError::Conflict(format!(
            "Outreach record {} was already dispatched",
            row.outreach_id
        )));
    }

    if status == DeliveryStatus::Sent {
        if !outreach_store::mark_contacted(&state.db, row.candidate_id).await? {
            warn!("Candidate {} was not in accepted state after send", row.candidate_id);
        }
        info!(
            "Outreach record {} sent to {} <{}>",
            row.outreach_id, row.candidate_name, row.candidate_email
        );
    }

    Ok(Json(SendOutreachResponse {
        outreach_id: row.outreach_id,
        delivery_status: status,
        detail,
    }))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::test_pool;
    use crate::events::PipelineEvents;
    use crate::llm_client::{LlmError, ModelCapability};
    use crate::models::candidate::{Candidate, ReviewStatus};
    use crate::models::outreach::{OutreachRecord, Pitch};
    use crate::outreach::{OutreachTransport, TransportError};
    use crate::rate_limit::RateLimiter;
    use crate::store::{candidates, jobs};
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::Value;
    use sqlx::types::Json as SqlxJson;
    use std::sync::{Arc, Mutex};

    struct NoModel;

    #[async_trait]
    impl ModelCapability for NoModel {
        async fn complete_json(&self, _prompt: &str, _system: &str) -> Result<Value, LlmError> {
            Err(LlmError::EmptyContent)
        }
    }

    /// Captures delivered messages; optionally refuses every delivery.
    struct RecordingTransport {
        sent: Mutex<Vec<OutboundMessage>>,
        fail: bool,
    }

    impl RecordingTransport {
        fn new(fail: bool) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl OutreachTransport for RecordingTransport {
        async fn deliver(&self, message: &OutboundMessage) -> Result<String, TransportError> {
            if self.fail {
                return Err(TransportError::Delivery("smtp refused".to_string()));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok("queued".to_string())
        }
    }

    async fn make_state(transport: Arc<RecordingTransport>) -> AppState {
        AppState {
            db: test_pool().await,
            config: Config::for_tests(),
            model: Arc::new(NoModel),
            outreach: transport,
            progress: PipelineEvents::new(),
            limits: RateLimiter::new(),
        }
    }

    /// Seeds job -> accepted candidate -> pitch -> pending outreach record.
    async fn seed_dispatch(state: &AppState) -> (Uuid, Uuid) {
        let job = jobs::create(&state.db, "Backend Engineer", Some("Acme"), "Own the core services.")
            .await
            .unwrap();
        let candidate = Candidate {
            id: Uuid::new_v4(),
            job_id: job.id,
            name: "Ada One".to_string(),
            headline: "Senior Backend Engineer".to_string(),
            summary: "Builds reliable distributed systems.".to_string(),
            email: "ada.one@mailfort.example".to_string(),
            profile_url: None,
            location: "Berlin, Germany".to_string(),
            years_experience: 7,
            skills: SqlxJson(vec!["Rust".to_string()]),
            review_status: ReviewStatus::Accepted,
            created_at: Utc::now(),
        };
        candidates::insert_batch(&state.db, &[candidate.clone()]).await.unwrap();

        let pitch = Pitch {
            id: Uuid::new_v4(),
            candidate_id: candidate.id,
            subject: "Your distributed systems work".to_string(),
            body: "Hi Ada, your migration story caught our eye.".to_string(),
            created_at: Utc::now(),
        };
        let record = OutreachRecord {
            id: Uuid::new_v4(),
            pitch_id: pitch.id,
            status: DeliveryStatus::Pending,
            detail: None,
            created_at: Utc::now(),
        };
        outreach_store::stage_outreach(&state.db, &pitch, &record).await.unwrap();

        (candidate.id, record.id)
    }

    #[tokio::test]
    async fn test_send_marks_sent_and_contacted() {
        let transport = Arc::new(RecordingTransport::new(false));
        let state = make_state(transport.clone()).await;
        let (candidate_id, outreach_id) = seed_dispatch(&state).await;

        let request = SendOutreachRequest {
            outreach_id,
            subject: "Edited subject".to_string(),
            body: "Edited body with a personal touch.".to_string(),
        };
        let response = handle_send_outreach(State(state.clone()), Json(request)).await.unwrap();
        assert_eq!(response.delivery_status, DeliveryStatus::Sent);
        assert_eq!(response.detail, "queued");

        // the edited copy went out, addressed from the configured sender
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Edited subject");
        assert_eq!(sent[0].to_email, "ada.one@mailfort.example");
        assert_eq!(sent[0].from, state.config.outreach_from);
        drop(sent);

        assert_eq!(
            candidates::get(&state.db, candidate_id).await.unwrap().unwrap().review_status,
            ReviewStatus::Contacted
        );
        let row = outreach_store::load_dispatch(&state.db, outreach_id).await.unwrap().unwrap();
        assert_eq!(row.status, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn test_second_send_conflicts() {
        let transport = Arc::new(RecordingTransport::new(false));
        let state = make_state(transport).await;
        let (_, outreach_id) = seed_dispatch(&state).await;

        let request = SendOutreachRequest {
            outreach_id,
            subject: "Subject".to_string(),
            body: "Body.".to_string(),
        };
        handle_send_outreach(State(state.clone()), Json(request)).await.unwrap();

        let retry = SendOutreachRequest {
            outreach_id,
            subject: "Subject".to_string(),
            body: "Body.".to_string(),
        };
        let result = handle_send_outreach(State(state), Json(retry)).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_failed_delivery_resolves_record() {
        let transport = Arc::new(RecordingTransport::new(true));
        let state = make_state(transport).await;
        let (candidate_id, outreach_id) = seed_dispatch(&state).await;

        let request = SendOutreachRequest {
            outreach_id,
            subject: "Subject".to_string(),
            body: "Body.".to_string(),
        };
        let response = handle_send_outreach(State(state.clone()), Json(request)).await.unwrap();
        assert_eq!(response.delivery_status, DeliveryStatus::Failed);
        assert_eq!(response.detail, "delivery failed: smtp refused");

        // the candidate stays accepted and the record will not dispatch again
        assert_eq!(
            candidates::get(&state.db, candidate_id).await.unwrap().unwrap().review_status,
            ReviewStatus::Accepted
        );
        let retry = SendOutreachRequest {
            outreach_id,
            subject: "Subject".to_string(),
            body: "Body.".to_string(),
        };
        let result = handle_send_outreach(State(state), Json(retry)).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_send_unknown_record() {
        let transport = Arc::new(RecordingTransport::new(false));
        let state = make_state(transport).await;

        let request = SendOutreachRequest {
            outreach_id: Uuid::new_v4(),
            subject: "Subject".to_string(),
            body: "Body.".to_string(),
        };
        let result = handle_send_outreach(State(state), Json(request)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_send_rejects_blank_subject() {
        let transport = Arc::new(RecordingTransport::new(false));
        let state = make_state(transport).await;
        let (_, outreach_id) = seed_dispatch(&state).await;

        let request = SendOutreachRequest {
            outreach_id,
            subject: "  ".to_string(),
            body: "Body.".to_string(),
        };
        let result = handle_send_outreach(State(state), Json(request)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
