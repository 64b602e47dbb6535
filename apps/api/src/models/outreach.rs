use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Delivery lifecycle of an outreach record. `pending` flips exactly once
/// to `sent` or `failed` when the dispatch attempt completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

/// The outreach message composed for one accepted candidate.
///
/// Immutable once written; the subject/body actually delivered may still be
/// edited by the caller at send time without touching this record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pitch {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// One dispatch attempt for a pitch. `detail` carries the transport receipt
/// on success or the failure reason, written together with the status flip.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OutreachRecord {
    pub id: Uuid,
    pub pitch_id: Uuid,
    pub status: DeliveryStatus,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}
