use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Candidate review state machine.
///
/// `pending → viewed → {accepted | rejected}`, and `accepted → contacted`
/// after a successful outreach send. Serving the same undecided candidate
/// for review twice is harmless; `accepted`, `rejected` and `contacted`
/// are write-once for the review interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Viewed,
    Accepted,
    Rejected,
    Contacted,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Viewed => "viewed",
            ReviewStatus::Accepted => "accepted",
            ReviewStatus::Rejected => "rejected",
            ReviewStatus::Contacted => "contacted",
        }
    }

    /// Parses a status path segment. Returns `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ReviewStatus::Pending),
            "viewed" => Some(ReviewStatus::Viewed),
            "accepted" => Some(ReviewStatus::Accepted),
            "rejected" => Some(ReviewStatus::Rejected),
            "contacted" => Some(ReviewStatus::Contacted),
            _ => None,
        }
    }
}

/// A sourced candidate profile owned by exactly one job.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Candidate {
    pub id: Uuid,
    pub job_id: Uuid,
    pub name: String,
    pub headline: String,
    pub summary: String,
    pub email: String,
    pub profile_url: Option<String>,
    pub location: String,
    pub years_experience: i64,
    pub skills: Json<Vec<String>>,
    pub review_status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

/// The fit assessment the matching stage attaches to a candidate.
/// At most one per candidate; immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MatchScore {
    pub candidate_id: Uuid,
    pub score: f64,
    pub rationale: String,
    pub highlights: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// A candidate joined with its match score, as served to reviewers.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CandidateWithScore {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub candidate: Candidate,
    pub score: f64,
    pub rationale: String,
    pub highlights: Json<Vec<String>>,
}

/// Per-job candidate counts by review status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReviewStats {
    pub total: i64,
    pub pending: i64,
    pub viewed: i64,
    pub accepted: i64,
    pub rejected: i64,
    pub contacted: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_status_round_trips_through_strings() {
        let all = [
            ReviewStatus::Pending,
            ReviewStatus::Viewed,
            ReviewStatus::Accepted,
            ReviewStatus::Rejected,
            ReviewStatus::Contacted,
        ];
        for status in all {
            assert_eq!(ReviewStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_review_status_parse_rejects_unknown() {
        assert_eq!(ReviewStatus::parse("archived"), None);
        assert_eq!(ReviewStatus::parse(""), None);
        assert_eq!(ReviewStatus::parse("Accepted"), None);
    }

    #[test]
    fn test_review_status_serde_matches_as_str() {
        let json = serde_json::to_string(&ReviewStatus::Contacted).unwrap();
        assert_eq!(json, format!("\"{}\"", ReviewStatus::Contacted.as_str()));
    }
}
