//! Pitches and outreach delivery records.
//!
//! Accepting a candidate stores a pitch and a pending outreach record in the
//! same breath; dispatch later resolves that record to sent or failed exactly
//! once.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::outreach::{DeliveryStatus, OutreachRecord, Pitch};

/// Stores a pitch and its pending outreach record in one transaction. The
/// pitch's candidate slot is UNIQUE, so a pitch left behind without its
/// record would make every accept retry for that candidate fail.
pub async fn stage_outreach(
    pool: &SqlitePool,
    pitch: &Pitch,
    record: &OutreachRecord,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO pitches (id, candidate_id, subject, body, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(pitch.id)
    .bind(pitch.candidate_id)
    .bind(&pitch.subject)
    .bind(&pitch.body)
    .bind(pitch.created_at)
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        r#"
        INSERT INTO outreach_records (id, pitch_id, status, detail, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id)
    .bind(record.pitch_id)
    .bind(record.status)
    .bind(record.detail.as_deref())
    .bind(record.created_at)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(())
}

/// Everything the dispatcher needs to address one outreach record.
#[derive(Debug, sqlx::FromRow)]
pub struct DispatchRow {
    pub outreach_id: Uuid,
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub candidate_email: String,
    pub status: DeliveryStatus,
}

pub async fn load_dispatch(
    pool: &SqlitePool,
    outreach_id: Uuid,
) -> Result<Option<DispatchRow>, sqlx::Error> {
    sqlx::query_as::<_, DispatchRow>(
        r#"
        SELECT o.id AS outreach_id, p.candidate_id,
               c.name AS candidate_name, c.email AS candidate_email, o.status
        FROM outreach_records o
        JOIN pitches p ON p.id = o.pitch_id
        JOIN candidates c ON c.id = p.candidate_id
        WHERE o.id = ?
        "#,
    )
    .bind(outreach_id)
    .fetch_optional(pool)
    .await
}

/// Resolves a pending record to its final delivery status. Returns false when
/// the record was already resolved, so a record is dispatched at most once.
pub async fn complete_record(
    pool: &SqlitePool,
    outreach_id: Uuid,
    status: DeliveryStatus,
    detail: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE outreach_records SET status = ?, detail = ? WHERE id = ? AND status = 'pending'",
    )
    .bind(status)
    .bind(detail)
    .bind(outreach_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Moves an accepted candidate to `contacted` after a successful send.
pub async fn mark_contacted(pool: &SqlitePool, candidate_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE candidates SET review_status = 'contacted' WHERE id = ? AND review_status = 'accepted'",
    )
    .bind(candidate_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::candidate::{Candidate, ReviewStatus};
    use crate::store::{candidates, jobs};
    use chrono::Utc;
    use sqlx::types::Json;

    struct Seeded {
        candidate: Candidate,
        record: OutreachRecord,
    }

    /// Seeds job -> candidate -> pitch -> pending outreach record.
    async fn seed_chain(pool: &SqlitePool, review_status: ReviewStatus) -> Seeded {
        let job = jobs::create(pool, "Backend Engineer", Some("Acme"), "Own the core services.")
            .await
            .unwrap();
        let candidate = Candidate {
            id: Uuid::new_v4(),
            job_id: job.id,
            name: "Ada One".to_string(),
            headline: "Senior Backend Engineer".to_string(),
            summary: "Builds reliable distributed systems.".to_string(),
            email: "ada.one@example.com".to_string(),
            profile_url: None,
            location: "Berlin, Germany".to_string(),
            years_experience: 7,
            skills: Json(vec!["Rust".to_string()]),
            review_status,
            created_at: Utc::now(),
        };
        candidates::insert_batch(pool, &[candidate.clone()]).await.unwrap();

        let pitch = Pitch {
            id: Uuid::new_v4(),
            candidate_id: candidate.id,
            subject: "Your distributed systems work".to_string(),
            body: "Hi Ada, your background caught our eye.".to_string(),
            created_at: Utc::now(),
        };
        let record = OutreachRecord {
            id: Uuid::new_v4(),
            pitch_id: pitch.id,
            status: DeliveryStatus::Pending,
            detail: None,
            created_at: Utc::now(),
        };
        stage_outreach(pool, &pitch, &record).await.unwrap();

        Seeded { candidate, record }
    }

    #[tokio::test]
    async fn test_stage_outreach_rolls_back_the_pitch() {
        let pool = test_pool().await;
        let job = jobs::create(&pool, "Backend Engineer", None, "Own the core services.")
            .await
            .unwrap();
        let candidate = Candidate {
            id: Uuid::new_v4(),
            job_id: job.id,
            name: "Ada One".to_string(),
            headline: "Senior Backend Engineer".to_string(),
            summary: "Builds reliable distributed systems.".to_string(),
            email: "ada.one@example.com".to_string(),
            profile_url: None,
            location: "Berlin, Germany".to_string(),
            years_experience: 7,
            skills: Json(vec!["Rust".to_string()]),
            review_status: ReviewStatus::Accepted,
            created_at: Utc::now(),
        };
        candidates::insert_batch(&pool, &[candidate.clone()]).await.unwrap();

        let pitch = Pitch {
            id: Uuid::new_v4(),
            candidate_id: candidate.id,
            subject: "Subject".to_string(),
            body: "Body.".to_string(),
            created_at: Utc::now(),
        };
        let record = OutreachRecord {
            id: Uuid::new_v4(),
            pitch_id: pitch.id,
            status: DeliveryStatus::Pending,
            detail: None,
            created_at: Utc::now(),
        };

        // sabotage the record insert; the pitch insert must roll back with it
        sqlx::query("DROP TABLE outreach_records").execute(&pool).await.unwrap();
        assert!(stage_outreach(&pool, &pitch, &record).await.is_err());

        crate::db::init_schema(&pool).await.unwrap();
        let pitches: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pitches WHERE candidate_id = ?")
            .bind(candidate.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(pitches, 0);

        // with no orphaned pitch the retry goes through
        stage_outreach(&pool, &pitch, &record).await.unwrap();
        let row = load_dispatch(&pool, record.id).await.unwrap().expect("row");
        assert_eq!(row.status, DeliveryStatus::Pending);
    }

    #[tokio::test]
    async fn test_load_dispatch_joins_candidate() {
        let pool = test_pool().await;
        let seeded = seed_chain(&pool, ReviewStatus::Accepted).await;

        let row = load_dispatch(&pool, seeded.record.id).await.unwrap().expect("row");
        assert_eq!(row.outreach_id, seeded.record.id);
        assert_eq!(row.candidate_id, seeded.candidate.id);
        assert_eq!(row.candidate_name, "Ada One");
        assert_eq!(row.candidate_email, "ada.one@example.com");
        assert_eq!(row.status, DeliveryStatus::Pending);

        assert!(load_dispatch(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_complete_record_resolves_once() {
        let pool = test_pool().await;
        let seeded = seed_chain(&pool, ReviewStatus::Accepted).await;

        assert!(
            complete_record(&pool, seeded.record.id, DeliveryStatus::Sent, "delivered to console")
                .await
                .unwrap()
        );

        // already resolved, a second attempt does not fire
        assert!(
            !complete_record(&pool, seeded.record.id, DeliveryStatus::Failed, "late failure")
                .await
                .unwrap()
        );

        let row = load_dispatch(&pool, seeded.record.id).await.unwrap().expect("row");
        assert_eq!(row.status, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn test_mark_contacted_requires_accepted() {
        let pool = test_pool().await;
        let accepted = seed_chain(&pool, ReviewStatus::Accepted).await;
        assert!(mark_contacted(&pool, accepted.candidate.id).await.unwrap());
        let status = candidates::get(&pool, accepted.candidate.id)
            .await
            .unwrap()
            .unwrap()
            .review_status;
        assert_eq!(status, ReviewStatus::Contacted);

        // only accepted candidates move to contacted
        let pending = seed_chain(&pool, ReviewStatus::Pending).await;
        assert!(!mark_contacted(&pool, pending.candidate.id).await.unwrap());
    }
}
