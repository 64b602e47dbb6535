//! Sourcing stage — generates fictional candidate profiles for one job.

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::types::Json;
use uuid::Uuid;

use crate::llm_client::ModelCapability;
use crate::models::candidate::{Candidate, ReviewStatus};
use crate::models::job::Job;
use crate::pipeline::{prompts, StageError};

/// Profiles requested per model call. The orchestrator loops in chunks of
/// this size until the batch target is met.
pub const SOURCING_CHUNK: usize = 5;

/// One profile as the model returns it, before it becomes a stored candidate.
#[derive(Debug, Deserialize)]
pub struct GeneratedProfile {
    pub name: String,
    pub headline: String,
    pub summary: String,
    pub email: String,
    pub profile_url: Option<String>,
    pub location: String,
    pub years_experience: i64,
    pub skills: Vec<String>,
}

impl GeneratedProfile {
    pub fn into_candidate(self, job_id: Uuid) -> Candidate {
        Candidate {
            id: Uuid::new_v4(),
            job_id,
            name: self.name,
            headline: self.headline,
            summary: self.summary,
            email: self.email,
            profile_url: self.profile_url,
            location: self.location,
            years_experience: self.years_experience,
            skills: Json(self.skills),
            review_status: ReviewStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Asks the model for `count` new profiles, steering it away from names the
/// job already has. Extra profiles beyond `count` are discarded.
pub async fn generate_profiles(
    model: &dyn ModelCapability,
    job: &Job,
    count: usize,
    avoid_names: &[String],
) -> Result<Vec<GeneratedProfile>, StageError> {
    let prompt = build_sourcing_prompt(job, count, avoid_names);
    let value = model.complete_json(&prompt, prompts::SOURCING_SYSTEM).await?;

    let mut profiles: Vec<GeneratedProfile> = serde_json::from_value(value)
        .map_err(|e| StageError::Schema(format!("sourcing output: {e}")))?;

    if profiles.is_empty() {
        return Err(StageError::Schema("sourcing returned no profiles".to_string()));
    }

    profiles.truncate(count);
    Ok(profiles)
}

fn build_sourcing_prompt(job: &Job, count: usize, avoid_names: &[String]) -> String {
    prompts::SOURCING_PROMPT_TEMPLATE
        .replace("{count}", &count.to_string())
        .replace("{title}", &job.title)
        .replace("{company}", job.company.as_deref().unwrap_or("not disclosed"))
        .replace("{description}", &job.description)
        .replace("{avoid_names}", &json!(avoid_names).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use crate::models::job::PipelineStatus;
    use async_trait::async_trait;
    use serde_json::Value;

    struct FixedModel(Value);

    #[async_trait]
    impl ModelCapability for FixedModel {
        async fn complete_json(&self, _prompt: &str, _system: &str) -> Result<Value, LlmError> {
            Ok(self.0.clone())
        }
    }

    fn make_job() -> Job {
        Job {
            id: Uuid::new_v4(),
            title: "Backend Engineer".to_string(),
            company: Some("Acme".to_string()),
            description: "Own the core services.".to_string(),
            pipeline_status: PipelineStatus::Sourcing,
            created_at: Utc::now(),
        }
    }

    fn profile_json(name: &str) -> Value {
        json!({
            "name": name,
            "headline": "Senior Backend Engineer",
            "summary": "Builds reliable distributed systems.",
            "email": "candidate@mailfort.example",
            "profile_url": "https://linkedin.com/in/fict",
            "location": "Berlin, Germany",
            "years_experience": 7,
            "skills": ["Rust", "PostgreSQL", "Kafka", "Kubernetes"]
        })
    }

    #[tokio::test]
    async fn test_generate_profiles_parses_batch() {
        let model = FixedModel(json!([profile_json("Ada One"), profile_json("Ben Two")]));
        let job = make_job();

        let profiles = generate_profiles(&model, &job, 2, &[]).await.unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].name, "Ada One");
        assert_eq!(profiles[0].years_experience, 7);

        let candidate = profiles.into_iter().next().unwrap().into_candidate(job.id);
        assert_eq!(candidate.job_id, job.id);
        assert_eq!(candidate.review_status, ReviewStatus::Pending);
        assert_eq!(candidate.skills.0.len(), 4);
    }

    #[tokio::test]
    async fn test_generate_profiles_rejects_missing_fields() {
        let model = FixedModel(json!([{"name": "Ada One"}]));
        let job = make_job();

        let err = generate_profiles(&model, &job, 1, &[]).await.unwrap_err();
        assert!(matches!(err, StageError::Schema(_)));
    }

    #[tokio::test]
    async fn test_generate_profiles_rejects_empty_batch() {
        let model = FixedModel(json!([]));
        let job = make_job();

        let err = generate_profiles(&model, &job, 3, &[]).await.unwrap_err();
        assert!(matches!(err, StageError::Schema(_)));
    }

    #[tokio::test]
    async fn test_generate_profiles_truncates_extras() {
        let model = FixedModel(json!([
            profile_json("Ada One"),
            profile_json("Ben Two"),
            profile_json("Cy Three")
        ]));
        let job = make_job();

        let profiles = generate_profiles(&model, &job, 2, &[]).await.unwrap();
        assert_eq!(profiles.len(), 2);
    }

    #[test]
    fn test_prompt_lists_avoided_names() {
        let job = make_job();
        let avoid = vec!["Mara Lindqvist".to_string(), "Ada One".to_string()];

        let prompt = build_sourcing_prompt(&job, 5, &avoid);
        assert!(prompt.contains("Generate exactly 5 fictional candidate profiles"));
        assert!(prompt.contains("Backend Engineer"));
        assert!(prompt.contains("Acme"));
        assert!(prompt.contains(r#"["Mara Lindqvist","Ada One"]"#));
    }

    #[test]
    fn test_prompt_handles_undisclosed_company() {
        let mut job = make_job();
        job.company = None;

        let prompt = build_sourcing_prompt(&job, 5, &[]);
        assert!(prompt.contains("COMPANY: not disclosed"));
    }
}
