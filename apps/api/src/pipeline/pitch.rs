//! Pitch composition — drafts the outreach email for one accepted candidate.

use serde::Deserialize;
use serde_json::json;

use crate::llm_client::ModelCapability;
use crate::models::candidate::{Candidate, MatchScore};
use crate::models::job::Job;
use crate::pipeline::{prompts, StageError};

/// The draft as the model returns it, before it is stored as a pitch.
#[derive(Debug, Deserialize)]
pub struct ComposedPitch {
    pub subject: String,
    pub body: String,
}

/// Drafts a personalized pitch from the candidate's profile and their
/// match rationale.
pub async fn compose_pitch(
    model: &dyn ModelCapability,
    job: &Job,
    candidate: &Candidate,
    score: &MatchScore,
) -> Result<ComposedPitch, StageError> {
    let prompt = build_pitch_prompt(job, candidate, score);
    let value = model.complete_json(&prompt, prompts::PITCH_SYSTEM).await?;

    let pitch: ComposedPitch = serde_json::from_value(value)
        .map_err(|e| StageError::Schema(format!("pitch output: {e}")))?;

    if pitch.subject.trim().is_empty() || pitch.body.trim().is_empty() {
        return Err(StageError::Schema(
            "pitch subject and body must be non-empty".to_string(),
        ));
    }

    Ok(pitch)
}

fn build_pitch_prompt(job: &Job, candidate: &Candidate, score: &MatchScore) -> String {
    let candidate_json = json!({
        "name": candidate.name,
        "headline": candidate.headline,
        "summary": candidate.summary,
        "location": candidate.location,
        "years_experience": candidate.years_experience,
        "skills": &candidate.skills.0,
    });
    let fit_json = json!({
        "score": score.score,
        "rationale": score.rationale,
        "highlights": &score.highlights.0,
    });

    prompts::PITCH_PROMPT_TEMPLATE
        .replace("{title}", &job.title)
        .replace("{company}", job.company.as_deref().unwrap_or("the hiring team"))
        .replace("{candidate_json}", &candidate_json.to_string())
        .replace("{fit_json}", &fit_json.to_string())
}
