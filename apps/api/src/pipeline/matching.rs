//! Matching stage — scores sourced candidates against the job description.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::types::Json;

use crate::llm_client::ModelCapability;
use crate::models::candidate::{Candidate, MatchScore};
use crate::models::job::Job;
use crate::pipeline::{prompts, StageError};

/// Candidates scored per model call.
pub const MATCHING_CHUNK: usize = 5;

/// One score as the model returns it, keyed by list position.
#[derive(Debug, Deserialize)]
struct ScoredEntry {
    index: usize,
    score: f64,
    rationale: String,
    highlights: Vec<String>,
}

/// Scores every candidate in the slice with one model call.
///
/// The reply must cover each candidate exactly once with a finite score in
/// [0, 100]; anything else fails the stage rather than being clamped.
pub async fn score_candidates(
    model: &dyn ModelCapability,
    job: &Job,
    candidates: &[Candidate],
) -> Result<Vec<MatchScore>, StageError> {
    let prompt = build_matching_prompt(job, candidates);
    let value = model.complete_json(&prompt, prompts::MATCHING_SYSTEM).await?;

    let entries: Vec<ScoredEntry> = serde_json::from_value(value)
        .map_err(|e| StageError::Schema(format!("matching output: {e}")))?;

    if entries.len() != candidates.len() {
        return Err(StageError::Schema(format!(
            "matching returned {} scores for {} candidates",
            entries.len(),
            candidates.len()
        )));
    }

    let mut seen = vec![false; candidates.len()];
    let mut scores = Vec::with_capacity(entries.len());

    for entry in entries {
        let candidate = candidates.get(entry.index).ok_or_else(|| {
            StageError::Schema(format!("matching index {} out of range", entry.index))
        })?;
        if seen[entry.index] {
            return Err(StageError::Schema(format!(
                "matching scored index {} twice",
                entry.index
            )));
        }
        seen[entry.index] = true;

        if !entry.score.is_finite() || !(0.0..=100.0).contains(&entry.score) {
            return Err(StageError::Schema(format!(
                "score {} for '{}' is outside 0-100",
                entry.score, candidate.name
            )));
        }

        scores.push(MatchScore {
            candidate_id: candidate.id,
            score: entry.score,
            rationale: entry.rationale,
            highlights: Json(entry.highlights),
            created_at: Utc::now(),
        });
    }

    Ok(scores)
}

fn build_matching_prompt(job: &Job, candidates: &[Candidate]) -> String {
    let entries: Vec<Value> = candidates
        .iter()
        .enumerate()
        .map(|(index, c)| {
            json!({
                "index": index,
                "name": c.name,
                "headline": c.headline,
                "summary": c.summary,
                "location": c.location,
                "years_experience": c.years_experience,
                "skills": &c.skills.0,
            })
        })
        .collect();

    prompts::MATCHING_PROMPT_TEMPLATE
        .replace("{title}", &job.title)
        .replace("{description}", &job.description)
        .replace("{candidates_json}", &Value::Array(entries).to_string())
}
