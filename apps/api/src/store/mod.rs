//! Review store — the single source of truth for jobs, candidates, scores,
//! pitches and outreach records. Every SQL statement in the service lives
//! in this module tree; everything else coordinates through it.

pub mod candidates;
pub mod jobs;
pub mod outreach;
