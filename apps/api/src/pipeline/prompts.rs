// All LLM prompt constants for the pipeline stages.
// Each stage builds its prompt from a template here and parses the JSON reply.

/// System prompt for candidate sourcing — enforces JSON-only output.
pub const SOURCING_SYSTEM: &str =
    "You are an expert technical sourcer generating realistic but entirely fictional \
    candidate profiles for a hiring simulation. \
    You MUST respond with valid JSON only — a JSON array of profile objects. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Sourcing prompt template.
/// Replace: {count}, {title}, {company}, {description}, {avoid_names}
pub const SOURCING_PROMPT_TEMPLATE: &str = r#"Generate exactly {count} fictional candidate profiles for the following role.

ROLE: {title}
COMPANY: {company}

JOB DESCRIPTION:
{description}

Return a JSON ARRAY with this EXACT schema per profile (no extra fields):
[
  {
    "name": "Mara Lindqvist",
    "headline": "Staff Backend Engineer at a fintech scale-up",
    "summary": "Nine years building payment infrastructure in Rust and Go. Led the migration of a monolith to event-driven services handling 40k tps.",
    "email": "mara.lindqvist@mailfort.example",
    "profile_url": "https://linkedin.com/in/mara-lindqvist-fict",
    "location": "Stockholm, Sweden",
    "years_experience": 9,
    "skills": ["Rust", "Go", "Kafka", "PostgreSQL", "Kubernetes"]
  }
]

HARD RULES:
1. Every profile is a FICTIONAL person — never a real, identifiable individual
2. Vary seniority and background across the batch; not everyone is a perfect fit
3. `years_experience` must be consistent with the headline and summary
4. `skills` lists 4 to 8 concrete technologies drawn from the summary
5. Use fictional email domains (.example or invented companies), never real providers
6. Do NOT reuse any of these already-sourced names: {avoid_names}"#;

/// System prompt for candidate matching — enforces JSON-only output.
pub const MATCHING_SYSTEM: &str =
    "You are an expert technical recruiter assessing candidate fit against a job description. \
    You MUST respond with valid JSON only — a JSON array of score objects. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Matching prompt template.
/// Replace: {title}, {description}, {candidates_json}
pub const MATCHING_PROMPT_TEMPLATE: &str = r#"Score each candidate below against the following role.

ROLE: {title}

JOB DESCRIPTION:
{description}

CANDIDATES (score every one, keyed by `index`):
{candidates_json}

Return a JSON ARRAY with this EXACT schema per candidate (no extra fields):
[
  {
    "index": 0,
    "score": 87.5,
    "rationale": "Two sentences on why this candidate does or does not fit the role.",
    "highlights": ["9 years of payment infrastructure", "Led a monolith to services migration"]
  }
]

HARD RULES:
1. `index` refers to the candidate's position in the list above, starting at 0
2. Return EXACTLY one entry per candidate — never skip, never duplicate an index
3. `score` is 0 to 100; use the full range, a mediocre fit is a mediocre score
4. `highlights` lists 2 to 4 short quotable strengths taken from the profile
5. Judge only the stated facts of the profile — do not infer unstated experience"#;

/// System prompt for pitch composition — enforces JSON-only output.
pub const PITCH_SYSTEM: &str =
    "You are an expert recruiter writing a personal outreach message to one candidate. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Pitch prompt template.
/// Replace: {title}, {company}, {candidate_json}, {fit_json}
pub const PITCH_PROMPT_TEMPLATE: &str = r#"Write a personalized outreach email inviting the candidate below to talk about the role.

ROLE: {title}
COMPANY: {company}

CANDIDATE:
{candidate_json}

WHY THEY FIT (from our screening):
{fit_json}

Return a JSON object with this EXACT schema (no extra fields):
{
  "subject": "Your payment infrastructure work",
  "body": "Hi Mara, ..."
}

HARD RULES:
1. Open with something specific to THIS candidate; never a generic greeting line
2. Two short paragraphs plus a one-line call to action, under 160 words total
3. Plain text only — no markdown, no placeholders left in the body
4. Warm and direct; do not oversell or invent details about the role
5. Sign off on behalf of {company}"#;
