// Prompt constants for resume classification.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt. Replace `{site_id}`, `{category_list}`, `{category_codes}`.
pub const CLASSIFY_SYSTEM_TEMPLATE: &str = r#"You are an experienced technical recruiter. Classify the candidate's resume into the job categories used by {site_id}.

## Categories
{category_list}

## Rules
1. Pick the single best-fit primary category from the candidate's main stack and recent experience.
2. Add further plausible categories to secondary_categories, best first. Leave it empty if none fit.
3. confidence is a number between 0.0 and 1.0.
4. Estimate total professional experience in years; use null when the resume does not make it clear.
5. Category values MUST be one of: {category_codes}

Respond with valid JSON only, using this EXACT schema:
{
  "primary_category": "backend",
  "secondary_categories": ["fullstack"],
  "confidence": 0.85,
  "reasoning": "Five years of Java/Spring server work, MSA design ...",
  "skills_detected": ["Java", "Spring Boot", "Kubernetes", "MySQL"],
  "experience_years": 5
}"#;

/// User prompt. Replace `{keyword_hints}` and `{resume_block}`.
pub const CLASSIFY_PROMPT_TEMPLATE: &str = "\
Classify the following resume.

Keyword hints (counts of known category keywords found in the text; advisory only):
{keyword_hints}

{resume_block}";
