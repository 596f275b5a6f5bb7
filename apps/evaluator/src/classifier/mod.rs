//! Classifier: maps resume text to a best-fit job category on one site.
//!
//! Delegates to the judge with a classification prompt listing the site's
//! registered categories. An answer whose primary category does not resolve
//! against the registry is a parse failure (the next provider is tried); the
//! category is never guessed.

pub mod keywords;
pub mod prompts;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::judge::{FailureKind, JudgeError, JudgeInvoker};
use crate::llm_client::{extract_json_object, prompts::resume_block};
use crate::models::{CategoryRegistry, ClassificationResult, JobCategory};
use keywords::keyword_hints;
use prompts::{CLASSIFY_PROMPT_TEMPLATE, CLASSIFY_SYSTEM_TEMPLATE};

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("resume text is empty")]
    EmptyResume,

    #[error("site '{0}' has no registered categories")]
    UnknownSite(String),

    #[error("no provider returned a usable classification: {0}")]
    Unparseable(String),

    #[error(transparent)]
    Judge(JudgeError),
}

impl From<JudgeError> for ClassificationError {
    fn from(err: JudgeError) -> Self {
        match &err {
            JudgeError::AllProvidersExhausted(failures)
                if failures.iter().any(|f| f.kind == FailureKind::Parse) =>
            {
                ClassificationError::Unparseable(err.to_string())
            }
            _ => ClassificationError::Judge(err),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    primary_category: String,
    #[serde(default)]
    secondary_categories: Vec<String>,
    confidence: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    skills_detected: Vec<String>,
    #[serde(default)]
    experience_years: Option<f64>,
}

pub struct Classifier {
    judge: Arc<JudgeInvoker>,
    registry: Arc<CategoryRegistry>,
}

impl Classifier {
    pub fn new(judge: Arc<JudgeInvoker>, registry: Arc<CategoryRegistry>) -> Self {
        Self { judge, registry }
    }

    pub async fn classify(
        &self,
        site_id: &str,
        resume_text: &str,
        order: &[String],
    ) -> Result<ClassificationResult, ClassificationError> {
        if resume_text.trim().is_empty() {
            return Err(ClassificationError::EmptyResume);
        }
        let specs = self.registry.categories(site_id);
        if specs.is_empty() {
            return Err(ClassificationError::UnknownSite(site_id.to_string()));
        }

        let category_list = specs
            .iter()
            .map(|s| format!("- {} ({}): {}", s.code, s.label, s.description))
            .collect::<Vec<_>>()
            .join("\n");
        let category_codes = specs
            .iter()
            .map(|s| s.code.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let system = CLASSIFY_SYSTEM_TEMPLATE
            .replace("{site_id}", site_id)
            .replace("{category_list}", &category_list)
            .replace("{category_codes}", &category_codes);

        let hints = keyword_hints(resume_text, specs);
        let hints_text = if hints.is_empty() {
            "- (none)".to_string()
        } else {
            hints
                .iter()
                .map(|(code, n)| format!("- {code}: {n}"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let prompt = CLASSIFY_PROMPT_TEMPLATE
            .replace("{keyword_hints}", &hints_text)
            .replace("{resume_block}", &resume_block(resume_text));

        let registry = &self.registry;
        let judged = self
            .judge
            .invoke(&system, &prompt, order, |text| {
                parse_classification(text, registry, site_id)
            })
            .await?;

        let mut result = judged.value;
        result.provider = judged.provider;
        info!(
            "Classified resume as {} (confidence {:.2}, provider {})",
            result.primary_category, result.confidence, result.provider
        );
        Ok(result)
    }
}

/// Validates a classifier answer against the site's registry. The returned
/// result has an empty `provider`; the caller fills it in.
pub fn parse_classification(
    text: &str,
    registry: &CategoryRegistry,
    site_id: &str,
) -> Result<ClassificationResult, String> {
    let json = extract_json_object(text).ok_or("no JSON object in response")?;
    let raw: RawClassification =
        serde_json::from_str(json).map_err(|e| format!("invalid classification JSON: {e}"))?;

    let primary_category = registry
        .resolve(site_id, &raw.primary_category)
        .ok_or_else(|| format!("unknown primary category `{}`", raw.primary_category))?;

    let mut secondary_categories: Vec<JobCategory> = Vec::new();
    for name in &raw.secondary_categories {
        match registry.resolve(site_id, name) {
            Some(c) if c != primary_category && !secondary_categories.contains(&c) => {
                secondary_categories.push(c)
            }
            Some(_) => {}
            None => warn!("Dropping unknown secondary category `{name}`"),
        }
    }

    let skills_detected: BTreeSet<String> = raw
        .skills_detected
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    Ok(ClassificationResult {
        primary_category,
        secondary_categories,
        confidence: if raw.confidence.is_finite() {
            raw.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        },
        reasoning: raw.reasoning.trim().to_string(),
        skills_detected,
        experience_years: raw
            .experience_years
            .filter(|y| y.is_finite() && *y >= 0.0)
            .map(|y| y.round() as u32),
        provider: String::new(),
    })
}
