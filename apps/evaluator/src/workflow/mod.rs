//! Evaluation Orchestrator: sequences the pipeline for one resume.
//!
//! Flow: INIT → CLASSIFY → SCRAPE_OR_CACHE → AGGREGATE → BUILD_PROMPT →
//!       JUDGE → ASSEMBLE → DONE, with any stage able to fail.
//!
//! Stage-local failures with a fallback are absorbed here (stale cache after
//! a failed scrape, full posting set when a company has no postings, first
//! allowed category when the classifier's picks are filtered out). Anything
//! else surfaces as a [`StageFailure`] naming the stage, plus the
//! classification when one was already obtained.
//!
//! Every stage is safe to re-enter: the posting cache is only ever replaced
//! whole, and the prompt cache rebuilds only on a hash change.

pub mod batch;
pub mod matching;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::aggregate::{aggregate, DEFAULT_MAX_QUOTES};
use crate::classifier::Classifier;
use crate::config::WorkflowConfig;
use crate::errors::EvalError;
use crate::judge::JudgeInvoker;
use crate::models::{
    CategoryRegistry, ClassificationResult, EvaluationResult, JobCategory, PostingSet,
};
use crate::prompt::{PromptBuilder, PromptCache, PromptKey};
use crate::resume::load_resume;
use crate::site::{AdapterRegistry, ScrapeError};
use crate::store::FingerprintedJobStore;
use batch::{BatchController, BatchReport, ItemOutcome};
use matching::{recommend, MAX_RECOMMENDATIONS};

// ────────────────────────────────────────────────────────────────────────────
// Stages and outcomes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Classify,
    ScrapeOrCache,
    Aggregate,
    BuildPrompt,
    Judge,
    Assemble,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::Classify => "classify",
            Stage::ScrapeOrCache => "scrape_or_cache",
            Stage::Aggregate => "aggregate",
            Stage::BuildPrompt => "build_prompt",
            Stage::Judge => "judge",
            Stage::Assemble => "assemble",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// The FAILED state: where it happened, why, and what had been obtained.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub error: EvalError,
    pub classification: Option<ClassificationResult>,
}

impl StageFailure {
    fn new(stage: Stage, error: impl Into<EvalError>) -> Self {
        Self {
            stage,
            error: error.into(),
            classification: None,
        }
    }

    fn with_partial(mut self, classification: &ClassificationResult) -> Self {
        self.classification = Some(classification.clone());
        self
    }

    fn is_no_postings(&self) -> bool {
        matches!(self.error, EvalError::Scrape(ScrapeError::NoPostings(_)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostingsSource {
    Cache,
    Scraped,
    /// A rescrape failed and the previously cached set was used.
    StaleCache,
}

/// The DONE state.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub evaluation: EvaluationResult,
    pub classification: ClassificationResult,
    pub category: JobCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Postings the prompt was built from (after any company filter).
    pub postings_considered: usize,
    pub postings_source: PostingsSource,
    pub content_hash: String,
    pub prompt_reused: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MultiCategoryReport {
    pub classification: ClassificationResult,
    pub categories: Vec<JobCategory>,
    pub batch: BatchReport<EvaluationReport>,
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

pub struct Orchestrator {
    config: WorkflowConfig,
    registry: Arc<CategoryRegistry>,
    adapters: AdapterRegistry,
    prompt_builder: Arc<dyn PromptBuilder>,
    store: FingerprintedJobStore,
    prompt_cache: PromptCache,
    judge: Arc<JudgeInvoker>,
    classifier: Classifier,
}

impl Orchestrator {
    pub fn new(
        config: WorkflowConfig,
        registry: Arc<CategoryRegistry>,
        adapters: AdapterRegistry,
        prompt_builder: Arc<dyn PromptBuilder>,
        store: FingerprintedJobStore,
        judge: Arc<JudgeInvoker>,
    ) -> Self {
        let classifier = Classifier::new(judge.clone(), registry.clone());
        Self {
            config,
            registry,
            adapters,
            prompt_builder,
            store,
            prompt_cache: PromptCache::new(),
            judge,
            classifier,
        }
    }

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.judge.provider_names()
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    pub async fn cached_prompt_count(&self) -> usize {
        self.prompt_cache.len().await
    }

    pub async fn load_resume_text(&self, path: &Path) -> Result<String, StageFailure> {
        info!("Stage {}: loading resume {}", Stage::Init, path.display());
        load_resume(path)
            .await
            .map_err(|e| StageFailure::new(Stage::Init, e))
    }

    pub async fn classify_text(&self, resume_text: &str) -> Result<ClassificationResult, StageFailure> {
        info!("Stage {}: classifying resume ({} chars)", Stage::Classify, resume_text.len());
        self.classifier
            .classify(&self.config.site_id, resume_text, &self.config.provider_order)
            .await
            .map_err(|e| StageFailure::new(Stage::Classify, e))
    }

    /// Loads, classifies, and evaluates a resume file. `categories` narrows
    /// the allowed categories; when absent the configured filters apply.
    pub async fn evaluate_resume_file(
        &self,
        path: &Path,
        categories: Option<&[String]>,
    ) -> Result<EvaluationReport, StageFailure> {
        let text = self.load_resume_text(path).await?;
        self.evaluate_resume_text(&text, categories).await
    }

    pub async fn evaluate_resume_text(
        &self,
        resume_text: &str,
        categories: Option<&[String]>,
    ) -> Result<EvaluationReport, StageFailure> {
        let allow = self
            .allowed_categories(categories)
            .map_err(|e| StageFailure::new(Stage::Init, e))?;
        let classification = self.classify_text(resume_text).await?;
        let category = self.choose_category(&classification, &allow);
        self.evaluate_category(resume_text, &classification, category, None)
            .await
    }

    /// Evaluates against one company's postings within the resume's category.
    pub async fn evaluate_for_company(
        &self,
        path: &Path,
        company: &str,
    ) -> Result<EvaluationReport, StageFailure> {
        let text = self.load_resume_text(path).await?;
        self.evaluate_text_for_company(&text, company).await
    }

    pub async fn evaluate_text_for_company(
        &self,
        resume_text: &str,
        company: &str,
    ) -> Result<EvaluationReport, StageFailure> {
        let allow = self
            .allowed_categories(None)
            .map_err(|e| StageFailure::new(Stage::Init, e))?;
        let classification = self.classify_text(resume_text).await?;
        let category = self.choose_category(&classification, &allow);
        self.evaluate_category(resume_text, &classification, category, Some(company))
            .await
    }

    /// Classifies once, then evaluates every candidate category through the
    /// batch controller. A category with no postings is reported as skipped.
    pub async fn evaluate_across_categories(
        self: Arc<Self>,
        resume_text: String,
        categories: Option<Vec<String>>,
    ) -> Result<MultiCategoryReport, StageFailure> {
        let classification = self.classify_text(&resume_text).await?;

        let targets = match categories.as_deref() {
            Some(requested) if !requested.is_empty() => self
                .allowed_categories(Some(requested))
                .map_err(|e| StageFailure::new(Stage::Init, e).with_partial(&classification))?,
            _ => {
                let allow = self
                    .allowed_categories(None)
                    .map_err(|e| StageFailure::new(Stage::Init, e).with_partial(&classification))?;
                let ranked: Vec<JobCategory> = classification
                    .ranked_categories()
                    .into_iter()
                    .filter(|c| allow.is_empty() || allow.contains(c))
                    .cloned()
                    .collect();
                if ranked.is_empty() {
                    vec![self.choose_category(&classification, &allow)]
                } else {
                    ranked
                }
            }
        };
        info!(
            "Evaluating across {} categories: {}",
            targets.len(),
            targets.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        );

        let text: Arc<str> = Arc::from(resume_text);
        let shared = Arc::new(classification.clone());
        let this = self.clone();
        let batch = BatchController::new(self.config.concurrency_limit)
            .run(targets.clone(), move |category: JobCategory| {
                let this = this.clone();
                let text = text.clone();
                let classification = shared.clone();
                async move {
                    match this
                        .evaluate_category(&text, &classification, category, None)
                        .await
                    {
                        Ok(report) => ItemOutcome::Success { value: report },
                        Err(failure) if failure.is_no_postings() => ItemOutcome::Skipped {
                            reason: failure.error.to_string(),
                        },
                        Err(failure) => ItemOutcome::Failed {
                            reason: failure.to_string(),
                        },
                    }
                }
            })
            .await;

        info!(
            "Multi-category evaluation done: {}/{} categories scored",
            batch.succeeded,
            batch.total()
        );
        Ok(MultiCategoryReport {
            classification,
            categories: targets,
            batch,
        })
    }

    /// The cached posting set for a category, if any. Unlike the pipeline,
    /// which rescrapes over a corrupt entry, this reports the corruption.
    pub async fn cached_postings(&self, category: &JobCategory) -> Result<Option<PostingSet>, StageFailure> {
        self.store
            .inspect(category)
            .await
            .map_err(|e| StageFailure::new(Stage::ScrapeOrCache, e))
    }

    // ── stages ──────────────────────────────────────────────────────────────

    async fn evaluate_category(
        &self,
        resume_text: &str,
        classification: &ClassificationResult,
        category: JobCategory,
        company: Option<&str>,
    ) -> Result<EvaluationReport, StageFailure> {
        let fail = |stage: Stage, e: EvalError| StageFailure::new(stage, e).with_partial(classification);

        let spec = self
            .registry
            .spec(&category)
            .ok_or_else(|| fail(Stage::ScrapeOrCache, EvalError::UnknownCategory(category.to_string())))?;

        info!("Stage {}: postings for {category}", Stage::ScrapeOrCache);
        let (set, postings_source) = self
            .postings_for(&category)
            .await
            .map_err(|e| fail(Stage::ScrapeOrCache, e))?;

        // A company without postings falls back to the whole set, unscoped.
        let (scoped, company) = match company.map(|name| (name, scope_to_company(&set, name))) {
            Some((name, Some(subset))) => (subset, Some(name)),
            Some((name, None)) => {
                warn!("No postings from '{name}'; using all {} postings", set.len());
                (set, None)
            }
            None => (set, None),
        };

        info!(
            "Stage {}: {} postings (hash {})",
            Stage::Aggregate,
            scoped.len(),
            scoped.content_hash()
        );
        let profile = aggregate(&category, &scoped, DEFAULT_MAX_QUOTES);

        info!("Stage {}: prompt for {category}", Stage::BuildPrompt);
        let builder = &self.prompt_builder;
        let (prompt, prompt_reused) = self
            .prompt_cache
            .get_or_build(
                PromptKey::new(category.clone(), company),
                scoped.content_hash(),
                self.config.force_regenerate_prompt,
                || builder.build(&profile, spec, company),
            )
            .await;

        info!("Stage {}: scoring resume for {category}", Stage::Judge);
        let judged = self
            .judge
            .evaluate(&prompt, resume_text, &self.config.provider_order)
            .await
            .map_err(|e| fail(Stage::Judge, e.into()))?;

        info!("Stage {}: provider {}", Stage::Assemble, judged.provider);
        let recommendations = recommend(
            &scoped,
            &judged.value.recommended_postings,
            &classification.skills_detected,
            MAX_RECOMMENDATIONS,
        );
        let evaluation = EvaluationResult::assemble(judged.value, recommendations, judged.provider);
        if !evaluation.parse_warnings.is_empty() {
            warn!(
                "Judge answer for {category} needed repair: {}",
                evaluation.parse_warnings.join("; ")
            );
        }

        info!(
            "Stage {}: {category} scored {} ({})",
            Stage::Done,
            evaluation.total_score,
            evaluation.grade
        );
        Ok(EvaluationReport {
            evaluation,
            classification: classification.clone(),
            category,
            company: company.map(str::to_string),
            postings_considered: scoped.len(),
            postings_source,
            content_hash: scoped.content_hash().to_string(),
            prompt_reused,
        })
    }

    /// Cache first unless a rescrape is forced. A failed scrape falls back to
    /// whatever is cached.
    async fn postings_for(&self, category: &JobCategory) -> Result<(PostingSet, PostingsSource), EvalError> {
        if !self.config.force_rescrape {
            if let Some(set) = self.store.get(category).await.filter(|s| !s.is_empty()) {
                info!("Using cached postings for {category} ({} postings)", set.len());
                return Ok((set, PostingsSource::Cache));
            }
        }

        let adapter = self
            .adapters
            .get(&category.site_id)
            .ok_or_else(|| EvalError::UnknownSite(category.site_id.clone()))?;

        let scraped = match adapter
            .fetch_postings(category, self.config.max_postings, self.config.headless)
            .await
        {
            Ok(set) if set.is_empty() => Err(ScrapeError::NoPostings(category.clone())),
            other => other,
        };

        match scraped {
            Ok(set) => {
                if !self.store.has_changed(category, set.content_hash()).await {
                    info!("Postings for {category} unchanged (hash {})", set.content_hash());
                    return Ok((set, PostingsSource::Scraped));
                }
                match self
                    .store
                    .put(category, set.postings().to_vec(), set.source_url())
                    .await
                {
                    Ok(stored) => Ok((stored, PostingsSource::Scraped)),
                    Err(e) => {
                        warn!("Could not cache postings for {category}: {e}");
                        Ok((set, PostingsSource::Scraped))
                    }
                }
            }
            Err(e) => match self.store.get(category).await.filter(|s| !s.is_empty()) {
                Some(stale) => {
                    warn!("Scrape failed for {category} ({e}); using cached postings");
                    Ok((stale, PostingsSource::StaleCache))
                }
                None => Err(e.into()),
            },
        }
    }

    /// Resolves an explicit list (unknown codes are an error) or the
    /// configured filters (unknown codes are skipped). Empty means any.
    fn allowed_categories(&self, requested: Option<&[String]>) -> Result<Vec<JobCategory>, EvalError> {
        let site = &self.config.site_id;
        match requested {
            Some(list) if !list.is_empty() => list
                .iter()
                .map(|raw| {
                    self.registry
                        .resolve(site, raw)
                        .ok_or_else(|| EvalError::UnknownCategory(raw.clone()))
                })
                .collect(),
            _ => Ok(self
                .config
                .category_filters
                .iter()
                .filter_map(|raw| {
                    let resolved = self.registry.resolve(site, raw);
                    if resolved.is_none() {
                        warn!("Ignoring unknown category filter `{raw}`");
                    }
                    resolved
                })
                .collect()),
        }
    }

    fn choose_category(&self, classification: &ClassificationResult, allow: &[JobCategory]) -> JobCategory {
        if allow.is_empty() {
            return classification.primary_category.clone();
        }
        if let Some(c) = classification
            .ranked_categories()
            .into_iter()
            .find(|c| allow.contains(c))
        {
            return c.clone();
        }
        warn!(
            "Classified categories are outside the allow-list; evaluating as {}",
            allow[0]
        );
        allow[0].clone()
    }
}

/// Postings whose company contains `company` (case-insensitive), or `None`
/// when nothing matches.
fn scope_to_company(set: &PostingSet, company: &str) -> Option<PostingSet> {
    let needle = company.trim().to_lowercase();
    let scoped = set.subset(|p| p.company.to_lowercase().contains(&needle));
    (!scoped.is_empty()).then_some(scoped)
}
