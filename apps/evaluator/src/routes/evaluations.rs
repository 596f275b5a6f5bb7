use std::path::{Component, Path, PathBuf};

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::ClassificationResult;
use crate::state::AppState;
use crate::workflow::{EvaluationReport, MultiCategoryReport};

/// A resume is given either inline or as a path relative to the configured
/// resume directory. Inline text wins when both are present.
#[derive(Debug, Deserialize)]
pub struct ResumeInput {
    pub resume_text: Option<String>,
    pub path: Option<String>,
}

enum ResumeSource<'a> {
    Text(&'a str),
    File(PathBuf),
}

impl ResumeInput {
    async fn source(&self, resume_dir: Option<&Path>) -> Result<ResumeSource<'_>, AppError> {
        let text = self.resume_text.as_deref().filter(|t| !t.trim().is_empty());
        let path = self.path.as_deref().map(str::trim).filter(|p| !p.is_empty());
        match (text, path) {
            (Some(text), _) => Ok(ResumeSource::Text(text)),
            (None, Some(path)) => Ok(ResumeSource::File(confine(resume_dir, path).await?)),
            (None, None) => Err(AppError::Validation(
                "either resume_text or path is required".to_string(),
            )),
        }
    }

    async fn load(&self, state: &AppState) -> Result<String, AppError> {
        match self.source(state.config.resume_dir.as_deref()).await? {
            ResumeSource::Text(text) => Ok(text.to_string()),
            ResumeSource::File(path) => Ok(state.orchestrator.load_resume_text(&path).await?),
        }
    }
}

/// Resolves a client-supplied path inside `resume_dir`. Absolute paths and
/// `..` are refused outright; symlinks are caught by comparing canonical
/// forms.
async fn confine(resume_dir: Option<&Path>, raw: &str) -> Result<PathBuf, AppError> {
    let root = resume_dir.ok_or_else(|| {
        AppError::Validation("resume paths are disabled; send resume_text instead".to_string())
    })?;

    let relative = Path::new(raw);
    if !relative.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir)) {
        return Err(AppError::Validation(format!(
            "path '{raw}' must be relative to the resume directory"
        )));
    }

    let root = tokio::fs::canonicalize(root)
        .await
        .map_err(|e| anyhow::anyhow!("resume directory {} is unusable: {e}", root.display()))?;
    let resolved = tokio::fs::canonicalize(root.join(relative))
        .await
        .map_err(|_| AppError::NotFound(format!("Resume '{raw}' not found")))?;
    if !resolved.starts_with(&root) {
        return Err(AppError::Validation(format!(
            "path '{raw}' resolves outside the resume directory"
        )));
    }
    Ok(resolved)
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    #[serde(flatten)]
    pub resume: ResumeInput,
    /// Narrows the allowed categories for this call.
    pub categories: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CompanyEvaluateRequest {
    #[serde(flatten)]
    pub resume: ResumeInput,
    pub company: String,
}

/// POST /api/v1/classifications
pub async fn handle_classify(
    State(state): State<AppState>,
    Json(req): Json<ResumeInput>,
) -> Result<Json<ClassificationResult>, AppError> {
    let text = req.load(&state).await?;
    let classification = state.orchestrator.classify_text(&text).await?;
    Ok(Json(classification))
}

/// POST /api/v1/evaluations
pub async fn handle_evaluate(
    State(state): State<AppState>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<EvaluationReport>, AppError> {
    let categories = req.categories.as_deref();
    let report = match req.resume.source(state.config.resume_dir.as_deref()).await? {
        ResumeSource::Text(text) => state.orchestrator.evaluate_resume_text(text, categories).await?,
        ResumeSource::File(path) => state.orchestrator.evaluate_resume_file(&path, categories).await?,
    };
    Ok(Json(report))
}

/// POST /api/v1/evaluations/company
pub async fn handle_evaluate_company(
    State(state): State<AppState>,
    Json(req): Json<CompanyEvaluateRequest>,
) -> Result<Json<EvaluationReport>, AppError> {
    let company = req.company.trim();
    if company.is_empty() {
        return Err(AppError::Validation("company must not be empty".to_string()));
    }
    let report = match req.resume.source(state.config.resume_dir.as_deref()).await? {
        ResumeSource::Text(text) => {
            state
                .orchestrator
                .evaluate_text_for_company(text, company)
                .await?
        }
        ResumeSource::File(path) => state.orchestrator.evaluate_for_company(&path, company).await?,
    };
    Ok(Json(report))
}

/// POST /api/v1/evaluations/batch
/// Classifies once, then evaluates each candidate category concurrently.
pub async fn handle_evaluate_batch(
    State(state): State<AppState>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<MultiCategoryReport>, AppError> {
    let text = req.resume.load(&state).await?;
    let report = state
        .orchestrator
        .clone()
        .evaluate_across_categories(text, req.categories)
        .await?;
    Ok(Json(report))
}
