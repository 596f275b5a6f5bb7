use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::classifier::ClassificationError;
use crate::judge::JudgeError;
use crate::resume::ResumeError;
use crate::site::ScrapeError;
use crate::store::StoreError;
use crate::workflow::StageFailure;

/// Any error a pipeline stage can end in.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Resume(#[from] ResumeError),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Judge(#[from] JudgeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unknown category `{0}`")]
    UnknownCategory(String),

    #[error("no site adapter registered for '{0}'")]
    UnknownSite(String),
}

impl EvalError {
    /// Stable machine-readable kind, used as the HTTP error code.
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::Resume(_) => "RESUME_ERROR",
            EvalError::Scrape(ScrapeError::NoPostings(_)) => "NO_POSTINGS",
            EvalError::Scrape(ScrapeError::RateLimited { .. }) => "RATE_LIMITED",
            EvalError::Scrape(_) => "SCRAPE_ERROR",
            EvalError::Classification(_) => "CLASSIFICATION_ERROR",
            EvalError::Judge(JudgeError::NoProviders(_)) => "NO_PROVIDERS",
            EvalError::Judge(JudgeError::AllProvidersExhausted(_)) => "ALL_PROVIDERS_EXHAUSTED",
            EvalError::Store(StoreError::CacheCorruption { .. }) => "CACHE_CORRUPTION",
            EvalError::Store(_) => "STORE_ERROR",
            EvalError::UnknownCategory(_) => "UNKNOWN_CATEGORY",
            EvalError::UnknownSite(_) => "UNKNOWN_SITE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            EvalError::Resume(ResumeError::Io { .. }) => StatusCode::NOT_FOUND,
            EvalError::Resume(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EvalError::Classification(ClassificationError::EmptyResume) => StatusCode::BAD_REQUEST,
            EvalError::Classification(_) => StatusCode::BAD_GATEWAY,
            EvalError::Scrape(ScrapeError::NoPostings(_)) => StatusCode::NOT_FOUND,
            EvalError::Scrape(ScrapeError::RateLimited { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            EvalError::Scrape(_) | EvalError::Judge(_) => StatusCode::BAD_GATEWAY,
            EvalError::UnknownCategory(_) | EvalError::UnknownSite(_) => StatusCode::BAD_REQUEST,
            EvalError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Evaluation(#[from] StageFailure),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                json!({ "code": "NOT_FOUND", "message": msg }),
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "code": "VALIDATION_ERROR", "message": msg }),
            ),
            AppError::Evaluation(failure) => {
                let status = failure.error.status();
                if status.is_server_error() {
                    tracing::error!("Evaluation failed: {failure}");
                } else {
                    tracing::warn!("Evaluation failed: {failure}");
                }
                (
                    status,
                    json!({
                        "code": failure.error.kind(),
                        "message": failure.error.to_string(),
                        "stage": failure.stage,
                        "partial": failure.classification,
                    }),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "code": "INTERNAL_ERROR",
                        "message": "An internal server error occurred",
                    }),
                )
            }
        };

        (status, Json(json!({ "error": body }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobCategory;
    use crate::workflow::Stage;

    #[test]
    fn test_kind_distinguishes_judge_failures() {
        let exhausted = EvalError::from(JudgeError::AllProvidersExhausted(vec![]));
        assert_eq!(exhausted.kind(), "ALL_PROVIDERS_EXHAUSTED");
        assert_eq!(exhausted.status(), StatusCode::BAD_GATEWAY);

        let none = EvalError::from(ScrapeError::NoPostings(JobCategory::new("board", "qa")));
        assert_eq!(none.kind(), "NO_POSTINGS");
        assert_eq!(none.status(), StatusCode::NOT_FOUND);

        let throttled = EvalError::from(ScrapeError::RateLimited { url: "https://jobs.example.com".into() });
        assert_eq!(throttled.kind(), "RATE_LIMITED");
        assert_eq!(throttled.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_stage_failure_maps_to_status() {
        let failure = StageFailure {
            stage: Stage::Judge,
            error: JudgeError::NoProviders(vec!["anthropic".into()]).into(),
            classification: None,
        };
        let response = AppError::from(failure).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_validation_is_bad_request() {
        let response = AppError::Validation("resume_text or path is required".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
