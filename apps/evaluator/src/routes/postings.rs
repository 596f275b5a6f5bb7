use std::collections::BTreeSet;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{JobCategory, Posting};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PostingsQuery {
    /// Include the postings themselves, not just the summary.
    #[serde(default)]
    pub full: bool,
}

#[derive(Debug, Serialize)]
pub struct PostingSetSummary {
    pub category: JobCategory,
    pub posting_count: usize,
    pub companies: BTreeSet<String>,
    pub scraped_at: DateTime<Utc>,
    pub source_url: String,
    pub content_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postings: Option<Vec<Posting>>,
}

/// GET /api/v1/postings/:site/:code
pub async fn handle_cached_postings(
    State(state): State<AppState>,
    Path((site, code)): Path<(String, String)>,
    Query(params): Query<PostingsQuery>,
) -> Result<Json<PostingSetSummary>, AppError> {
    let category = state
        .orchestrator
        .registry()
        .resolve(&site, &code)
        .ok_or_else(|| AppError::NotFound(format!("Unknown category {site}/{code}")))?;

    let set = state
        .orchestrator
        .cached_postings(&category)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No cached postings for {category}")))?;

    Ok(Json(PostingSetSummary {
        posting_count: set.len(),
        companies: set
            .postings()
            .iter()
            .map(|p| p.company.clone())
            .filter(|c| !c.is_empty())
            .collect(),
        scraped_at: set.scraped_at(),
        source_url: set.source_url().to_string(),
        content_hash: set.content_hash().to_string(),
        postings: params.full.then(|| set.postings().to_vec()),
        category,
    }))
}
