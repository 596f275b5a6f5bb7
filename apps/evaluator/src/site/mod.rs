//! Site Adapter: one implementation per recruiting site, behind
//! [`SiteAdapter`]. The orchestrator only sees `fetch_postings`; page
//! navigation and extraction stay inside the adapter.

pub mod board;
pub mod extract;
pub mod throttle;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{JobCategory, PostingSet};

pub use board::{BoardConfig, BoardSelectors, HttpFetcher, JobBoardAdapter};

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("rate limited by {url}")]
    RateLimited { url: String },

    #[error("selector `{selector}` matched nothing on {url}")]
    MissingSelector { selector: String, url: String },

    #[error("invalid CSS selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("category {0} is not served by this adapter")]
    UnsupportedCategory(JobCategory),

    #[error("no postings found for {0}")]
    NoPostings(JobCategory),
}

#[async_trait]
pub trait SiteAdapter: Send + Sync {
    fn site_id(&self) -> &str;

    /// Scrapes up to `max_count` postings for `category`. A single malformed
    /// posting is skipped; the call fails only when nothing usable is found
    /// or the listing itself cannot be read.
    async fn fetch_postings(
        &self,
        category: &JobCategory,
        max_count: usize,
        headless: bool,
    ) -> Result<PostingSet, ScrapeError>;
}

/// Adapters by `site_id`.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn SiteAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn SiteAdapter>) {
        self.adapters.insert(adapter.site_id().to_string(), adapter);
    }

    pub fn get(&self, site_id: &str) -> Option<Arc<dyn SiteAdapter>> {
        self.adapters.get(site_id).cloned()
    }

    pub fn site_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.adapters.keys().cloned().collect();
        ids.sort();
        ids
    }
}
