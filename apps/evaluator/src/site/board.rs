//! Reference adapter for HTML job boards: a paginated listing page linking
//! to one detail page per posting.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::extract::{extract_listing_links, extract_posting};
use super::throttle::FetchThrottle;
use super::{ScrapeError, SiteAdapter};
use crate::models::{JobCategory, PostingSet};

const USER_AGENT: &str = concat!("resume-evaluator/", env!("CARGO_PKG_VERSION"));
/// Extra pause before the single retry after a 429.
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSelectors {
    /// Anchors on the listing page that link to detail pages.
    pub listing_link: String,
    pub title: String,
    pub company: String,
    /// Headings that introduce requirement/preferred/responsibility/stack lists.
    pub section_heading: String,
    /// Optional tag chips holding individual technologies.
    pub tech_tag: Option<String>,
}

impl Default for BoardSelectors {
    fn default() -> Self {
        Self {
            listing_link: "a.job-card".to_string(),
            title: "h1".to_string(),
            company: ".company-name".to_string(),
            section_heading: "h2, h3".to_string(),
            tech_tag: Some(".tech-tag".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub site_id: String,
    pub base_url: String,
    /// Path template with `{category}`, `{page}`, `{years_min}`, `{years_max}`.
    pub list_path: String,
    pub years_min: u32,
    pub years_max: u32,
    pub max_pages: usize,
    pub selectors: BoardSelectors,
}

impl BoardConfig {
    pub fn listing_url(&self, category: &JobCategory, page: usize) -> String {
        let path = self
            .list_path
            .replace("{category}", &category.code)
            .replace("{page}", &page.to_string())
            .replace("{years_min}", &self.years_min.to_string())
            .replace("{years_max}", &self.years_max.to_string());
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Fetches a page body. Split out so extraction can be driven by fixtures.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(30))
                .build()?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let network = |source: reqwest::Error| ScrapeError::Network {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(network)?;
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ScrapeError::RateLimited {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ScrapeError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        response.text().await.map_err(network)
    }
}

pub struct JobBoardAdapter {
    config: BoardConfig,
    fetcher: Arc<dyn PageFetcher>,
    throttle: FetchThrottle,
}

impl JobBoardAdapter {
    pub fn new(config: BoardConfig, fetcher: Arc<dyn PageFetcher>, fetch_delay: Duration) -> Self {
        Self {
            config,
            fetcher,
            throttle: FetchThrottle::new(fetch_delay),
        }
    }

    /// Throttled fetch; a 429 gets one retry after a backoff.
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        self.throttle.wait().await;
        match self.fetcher.fetch(url).await {
            Err(ScrapeError::RateLimited { .. }) => {
                warn!("Rate limited on {url}; retrying once after {}s", RATE_LIMIT_BACKOFF.as_secs());
                tokio::time::sleep(RATE_LIMIT_BACKOFF).await;
                self.throttle.wait().await;
                self.fetcher.fetch(url).await
            }
            other => other,
        }
    }

    async fn collect_links(&self, category: &JobCategory, max_count: usize) -> Result<Vec<String>, ScrapeError> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for page in 1..=self.config.max_pages.max(1) {
            if links.len() >= max_count {
                break;
            }
            let url = self.config.listing_url(category, page);
            let html = match self.fetch(&url).await {
                Ok(html) => html,
                Err(e) if page == 1 => return Err(e),
                // a throttled listing would silently shrink the set
                Err(e @ ScrapeError::RateLimited { .. }) => return Err(e),
                Err(e) => {
                    warn!("Stopping pagination at page {page}: {e}");
                    break;
                }
            };

            let fresh: Vec<String> = extract_listing_links(&html, &self.config.selectors.listing_link, &url)?
                .into_iter()
                .filter(|l| seen.insert(l.clone()))
                .collect();
            debug!("Listing page {page} for {category}: {} new links", fresh.len());
            if fresh.is_empty() {
                break;
            }
            links.extend(fresh);
        }

        links.truncate(max_count);
        Ok(links)
    }
}

#[async_trait]
impl SiteAdapter for JobBoardAdapter {
    fn site_id(&self) -> &str {
        &self.config.site_id
    }

    async fn fetch_postings(
        &self,
        category: &JobCategory,
        max_count: usize,
        headless: bool,
    ) -> Result<PostingSet, ScrapeError> {
        if category.site_id != self.config.site_id {
            return Err(ScrapeError::UnsupportedCategory(category.clone()));
        }
        if headless {
            debug!("{} is fetched over plain HTTP; headless flag has no effect", self.config.site_id);
        }

        let links = self.collect_links(category, max_count).await?;
        info!(
            "Found {} posting links for {category} (fetch delay {}ms)",
            links.len(),
            self.throttle.delay().as_millis()
        );

        let mut postings = Vec::with_capacity(links.len());
        for link in &links {
            let html = match self.fetch(link).await {
                Ok(html) => html,
                Err(e @ ScrapeError::RateLimited { .. }) => {
                    warn!(
                        "Still rate limited after retry; abandoning scrape of {category} with {} of {} postings",
                        postings.len(),
                        links.len()
                    );
                    return Err(e);
                }
                Err(e) => {
                    warn!("Skipping posting {link}: {e}");
                    continue;
                }
            };
            match extract_posting(&html, link, category, &self.config.selectors) {
                Ok(posting) => postings.push(posting),
                Err(e) => warn!("Skipping malformed posting {link}: {e}"),
            }
        }

        if postings.is_empty() {
            return Err(ScrapeError::NoPostings(category.clone()));
        }
        info!("Scraped {} postings for {category}", postings.len());
        Ok(PostingSet::new(postings, self.config.listing_url(category, 1)))
    }
}
