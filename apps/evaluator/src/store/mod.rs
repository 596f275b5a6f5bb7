//! Fingerprinted Job Store: latest posting set per category, with its
//! content hash.
//!
//! Backends implement [`JobStore`] and report corruption as an error;
//! [`FingerprintedJobStore`] absorbs that into "no cached data" so callers
//! always have the rescrape fallback.

pub mod file;
pub mod redis;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{JobCategory, Posting, PostingSet};

pub use file::FileJobStore;
pub use redis::RedisJobStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cached postings for {key} are corrupt: {reason}")]
    CacheCorruption { key: String, reason: String },

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A persistence backend for posting sets, keyed by category. `save`
/// replaces the stored document whole.
#[async_trait]
pub trait JobStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn load(&self, category: &JobCategory) -> Result<Option<PostingSet>, StoreError>;

    async fn save(&self, category: &JobCategory, set: &PostingSet) -> Result<(), StoreError>;
}

/// Decodes a stored document; any failure, including a hash that no longer
/// matches the postings, is reported as corruption.
pub(crate) fn decode(category: &JobCategory, bytes: &[u8]) -> Result<PostingSet, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::CacheCorruption {
        key: category.cache_key(),
        reason: e.to_string(),
    })
}

#[derive(Clone)]
pub struct FingerprintedJobStore {
    backend: Arc<dyn JobStore>,
}

impl FingerprintedJobStore {
    pub fn new(backend: Arc<dyn JobStore>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend()
    }

    /// Computes the hash, stores the set, and returns it.
    pub async fn put(
        &self,
        category: &JobCategory,
        postings: Vec<Posting>,
        source_url: &str,
    ) -> Result<PostingSet, StoreError> {
        let set = PostingSet::new(postings, source_url);
        self.backend.save(category, &set).await?;
        info!(
            "Stored {} postings for {} (hash {}, backend {})",
            set.len(),
            category,
            set.content_hash(),
            self.backend.backend()
        );
        Ok(set)
    }

    /// The cached set with unreadable data reported as an error.
    pub async fn inspect(&self, category: &JobCategory) -> Result<Option<PostingSet>, StoreError> {
        self.backend.load(category).await
    }

    /// The cached set, or `None` when nothing is stored or the stored data is
    /// unreadable.
    pub async fn get(&self, category: &JobCategory) -> Option<PostingSet> {
        match self.inspect(category).await {
            Ok(set) => set,
            Err(e) => {
                warn!("Treating cache for {category} as empty: {e}");
                None
            }
        }
    }

    /// True when `hash` differs from the cached set's hash, or nothing usable
    /// is cached.
    pub async fn has_changed(&self, category: &JobCategory, hash: &str) -> bool {
        self.get(category)
            .await
            .map_or(true, |set| set.content_hash() != hash)
    }
}
