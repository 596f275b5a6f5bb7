use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::EvaluationPrompt;
use crate::models::JobCategory;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PromptKey {
    pub category: JobCategory,
    /// Lower-cased company scope, if any.
    pub company: Option<String>,
}

impl PromptKey {
    pub fn new(category: JobCategory, company: Option<&str>) -> Self {
        Self {
            category,
            company: company.map(|c| c.trim().to_lowercase()),
        }
    }
}

/// In-memory prompt cache. An entry is reused only while its recorded
/// source hash equals the current posting set's hash.
#[derive(Default)]
pub struct PromptCache {
    entries: RwLock<HashMap<PromptKey, Arc<EvaluationPrompt>>>,
}

impl PromptCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `(prompt, reused)`. `build` runs only on a miss, a hash change,
    /// or when `force` is set; the new prompt replaces the old entry whole.
    pub async fn get_or_build(
        &self,
        key: PromptKey,
        source_hash: &str,
        force: bool,
        build: impl FnOnce() -> String,
    ) -> (Arc<EvaluationPrompt>, bool) {
        if !force {
            let entries = self.entries.read().await;
            if let Some(existing) = entries.get(&key) {
                if existing.source_content_hash == source_hash {
                    debug!("Prompt cache hit for {} (hash {source_hash})", key.category);
                    return (existing.clone(), true);
                }
                info!(
                    "Postings changed for {} ({} -> {source_hash}); rebuilding prompt",
                    key.category, existing.source_content_hash
                );
            }
        }

        let prompt = Arc::new(EvaluationPrompt {
            category: key.category.clone(),
            company: key.company.clone(),
            built_at: Utc::now(),
            source_content_hash: source_hash.to_string(),
            system_prompt_text: build(),
        });
        info!(
            "Built evaluation prompt for {} ({} chars)",
            key.category,
            prompt.system_prompt_text.len()
        );

        self.entries.write().await.insert(key, prompt.clone());
        (prompt, false)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key() -> PromptKey {
        PromptKey::new(JobCategory::new("board", "backend"), None)
    }

    #[tokio::test]
    async fn test_reused_only_while_hash_matches() {
        let cache = PromptCache::new();
        let builds = AtomicUsize::new(0);
        let build = || {
            builds.fetch_add(1, Ordering::SeqCst);
            "prompt".to_string()
        };

        let (first, reused) = cache.get_or_build(key(), "aaaa", false, build).await;
        assert!(!reused);
        let (second, reused) = cache.get_or_build(key(), "aaaa", false, build).await;
        assert!(reused);
        assert!(Arc::ptr_eq(&first, &second));

        let (third, reused) = cache.get_or_build(key(), "bbbb", false, build).await;
        assert!(!reused);
        assert_eq!(third.source_content_hash, "bbbb");
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_force_rebuilds_even_on_same_hash() {
        let cache = PromptCache::new();
        cache.get_or_build(key(), "aaaa", false, || "v1".into()).await;
        let (p, reused) = cache.get_or_build(key(), "aaaa", true, || "v2".into()).await;
        assert!(!reused);
        assert_eq!(p.system_prompt_text, "v2");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_company_scope_is_a_separate_entry() {
        let cache = PromptCache::new();
        let cat = JobCategory::new("board", "backend");
        cache.get_or_build(PromptKey::new(cat.clone(), None), "h", false, || "all".into()).await;
        let (p, reused) = cache
            .get_or_build(PromptKey::new(cat.clone(), Some(" Acme ")), "h", false, || "acme".into())
            .await;
        assert!(!reused);
        assert_eq!(p.company.as_deref(), Some("acme"));
        let (_, reused) = cache
            .get_or_build(PromptKey::new(cat, Some("ACME")), "h", false, || "acme".into())
            .await;
        assert!(reused);
    }
}
