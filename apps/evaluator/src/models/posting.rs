use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::category::JobCategory;

/// Width of the rendered content hash, in hex characters.
pub const CONTENT_HASH_LEN: usize = 16;

/// One job posting as scraped from a recruiting site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub preferred: Vec<String>,
    #[serde(default)]
    pub tech_stack: BTreeSet<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    pub source_id: String,
    #[serde(default)]
    pub detail_url: Option<String>,
    pub category: JobCategory,
    pub scraped_at: DateTime<Utc>,
}

impl Posting {
    /// Content digest of this posting. `scraped_at` is deliberately left out
    /// so re-scraping identical content yields an identical digest.
    fn content_digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        let mut field = |value: &str| {
            hasher.update((value.len() as u64).to_be_bytes());
            hasher.update(value.as_bytes());
        };
        field(&self.title);
        field(&self.company);
        field(&self.source_id);
        field(self.detail_url.as_deref().unwrap_or(""));
        field(&self.category.site_id);
        field(&self.category.code);
        for (tag, items) in [
            ("requirements", &self.requirements),
            ("preferred", &self.preferred),
            ("responsibilities", &self.responsibilities),
        ] {
            field(tag);
            field(&items.len().to_string());
            for item in items {
                field(item);
            }
        }
        field("tech_stack");
        field(&self.tech_stack.len().to_string());
        for tech in &self.tech_stack {
            field(tech);
        }
        hasher.finalize().into()
    }
}

/// Computes the order-independent content hash of a list of postings.
pub fn content_hash(postings: &[Posting]) -> String {
    let mut digests: Vec<[u8; 32]> = postings.iter().map(Posting::content_digest).collect();
    digests.sort_unstable();

    let mut hasher = Sha256::new();
    for d in &digests {
        hasher.update(d);
    }
    let mut hex = hex::encode(hasher.finalize());
    hex.truncate(CONTENT_HASH_LEN);
    hex
}

/// Serialized shape of a posting set. Deserialization goes through
/// [`PostingSet::try_from`] so a stored hash that disagrees with the stored
/// postings is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingSetDocument {
    pub postings: Vec<Posting>,
    pub scraped_at: DateTime<Utc>,
    pub source_url: String,
    pub content_hash: String,
}

/// An immutable snapshot of one scrape. The hash is computed on construction
/// and cannot drift from the postings it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PostingSetDocument")]
pub struct PostingSet {
    postings: Vec<Posting>,
    scraped_at: DateTime<Utc>,
    source_url: String,
    content_hash: String,
}

impl PostingSet {
    pub fn new(postings: Vec<Posting>, source_url: impl Into<String>) -> Self {
        Self::from_parts(postings, source_url, Utc::now())
    }

    pub fn from_parts(
        postings: Vec<Posting>,
        source_url: impl Into<String>,
        scraped_at: DateTime<Utc>,
    ) -> Self {
        let content_hash = content_hash(&postings);
        Self {
            postings,
            scraped_at,
            source_url: source_url.into(),
            content_hash,
        }
    }

    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    pub fn scraped_at(&self) -> DateTime<Utc> {
        self.scraped_at
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// A new set holding only the postings matching `keep`, with its own hash.
    pub fn subset(&self, keep: impl Fn(&Posting) -> bool) -> PostingSet {
        let postings = self.postings.iter().filter(|p| keep(p)).cloned().collect();
        Self::from_parts(postings, self.source_url.clone(), self.scraped_at)
    }
}

impl TryFrom<PostingSetDocument> for PostingSet {
    type Error = String;

    fn try_from(doc: PostingSetDocument) -> Result<Self, Self::Error> {
        let set = PostingSet::from_parts(doc.postings, doc.source_url, doc.scraped_at);
        if set.content_hash != doc.content_hash {
            return Err(format!(
                "content hash mismatch: stored {}, computed {}",
                doc.content_hash, set.content_hash
            ));
        }
        Ok(set)
    }
}
