//! Aggregator: turns one category's posting set into frequency-ranked
//! requirement/tech-stack tables with representative verbatim quotes.
//!
//! Algorithm:
//! 1. Normalize each phrase (bullets stripped, case-folded, whitespace collapsed).
//! 2. Bucket it with an earlier phrase when the normalized forms are equal or
//!    their token sets have Jaccard similarity ≥ [`NEAR_DUPLICATE_THRESHOLD`].
//! 3. A bucket counts each posting at most once.
//! 4. Stable sort by descending count; ties keep first-seen order.
//!
//! The output depends only on the postings and their order, never on time
//! or hashing state.

pub mod normalize;

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::{JobCategory, PostingSet};
use normalize::{jaccard, normalize_phrase, split_tech, tokens};

pub const NEAR_DUPLICATE_THRESHOLD: f64 = 0.8;
pub const DEFAULT_MAX_QUOTES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    /// First-seen verbatim wording of the bucket.
    pub label: String,
    /// Number of postings mentioning it.
    pub count: usize,
    /// Up to N distinct verbatim phrasings, first-seen order.
    pub quotes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateProfile {
    pub category: JobCategory,
    pub posting_count: usize,
    pub source_content_hash: String,
    pub requirements: Vec<FrequencyEntry>,
    pub preferred: Vec<FrequencyEntry>,
    pub tech_stack: Vec<FrequencyEntry>,
    pub responsibilities: Vec<FrequencyEntry>,
    pub companies: Vec<FrequencyEntry>,
}

impl AggregateProfile {
    /// Share of postings mentioning `entry`, as a whole percentage.
    pub fn share(&self, entry: &FrequencyEntry) -> u32 {
        if self.posting_count == 0 {
            return 0;
        }
        ((entry.count * 100) as f64 / self.posting_count as f64).round() as u32
    }
}

pub fn aggregate(category: &JobCategory, set: &PostingSet, max_quotes: usize) -> AggregateProfile {
    let postings = set.postings();

    let requirements = rank(postings.iter().map(|p| p.requirements.clone()), max_quotes);
    let preferred = rank(postings.iter().map(|p| p.preferred.clone()), max_quotes);
    let responsibilities = rank(postings.iter().map(|p| p.responsibilities.clone()), max_quotes);
    let tech_stack = rank(
        postings
            .iter()
            .map(|p| p.tech_stack.iter().flat_map(|t| split_tech(t)).collect()),
        max_quotes,
    );
    let companies = rank(postings.iter().map(|p| vec![p.company.clone()]), 0);

    AggregateProfile {
        category: category.clone(),
        posting_count: postings.len(),
        source_content_hash: set.content_hash().to_string(),
        requirements,
        preferred,
        tech_stack,
        responsibilities,
        companies,
    }
}

struct Bucket {
    normalized: String,
    tokens: BTreeSet<String>,
    entry: FrequencyEntry,
}

/// Buckets phrases across postings (one inner list per posting) and ranks them.
fn rank(per_posting: impl Iterator<Item = Vec<String>>, max_quotes: usize) -> Vec<FrequencyEntry> {
    let mut buckets: Vec<Bucket> = Vec::new();

    for phrases in per_posting {
        let mut counted: HashSet<usize> = HashSet::new();

        for raw in &phrases {
            let verbatim = raw.trim();
            let normalized = normalize_phrase(verbatim);
            if normalized.is_empty() {
                continue;
            }
            let toks = tokens(&normalized);

            let idx = match find_bucket(&buckets, &normalized, &toks) {
                Some(i) => i,
                None => {
                    buckets.push(Bucket {
                        normalized,
                        tokens: toks,
                        entry: FrequencyEntry {
                            label: verbatim.to_string(),
                            count: 0,
                            quotes: Vec::new(),
                        },
                    });
                    buckets.len() - 1
                }
            };

            let entry = &mut buckets[idx].entry;
            if counted.insert(idx) {
                entry.count += 1;
            }
            if entry.quotes.len() < max_quotes && !entry.quotes.iter().any(|q| q == verbatim) {
                entry.quotes.push(verbatim.to_string());
            }
        }
    }

    let mut entries: Vec<FrequencyEntry> = buckets.into_iter().map(|b| b.entry).collect();
    // sort_by is stable: equal counts keep first-seen order.
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}

fn find_bucket(buckets: &[Bucket], normalized: &str, toks: &BTreeSet<String>) -> Option<usize> {
    if let Some(i) = buckets.iter().position(|b| b.normalized == normalized) {
        return Some(i);
    }
    if toks.is_empty() {
        return None;
    }
    buckets
        .iter()
        .position(|b| !b.tokens.is_empty() && jaccard(&b.tokens, toks) >= NEAR_DUPLICATE_THRESHOLD)
}

/// The first `k` entries of a ranked table.
pub fn top(entries: &[FrequencyEntry], k: usize) -> &[FrequencyEntry] {
    &entries[..entries.len().min(k)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::posting::tests::sample_posting;
    use crate::models::Posting;

    fn set(postings: Vec<Posting>) -> PostingSet {
        PostingSet::new(postings, "https://jobs.example.com")
    }

    fn cat() -> JobCategory {
        JobCategory::new("board", "backend")
    }

    #[test]
    fn test_counts_once_per_posting_and_ranks_descending() {
        let s = set(vec![
            sample_posting("1", "Acme", &["Java", "Kafka", "java"], &["Java", "Kafka"]),
            sample_posting("2", "Beta", &["Kafka"], &["Kafka"]),
            sample_posting("3", "Gamma", &["Kafka", "Go"], &["Go"]),
        ]);
        let profile = aggregate(&cat(), &s, 3);

        let labels: Vec<_> = profile.requirements.iter().map(|e| (e.label.as_str(), e.count)).collect();
        assert_eq!(labels, vec![("Kafka", 3), ("Java", 1), ("Go", 1)]);
        assert_eq!(profile.requirements[1].quotes, vec!["Java", "java"]);
        assert_eq!(profile.posting_count, 3);
        assert_eq!(profile.source_content_hash, s.content_hash());
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let s = set(vec![
            sample_posting("1", "Acme", &["Zookeeper", "Airflow"], &[]),
            sample_posting("2", "Beta", &["Airflow", "Zookeeper"], &[]),
        ]);
        let profile = aggregate(&cat(), &s, 3);
        assert_eq!(profile.requirements[0].label, "Zookeeper");
        assert_eq!(profile.requirements[1].label, "Airflow");
    }

    #[test]
    fn test_near_identical_phrases_share_a_bucket() {
        let s = set(vec![
            sample_posting("1", "Acme", &["• Experience designing large scale distributed systems"], &[]),
            sample_posting("2", "Beta", &["experience designing large-scale distributed systems."], &[]),
            sample_posting("3", "Gamma", &["Experience with frontend frameworks"], &[]),
        ]);
        let profile = aggregate(&cat(), &s, 3);
        assert_eq!(profile.requirements[0].count, 2);
        assert_eq!(profile.requirements[0].quotes.len(), 2);
        assert_eq!(profile.requirements.len(), 2);
    }

    #[test]
    fn test_tech_stack_entries_are_split_and_case_folded() {
        let s = set(vec![
            sample_posting("1", "Acme", &[], &["Java, Spring"]),
            sample_posting("2", "Beta", &[], &["java", "CI/CD"]),
        ]);
        let profile = aggregate(&cat(), &s, 3);
        let java = profile.tech_stack.iter().find(|e| e.label == "Java").unwrap();
        assert_eq!(java.count, 2);
        assert!(profile.tech_stack.iter().any(|e| e.label == "CI/CD"));
        assert!(profile.tech_stack.iter().any(|e| e.label == "Spring"));
    }

    #[test]
    fn test_quotes_capped() {
        let s = set(vec![
            sample_posting("1", "A", &["Kafka"], &[]),
            sample_posting("2", "B", &["kafka"], &[]),
            sample_posting("3", "C", &["KAFKA"], &[]),
            sample_posting("4", "D", &["Kafka."], &[]),
        ]);
        let profile = aggregate(&cat(), &s, 2);
        assert_eq!(profile.requirements[0].count, 4);
        assert_eq!(profile.requirements[0].quotes, vec!["Kafka", "kafka"]);
    }

    #[test]
    fn test_deterministic_for_identical_input() {
        let postings = vec![
            sample_posting("1", "Acme", &["Java", "Kafka"], &["Java"]),
            sample_posting("2", "Beta", &["Kafka", "Redis"], &["Redis"]),
        ];
        let a = aggregate(&cat(), &set(postings.clone()), 3);
        let b = aggregate(&cat(), &set(postings), 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_share_and_top() {
        let s = set(vec![
            sample_posting("1", "Acme", &["Kafka"], &[]),
            sample_posting("2", "Acme", &["Kafka", "Go"], &[]),
        ]);
        let profile = aggregate(&cat(), &s, 3);
        assert_eq!(profile.share(&profile.requirements[0]), 100);
        assert_eq!(profile.share(&profile.requirements[1]), 50);
        assert_eq!(top(&profile.requirements, 1).len(), 1);
        assert_eq!(top(&profile.requirements, 10).len(), 2);
        assert_eq!(profile.companies[0].count, 2);
        assert!(profile.companies[0].quotes.is_empty());
    }
}
