//! Posting matcher: picks the postings worth recommending to a candidate.
//!
//! Postings the judge named come first. The remaining slots go to postings
//! ranked by overlap with the candidate's detected skills:
//! - skill equals a tech-stack tag (case-insensitive) → 1.0
//! - skill appears as a word in a requirement or preferred line → 0.6
//! - otherwise → 0.0
//!
//! Ties keep posting order; postings with no overlap are never recommended.

use std::collections::BTreeSet;

use crate::classifier::keywords::contains_keyword;
use crate::models::{Posting, PostingRef, PostingSet};

pub const MAX_RECOMMENDATIONS: usize = 5;

const TAG_MATCH: f32 = 1.0;
const TEXT_MATCH: f32 = 0.6;

pub fn recommend(
    set: &PostingSet,
    judge_named: &[String],
    skills: &BTreeSet<String>,
    limit: usize,
) -> Vec<PostingRef> {
    let postings = set.postings();
    let mut picked: Vec<usize> = Vec::new();
    let mut out = Vec::new();

    for name in judge_named {
        if out.len() >= limit {
            return out;
        }
        let wanted = name.trim().to_lowercase();
        let found = postings.iter().position(|p| {
            p.source_id.to_lowercase() == wanted || p.title.to_lowercase() == wanted
        });
        if let Some(i) = found.filter(|i| !picked.contains(i)) {
            picked.push(i);
            out.push(posting_ref(&postings[i], "recommended by evaluator".to_string()));
        }
    }

    let skills: Vec<String> = skills.iter().map(|s| s.trim().to_lowercase()).collect();
    let mut scored: Vec<(usize, f32, Vec<&str>)> = postings
        .iter()
        .enumerate()
        .filter(|(i, _)| !picked.contains(i))
        .map(|(i, p)| {
            let (score, hits) = overlap(p, &skills);
            (i, score, hits)
        })
        .filter(|(_, score, _)| *score > 0.0)
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    for (i, _, hits) in scored.into_iter().take(limit.saturating_sub(out.len())) {
        let reason = format!("skill overlap: {}", hits.join(", "));
        out.push(posting_ref(&postings[i], reason));
    }
    out
}

fn overlap<'a>(posting: &Posting, skills: &'a [String]) -> (f32, Vec<&'a str>) {
    let tags: Vec<String> = posting.tech_stack.iter().map(|t| t.to_lowercase()).collect();
    let text: Vec<String> = posting
        .requirements
        .iter()
        .chain(&posting.preferred)
        .map(|l| l.to_lowercase())
        .collect();

    let mut score = 0.0_f32;
    let mut hits = Vec::new();
    for skill in skills.iter().filter(|s| !s.is_empty()) {
        let strength = if tags.iter().any(|t| t == skill) {
            TAG_MATCH
        } else if text.iter().any(|l| contains_keyword(l, skill)) {
            TEXT_MATCH
        } else {
            0.0
        };
        if strength > 0.0 {
            score += strength;
            hits.push(skill.as_str());
        }
    }
    (score, hits)
}

fn posting_ref(posting: &Posting, reason: String) -> PostingRef {
    PostingRef {
        source_id: posting.source_id.clone(),
        title: posting.title.clone(),
        company: posting.company.clone(),
        detail_url: posting.detail_url.clone(),
        reason,
    }
}
