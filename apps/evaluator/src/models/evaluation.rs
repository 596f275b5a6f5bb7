use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::category::JobCategory;

// ────────────────────────────────────────────────────────────────────────────
// Rubric
// ────────────────────────────────────────────────────────────────────────────

/// The four fixed scoring criteria. Maxima sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    TechnicalSkills,
    ProblemSolving,
    SoftSkills,
    DomainFit,
}

impl Criterion {
    pub const ALL: [Criterion; 4] = [
        Criterion::TechnicalSkills,
        Criterion::ProblemSolving,
        Criterion::SoftSkills,
        Criterion::DomainFit,
    ];

    pub fn max_score(self) -> u32 {
        match self {
            Criterion::TechnicalSkills => 40,
            Criterion::ProblemSolving => 25,
            Criterion::SoftSkills => 20,
            Criterion::DomainFit => 15,
        }
    }

    /// Wire key used in judge payloads.
    pub fn key(self) -> &'static str {
        match self {
            Criterion::TechnicalSkills => "technical_skills",
            Criterion::ProblemSolving => "problem_solving",
            Criterion::SoftSkills => "soft_skills",
            Criterion::DomainFit => "domain_fit",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Criterion::TechnicalSkills => "Technical skills",
            Criterion::ProblemSolving => "Problem solving",
            Criterion::SoftSkills => "Soft skills",
            Criterion::DomainFit => "Domain fit",
        }
    }

    /// Parses a judge-supplied key, accepting the short aliases judges tend
    /// to use ("tech", "fit", "soft").
    pub fn from_key(raw: &str) -> Option<Criterion> {
        match raw.trim().to_lowercase().replace(&[' ', '-'][..], "_").as_str() {
            "technical_skills" | "technical" | "tech" | "tech_skills" => {
                Some(Criterion::TechnicalSkills)
            }
            "problem_solving" | "problem" => Some(Criterion::ProblemSolving),
            "soft_skills" | "soft" | "communication" => Some(Criterion::SoftSkills),
            "domain_fit" | "fit" | "domain" | "culture_fit" => Some(Criterion::DomainFit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
}

/// Lower bounds, highest first. Anything below the last row is `D`.
const GRADE_TABLE: [(u32, Grade); 4] = [(90, Grade::S), (75, Grade::A), (60, Grade::B), (45, Grade::C)];

impl Grade {
    pub fn from_score(total: u32) -> Grade {
        GRADE_TABLE
            .iter()
            .find(|(floor, _)| total >= *floor)
            .map(|(_, g)| *g)
            .unwrap_or(Grade::D)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        };
        f.write_str(s)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Results
// ────────────────────────────────────────────────────────────────────────────

/// Lightweight reference to a recommended posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingRef {
    pub source_id: String,
    pub title: String,
    pub company: String,
    pub detail_url: Option<String>,
    /// Why it was recommended (judge rationale or matched skills).
    pub reason: String,
}

/// Judge output after validation and clamping, before recommendations are
/// attached.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeVerdict {
    pub sub_scores: BTreeMap<Criterion, u32>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub interview_questions: Vec<String>,
    pub summary: String,
    /// Posting titles or ids the judge singled out.
    pub recommended_postings: Vec<String>,
    pub parse_warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub total_score: u32,
    pub grade: Grade,
    pub sub_scores: BTreeMap<Criterion, u32>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommended_postings: Vec<PostingRef>,
    pub interview_questions: Vec<String>,
    pub summary: String,
    pub evaluator_provider: String,
    pub evaluated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parse_warnings: Vec<String>,
}

impl EvaluationResult {
    /// The only constructor: total and grade are derived from the
    /// (already clamped) sub-scores.
    pub fn assemble(
        verdict: JudgeVerdict,
        recommended_postings: Vec<PostingRef>,
        evaluator_provider: impl Into<String>,
    ) -> Self {
        let total_score: u32 = verdict.sub_scores.values().sum();
        Self {
            total_score,
            grade: Grade::from_score(total_score),
            sub_scores: verdict.sub_scores,
            strengths: verdict.strengths,
            weaknesses: verdict.weaknesses,
            recommended_postings,
            interview_questions: verdict.interview_questions,
            summary: verdict.summary,
            evaluator_provider: evaluator_provider.into(),
            evaluated_at: Utc::now(),
            parse_warnings: verdict.parse_warnings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub primary_category: JobCategory,
    pub secondary_categories: Vec<JobCategory>,
    pub confidence: f64,
    pub reasoning: String,
    pub skills_detected: BTreeSet<String>,
    pub experience_years: Option<u32>,
    pub provider: String,
}

impl ClassificationResult {
    /// Primary first, then secondaries, without duplicates.
    pub fn ranked_categories(&self) -> Vec<&JobCategory> {
        let mut out: Vec<&JobCategory> = vec![&self.primary_category];
        for c in &self.secondary_categories {
            if !out.contains(&c) {
                out.push(c);
            }
        }
        out
    }
}
