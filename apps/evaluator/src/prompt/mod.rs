//! Prompt Builder: renders an [`AggregateProfile`] into the evaluation
//! system prompt.
//!
//! Section order is fixed: role framing, rubric, common profile, worked
//! examples, self-check, response schema. Rendering is a pure function of
//! (profile, category spec, company) so identical input yields byte-identical
//! text; timestamps live on [`EvaluationPrompt`], never inside the text.

pub mod cache;
pub mod prompts;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::{top, AggregateProfile, FrequencyEntry};
use crate::models::{CategorySpec, Criterion, JobCategory};
use prompts::*;

pub use cache::{PromptCache, PromptKey};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationPrompt {
    pub category: JobCategory,
    /// Set when the prompt was scoped to one company's postings.
    pub company: Option<String>,
    pub built_at: DateTime<Utc>,
    pub source_content_hash: String,
    pub system_prompt_text: String,
}

/// Renders an aggregate into prompt text. Implementations must be
/// deterministic.
pub trait PromptBuilder: Send + Sync {
    fn build(&self, profile: &AggregateProfile, spec: &CategorySpec, company: Option<&str>) -> String;
}

/// Default builder: weighted four-criterion rubric plus a common profile made
/// of the top-K entries of each frequency table.
#[derive(Debug, Clone)]
pub struct RubricPromptBuilder {
    pub top_k: usize,
    pub top_k_tech: usize,
    pub max_companies: usize,
}

impl Default for RubricPromptBuilder {
    fn default() -> Self {
        Self {
            top_k: 10,
            top_k_tech: 20,
            max_companies: 10,
        }
    }
}

impl PromptBuilder for RubricPromptBuilder {
    fn build(&self, profile: &AggregateProfile, spec: &CategorySpec, company: Option<&str>) -> String {
        [
            self.role_framing(profile, spec, company),
            render_rubric(),
            self.common_profile(profile),
            render_examples(profile, spec),
            SELF_CHECK_SECTION.to_string(),
            RESPONSE_SCHEMA_SECTION.to_string(),
        ]
        .join("\n\n---\n\n")
    }
}

impl RubricPromptBuilder {
    fn role_framing(&self, profile: &AggregateProfile, spec: &CategorySpec, company: Option<&str>) -> String {
        let context = match company {
            Some(name) => CONTEXT_COMPANY
                .replace("{company}", name)
                .replace("{posting_count}", &profile.posting_count.to_string()),
            None => CONTEXT_MARKET
                .replace("{posting_count}", &profile.posting_count.to_string())
                .replace("{company_count}", &profile.companies.len().to_string()),
        };
        ROLE_FRAMING_TEMPLATE
            .replace("{role_title}", &spec.role_title)
            .replace("{category_label}", &spec.label)
            .replace("{site_id}", &profile.category.site_id)
            .replace("{context}", &context)
    }

    fn common_profile(&self, profile: &AggregateProfile) -> String {
        let mut out = String::from(COMMON_PROFILE_HEADER);

        let tables: [(&str, &[FrequencyEntry], usize); 4] = [
            ("Requirements", profile.requirements.as_slice(), self.top_k),
            ("Preferred", profile.preferred.as_slice(), self.top_k),
            ("Tech stack", profile.tech_stack.as_slice(), self.top_k_tech),
            ("Responsibilities", profile.responsibilities.as_slice(), self.top_k),
        ];
        for (title, entries, k) in tables {
            out.push_str(&format!("\n\n### {title}\n"));
            let shown = top(entries, k);
            if shown.is_empty() {
                out.push_str("- (none listed)\n");
                continue;
            }
            for entry in shown {
                out.push_str(&format!("- {} ({}%)", entry.label, profile.share(entry)));
                let extra: Vec<&str> = entry
                    .quotes
                    .iter()
                    .filter(|q| **q != entry.label)
                    .map(String::as_str)
                    .collect();
                if !extra.is_empty() {
                    out.push_str(&format!(" e.g. \"{}\"", extra.join("\"; \"")));
                }
                out.push('\n');
            }
        }

        let companies: Vec<&str> = top(&profile.companies, self.max_companies)
            .iter()
            .map(|e| e.label.as_str())
            .collect();
        if !companies.is_empty() {
            out.push_str(&format!("\n### Companies\n{}\n", companies.join(", ")));
        }
        out.trim_end().to_string()
    }
}

fn render_rubric() -> String {
    let mut out = String::from(RUBRIC_HEADER);
    for (i, criterion) in Criterion::ALL.iter().enumerate() {
        out.push_str(&format!(
            "\n\n### {}. {} (`{}`, max {})\n| Points | Evidence |\n|---|---|\n",
            i + 1,
            criterion.label(),
            criterion.key(),
            criterion.max_score()
        ));
        for (range, text) in bands(*criterion) {
            out.push_str(&format!("| {range} | {text} |\n"));
        }
    }
    out.trim_end().to_string()
}

fn bands(criterion: Criterion) -> &'static [(&'static str, &'static str)] {
    match criterion {
        Criterion::TechnicalSkills => TECHNICAL_BANDS,
        Criterion::ProblemSolving => PROBLEM_SOLVING_BANDS,
        Criterion::SoftSkills => SOFT_SKILLS_BANDS,
        Criterion::DomainFit => DOMAIN_FIT_BANDS,
    }
}

fn render_examples(profile: &AggregateProfile, spec: &CategorySpec) -> String {
    let top_skill = profile
        .tech_stack
        .first()
        .map(|e| e.label.as_str())
        .unwrap_or(spec.role_title.as_str());
    EXAMPLES_SECTION_TEMPLATE
        .replace("{top_skill}", top_skill)
        .replace("{role_title}", &spec.role_title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::models::category::developer_categories;
    use crate::models::posting::tests::sample_posting;
    use crate::models::PostingSet;

    fn backend_spec() -> CategorySpec {
        developer_categories()
            .into_iter()
            .find(|s| s.code == "backend")
            .unwrap()
    }

    fn profile() -> AggregateProfile {
        let set = PostingSet::new(
            vec![
                sample_posting("1", "Acme", &["3+ years Java", "Kafka"], &["Java", "Kafka"]),
                sample_posting("2", "Beta", &["Kafka", "RDBMS design"], &["Kafka"]),
            ],
            "https://jobs.example.com",
        );
        aggregate(&JobCategory::new("board", "backend"), &set, 3)
    }

    #[test]
    fn test_sections_in_fixed_order() {
        let text = RubricPromptBuilder::default().build(&profile(), &backend_spec(), None);
        let positions: Vec<usize> = [
            "## Role",
            "## Scoring rubric",
            "## Common profile",
            "## Worked examples",
            "## Self-check",
            "## Response format",
        ]
        .iter()
        .map(|h| text.find(h).unwrap_or_else(|| panic!("missing {h}")))
        .collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_output_is_byte_stable() {
        let b = RubricPromptBuilder::default();
        let a = b.build(&profile(), &backend_spec(), None);
        let c = b.build(&profile(), &backend_spec(), None);
        assert_eq!(a, c);
    }

    #[test]
    fn test_rubric_lists_every_criterion_with_max() {
        let text = render_rubric();
        for c in Criterion::ALL {
            assert!(text.contains(&format!("`{}`, max {}", c.key(), c.max_score())));
        }
    }

    #[test]
    fn test_common_profile_shows_shares() {
        let text = RubricPromptBuilder::default().build(&profile(), &backend_spec(), None);
        assert!(text.contains("- Kafka (100%)"));
        assert!(text.contains("- 3+ years Java (50%)"));
        assert!(text.contains("Acme, Beta"));
        assert!(text.contains("2 current postings by 2 companies"));
    }

    #[test]
    fn test_examples_count_and_top_skill() {
        let text = RubricPromptBuilder::default().build(&profile(), &backend_spec(), None);
        let examples = &text[text.find("## Worked examples").unwrap()..text.find("## Self-check").unwrap()];
        assert_eq!(examples.matches("GOOD:").count() + examples.matches("BAD:").count(), 4);
        assert!(examples.contains("Migrated the order service to Kafka"));
    }

    #[test]
    fn test_company_scope_changes_framing() {
        let text = RubricPromptBuilder::default().build(&profile(), &backend_spec(), Some("Acme"));
        assert!(text.contains("what Acme asks for"));
    }
}
