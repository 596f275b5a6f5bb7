use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A job category scoped to the site that defines it.
///
/// Every recruiting site has its own category vocabulary, so a category is
/// only meaningful together with its `site_id`. Valid codes per site live in
/// the [`CategoryRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobCategory {
    pub site_id: String,
    pub code: String,
}

impl JobCategory {
    pub fn new(site_id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            code: code.into(),
        }
    }

    /// Filesystem/key-safe identifier, e.g. `board--full_stack`. `slug`
    /// never emits `-`, so the separator cannot collide with either part.
    pub fn cache_key(&self) -> String {
        format!("{}--{}", slug(&self.site_id), slug(&self.code))
    }
}

impl fmt::Display for JobCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.site_id, self.code)
    }
}

fn slug(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Static description of one category on one site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySpec {
    pub code: String,
    pub label: String,
    /// Position name used when framing prompts, e.g. "Server Developer".
    pub role_title: String,
    pub description: String,
    /// Lower-case resume keywords hinting at this category.
    pub keywords: Vec<String>,
}

impl CategorySpec {
    fn new(code: &str, label: &str, role_title: &str, description: &str, keywords: &[&str]) -> Self {
        Self {
            code: code.to_string(),
            label: label.to_string(),
            role_title: role_title.to_string(),
            description: description.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Maps each `site_id` to the category codes that site understands.
#[derive(Debug, Clone, Default)]
pub struct CategoryRegistry {
    sites: BTreeMap<String, Vec<CategorySpec>>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the category list for a site.
    pub fn register_site(&mut self, site_id: impl Into<String>, specs: Vec<CategorySpec>) {
        self.sites.insert(site_id.into(), specs);
    }

    pub fn categories(&self, site_id: &str) -> &[CategorySpec] {
        self.sites.get(site_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn spec(&self, category: &JobCategory) -> Option<&CategorySpec> {
        self.categories(&category.site_id)
            .iter()
            .find(|s| s.code == category.code)
    }

    /// Resolves free text ("Full Stack", "fullstack", "FULL-STACK") to a
    /// registered category on `site_id`. Matches code or label, ignoring case,
    /// whitespace, hyphens, and underscores.
    pub fn resolve(&self, site_id: &str, raw: &str) -> Option<JobCategory> {
        let wanted = squash(raw);
        if wanted.is_empty() {
            return None;
        }
        self.categories(site_id)
            .iter()
            .find(|s| squash(&s.code) == wanted || squash(&s.label) == wanted)
            .map(|s| JobCategory::new(site_id, s.code.clone()))
    }
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// The developer category set shared by the general-purpose job boards.
pub fn developer_categories() -> Vec<CategorySpec> {
    vec![
        CategorySpec::new(
            "backend",
            "Backend",
            "Server Developer",
            "Server development, API design, databases; Java/Kotlin/Python/Go",
            &[
                "backend", "server", "api", "java", "kotlin", "spring", "node.js", "golang",
                "mysql", "postgresql", "redis", "kafka", "microservice", "grpc",
            ],
        ),
        CategorySpec::new(
            "frontend",
            "Frontend",
            "Frontend Developer",
            "Web frontend; React/Vue/Angular, JavaScript/TypeScript",
            &[
                "frontend", "react", "vue", "angular", "javascript", "typescript", "html",
                "css", "web", "ui/ux",
            ],
        ),
        CategorySpec::new(
            "app",
            "App",
            "App Developer",
            "iOS/Android apps; Swift/Kotlin/Flutter/React Native",
            &["ios", "android", "swift", "flutter", "react native", "mobile"],
        ),
        CategorySpec::new(
            "device",
            "Device",
            "Embedded Developer",
            "Embedded, firmware, IoT, hardware control",
            &["embedded", "firmware", "iot", "hardware", "device", "driver"],
        ),
        CategorySpec::new(
            "fullstack",
            "Full Stack",
            "Full Stack Developer",
            "Developers working across frontend and backend",
            &["fullstack", "full-stack", "full stack"],
        ),
        CategorySpec::new(
            "infra",
            "Infra",
            "DevOps Engineer",
            "DevOps, SRE, cloud (AWS/GCP/Azure), Kubernetes",
            &[
                "devops", "infrastructure", "aws", "gcp", "azure", "kubernetes", "docker",
                "terraform", "ci/cd", "sre",
            ],
        ),
        CategorySpec::new(
            "qa",
            "QA",
            "QA Engineer",
            "Quality assurance, test automation, test design",
            &["qa", "quality", "testing", "automation test", "test automation"],
        ),
        CategorySpec::new(
            "data",
            "Data",
            "Data Engineer",
            "Data pipelines, analytics platforms, ML engineering",
            &["spark", "airflow", "hadoop", "etl", "data pipeline", "pytorch", "tensorflow"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CategoryRegistry {
        let mut r = CategoryRegistry::new();
        r.register_site("board", developer_categories());
        r
    }

    #[test]
    fn test_resolve_matches_label_and_code_loosely() {
        let r = registry();
        assert_eq!(
            r.resolve("board", "Full Stack"),
            Some(JobCategory::new("board", "fullstack"))
        );
        assert_eq!(
            r.resolve("board", "FULL-STACK"),
            Some(JobCategory::new("board", "fullstack"))
        );
        assert_eq!(
            r.resolve("board", " backend "),
            Some(JobCategory::new("board", "backend"))
        );
    }

    #[test]
    fn test_resolve_rejects_unknown_code_and_site() {
        let r = registry();
        assert_eq!(r.resolve("board", "Marketing"), None);
        assert_eq!(r.resolve("other-site", "Backend"), None);
        assert_eq!(r.resolve("board", "   "), None);
    }

    #[test]
    fn test_same_code_on_different_sites_are_distinct() {
        let a = JobCategory::new("board", "backend");
        let b = JobCategory::new("careers", "backend");
        assert_ne!(a, b);
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_cache_key_is_path_safe() {
        let c = JobCategory::new("My Board", "full stack/web");
        assert_eq!(c.cache_key(), "my_board--full_stack_web");
    }

    #[test]
    fn test_cache_key_separator_is_unambiguous() {
        let a = JobCategory::new("a_b", "c");
        let b = JobCategory::new("a", "b_c");
        assert_ne!(a.cache_key(), b.cache_key());
        assert_ne!(
            JobCategory::new("a-b", "c").cache_key(),
            JobCategory::new("a", "b-c").cache_key()
        );
    }
}
