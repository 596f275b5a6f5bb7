//! Pure HTML extraction for listing and detail pages.
//!
//! Nothing here performs I/O, and every parsed `Html` document is dropped
//! before returning, so callers can use these from async code freely.

use std::collections::{BTreeSet, HashSet};

use chrono::Utc;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use super::board::BoardSelectors;
use super::ScrapeError;
use crate::aggregate::normalize::split_tech;
use crate::models::{JobCategory, Posting};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Requirements,
    Preferred,
    Responsibilities,
    TechStack,
}

// Checked in order; "preferred qualifications" must hit Preferred first.
const SECTION_KEYWORDS: &[(Section, &[&str])] = &[
    (Section::Preferred, &["preferred", "nice to have", "bonus", "plus", "우대"]),
    (
        Section::Requirements,
        &["requirement", "qualification", "must have", "what you need", "자격"],
    ),
    (Section::TechStack, &["tech stack", "technolog", "stack", "tools", "기술"]),
    (
        Section::Responsibilities,
        &["responsibilit", "what you will do", "what you'll do", "role", "업무"],
    ),
];

pub fn parse_selector(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector).map_err(|e| ScrapeError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{e:?}"),
    })
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Absolute detail-page URLs from a listing page, de-duplicated in page order.
pub fn extract_listing_links(
    html: &str,
    link_selector: &str,
    page_url: &str,
) -> Result<Vec<String>, ScrapeError> {
    let selector = parse_selector(link_selector)?;
    let base = Url::parse(page_url).ok();
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for el in document.select(&selector) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let absolute = match (&base, Url::parse(href)) {
            (_, Ok(url)) => url.to_string(),
            (Some(base), Err(_)) => match base.join(href) {
                Ok(url) => url.to_string(),
                Err(_) => continue,
            },
            (None, Err(_)) => continue,
        };
        if seen.insert(absolute.clone()) {
            links.push(absolute);
        }
    }
    Ok(links)
}

/// Builds a [`Posting`] from a detail page. Fails with `MissingSelector` when
/// the title or the requirements section cannot be found.
pub fn extract_posting(
    html: &str,
    url: &str,
    category: &JobCategory,
    selectors: &BoardSelectors,
) -> Result<Posting, ScrapeError> {
    let title_sel = parse_selector(&selectors.title)?;
    let company_sel = parse_selector(&selectors.company)?;
    let heading_sel = parse_selector(&selectors.section_heading)?;
    let tag_sel = selectors
        .tech_tag
        .as_deref()
        .map(parse_selector)
        .transpose()?;

    let document = Html::parse_document(html);

    let title = document
        .select(&title_sel)
        .map(element_text)
        .find(|t| !t.is_empty())
        .ok_or_else(|| ScrapeError::MissingSelector {
            selector: selectors.title.clone(),
            url: url.to_string(),
        })?;
    let company = document
        .select(&company_sel)
        .map(element_text)
        .find(|t| !t.is_empty())
        .unwrap_or_default();

    let mut requirements = Vec::new();
    let mut preferred = Vec::new();
    let mut responsibilities = Vec::new();
    let mut tech_stack = BTreeSet::new();

    for heading in document.select(&heading_sel) {
        let Some(section) = classify_heading(&element_text(heading)) else {
            continue;
        };
        let items = section_items(heading);
        match section {
            Section::Requirements => requirements.extend(items),
            Section::Preferred => preferred.extend(items),
            Section::Responsibilities => responsibilities.extend(items),
            Section::TechStack => {
                tech_stack.extend(items.iter().flat_map(|i| split_tech(i)));
            }
        }
    }

    if let Some(sel) = &tag_sel {
        tech_stack.extend(
            document
                .select(sel)
                .map(element_text)
                .filter(|t| !t.is_empty()),
        );
    }

    if requirements.is_empty() {
        return Err(ScrapeError::MissingSelector {
            selector: format!("{} (requirements section)", selectors.section_heading),
            url: url.to_string(),
        });
    }

    Ok(Posting {
        title,
        company,
        requirements,
        preferred,
        tech_stack,
        responsibilities,
        source_id: source_id_from_url(url),
        detail_url: Some(url.to_string()),
        category: category.clone(),
        scraped_at: Utc::now(),
    })
}

fn classify_heading(text: &str) -> Option<Section> {
    let lower = text.to_lowercase();
    SECTION_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(section, _)| *section)
}

/// Items of the first element following a heading: `<li>` entries of a list,
/// or the non-empty lines of a paragraph.
fn section_items(heading: ElementRef<'_>) -> Vec<String> {
    let Some(next) = heading.next_siblings().find_map(ElementRef::wrap) else {
        return Vec::new();
    };

    match next.value().name() {
        "ul" | "ol" => next
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|c| c.value().name() == "li")
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect(),
        _ => next
            .text()
            .flat_map(str::lines)
            .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|l| !l.is_empty())
            .collect(),
    }
}

/// Last non-empty path segment, e.g. `https://x/wd/1234` → `1234`.
fn source_id_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segs| segs.filter(|s| !s.is_empty()).last().map(str::to_string))
        })
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const DETAIL_HTML: &str = r#"
        <html><body>
          <h1 class="title">Backend Engineer (Payments)</h1>
          <a class="company">Acme Corp</a>
          <section>
            <h3>Responsibilities</h3>
            <ul><li>Design payment APIs</li><li>Operate Kafka pipelines</li></ul>
            <h3>Requirements</h3>
            <ul>
              <li>3+ years of   Java or Kotlin</li>
              <li>RDBMS schema design</li>
              <li>   </li>
            </ul>
            <h3>Preferred Qualifications</h3>
            <ul><li>Kubernetes operations</li></ul>
            <h3>Tech Stack</h3>
            <p>Java, Spring Boot; Kafka</p>
          </section>
          <span class="tag">Redis</span><span class="tag">CI/CD</span>
        </body></html>
    "#;

    pub(crate) fn selectors() -> BoardSelectors {
        BoardSelectors {
            listing_link: "a.job-card".into(),
            title: "h1.title".into(),
            company: ".company".into(),
            section_heading: "h2, h3".into(),
            tech_tag: Some("span.tag".into()),
        }
    }

    fn cat() -> JobCategory {
        JobCategory::new("board", "backend")
    }

    #[test]
    fn test_extract_posting_sections() {
        let p = extract_posting(DETAIL_HTML, "https://jobs.example.com/wd/1234", &cat(), &selectors()).unwrap();
        assert_eq!(p.title, "Backend Engineer (Payments)");
        assert_eq!(p.company, "Acme Corp");
        assert_eq!(p.requirements, vec!["3+ years of Java or Kotlin", "RDBMS schema design"]);
        assert_eq!(p.preferred, vec!["Kubernetes operations"]);
        assert_eq!(p.responsibilities.len(), 2);
        for tech in ["Java", "Spring Boot", "Kafka", "Redis", "CI/CD"] {
            assert!(p.tech_stack.contains(tech), "missing {tech}");
        }
        assert_eq!(p.source_id, "1234");
        assert_eq!(p.category, cat());
    }

    #[test]
    fn test_missing_title_is_missing_selector() {
        let html = "<html><body><h3>Requirements</h3><ul><li>Java</li></ul></body></html>";
        let err = extract_posting(html, "https://x/wd/1", &cat(), &selectors()).unwrap_err();
        assert!(matches!(err, ScrapeError::MissingSelector { .. }));
    }

    #[test]
    fn test_missing_requirements_is_missing_selector() {
        let html = r#"<h1 class="title">Engineer</h1><h3>About us</h3><p>We sell things.</p>"#;
        let err = extract_posting(html, "https://x/wd/1", &cat(), &selectors()).unwrap_err();
        assert!(matches!(err, ScrapeError::MissingSelector { .. }));
    }

    #[test]
    fn test_listing_links_resolved_and_deduped() {
        let html = r#"
            <a class="job-card" href="/wd/1">One</a>
            <a class="job-card" href="https://jobs.example.com/wd/2">Two</a>
            <a class="job-card" href="/wd/1">One again</a>
            <a class="other" href="/wd/3">Not a card</a>
            <a class="job-card">No href</a>
        "#;
        let links = extract_listing_links(html, "a.job-card", "https://jobs.example.com/list?page=1").unwrap();
        assert_eq!(
            links,
            vec!["https://jobs.example.com/wd/1", "https://jobs.example.com/wd/2"]
        );
    }

    #[test]
    fn test_invalid_selector_reported() {
        let err = extract_listing_links("<a></a>", "a[[", "https://x").unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidSelector { .. }));
    }

    #[test]
    fn test_heading_classification() {
        assert_eq!(classify_heading("Preferred Qualifications"), Some(Section::Preferred));
        assert_eq!(classify_heading("Qualifications"), Some(Section::Requirements));
        assert_eq!(classify_heading("What you'll do"), Some(Section::Responsibilities));
        assert_eq!(classify_heading("Benefits"), None);
    }
}
