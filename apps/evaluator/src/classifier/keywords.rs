use crate::models::CategorySpec;

/// Per-category count of known keywords present in the resume, highest
/// first. Categories with no hits are omitted; ties keep registry order.
pub fn keyword_hints(resume_text: &str, specs: &[CategorySpec]) -> Vec<(String, usize)> {
    let text = resume_text.to_lowercase();
    let mut hints: Vec<(String, usize)> = specs
        .iter()
        .map(|spec| {
            let hits = spec.keywords.iter().filter(|kw| contains_keyword(&text, kw)).count();
            (spec.code.clone(), hits)
        })
        .filter(|(_, hits)| *hits > 0)
        .collect();
    hints.sort_by(|a, b| b.1.cmp(&a.1));
    hints
}

/// Substring match, but keywords made only of letters must not sit inside a
/// longer word ("go" must not match "google").
pub(crate) fn contains_keyword(text: &str, keyword: &str) -> bool {
    if !keyword.chars().all(|c| c.is_alphabetic()) {
        return text.contains(keyword);
    }
    text.match_indices(keyword).any(|(i, _)| {
        let before = text[..i].chars().next_back();
        let after = text[i + keyword.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::category::developer_categories;

    #[test]
    fn test_hints_rank_backend_resume() {
        let resume = "Backend engineer. Java, Spring Boot, Kafka, MySQL, Redis. Some React.";
        let hints = keyword_hints(resume, &developer_categories());
        assert_eq!(hints[0].0, "backend");
        assert!(hints.iter().any(|(code, _)| code == "frontend"));
        assert!(!hints.iter().any(|(code, _)| code == "device"));
    }

    #[test]
    fn test_word_keywords_need_boundaries() {
        assert!(!contains_keyword("worked at google", "go"));
        assert!(contains_keyword("services in go and rust", "go"));
        assert!(contains_keyword("ci/cd pipelines", "ci/cd"));
    }
}
