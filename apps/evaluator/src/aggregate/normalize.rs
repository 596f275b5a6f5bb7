use std::collections::BTreeSet;

const BULLETS: &[char] = &['•', '·', '-', '*', '▪', '◦', '○', '●', '■', '□', '–', '>'];

/// Case-folded, whitespace-collapsed form of a posting phrase with bullet
/// markers and trailing punctuation removed.
pub fn normalize_phrase(raw: &str) -> String {
    let mut s = raw.trim().trim_start_matches(BULLETS).trim_start();
    s = strip_enumerator(s);
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(['.', ',', ';', ':', '!'])
        .trim()
        .to_lowercase()
}

/// Drops a leading "1." / "2)" / "(3)" enumerator.
fn strip_enumerator(s: &str) -> &str {
    let inner = s.strip_prefix('(').unwrap_or(s);
    let digits = inner.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 || digits > 2 {
        return s;
    }
    let rest = &inner[digits..];
    match rest.strip_prefix(['.', ')']) {
        Some(after) if after.starts_with(char::is_whitespace) => after.trim_start(),
        _ => s,
    }
}

/// Token set used for near-duplicate detection. `+`, `#`, `.`, and `/` stay
/// inside tokens so `c++`, `c#`, `node.js`, and `ci/cd` survive.
pub fn tokens(normalized: &str) -> BTreeSet<String> {
    normalized
        .split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#' | '.' | '/')))
        .map(|t| t.trim_matches(['.', '/']))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let inter = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    inter / union
}

/// Splits a raw tech-stack field ("Java, Spring; Kafka") into entries.
pub fn split_tech(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_bullets_and_case() {
        assert_eq!(normalize_phrase("  • 3+ years of  Java experience. "), "3+ years of java experience");
        assert_eq!(normalize_phrase("- Kubernetes"), "kubernetes");
        assert_eq!(normalize_phrase("1. Spring Boot;"), "spring boot");
        assert_eq!(normalize_phrase("(2) REST API design"), "rest api design");
    }

    #[test]
    fn test_normalize_keeps_leading_numbers_that_are_content() {
        assert_eq!(normalize_phrase("3+ years backend"), "3+ years backend");
        assert_eq!(normalize_phrase("2024 graduates welcome"), "2024 graduates welcome");
    }

    #[test]
    fn test_tokens_keep_language_symbols() {
        let t = tokens("c++, c# and node.js on ci/cd");
        for expected in ["c++", "c#", "node.js", "ci/cd", "and", "on"] {
            assert!(t.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn test_jaccard_bounds() {
        let a = tokens("experience with kafka streams");
        let b = tokens("experience with kafka streams");
        assert_eq!(jaccard(&a, &b), 1.0);
        let c = tokens("go");
        assert_eq!(jaccard(&a, &c), 0.0);
    }

    #[test]
    fn test_split_tech_keeps_slashes() {
        assert_eq!(
            split_tech("Java, Spring Boot; CI/CD ,"),
            vec!["Java", "Spring Boot", "CI/CD"]
        );
    }
}
