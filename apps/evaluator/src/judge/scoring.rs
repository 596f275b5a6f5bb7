//! Judge response → validated [`JudgeVerdict`].
//!
//! Required keys: `sub_scores`, `strengths`, `weaknesses`,
//! `interview_questions`, `summary`. `recommended_postings` is optional and
//! unknown keys are ignored. Out-of-range sub-scores are clamped to the
//! criterion's bounds and noted in `parse_warnings`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::llm_client::extract_json_object;
use crate::models::{Criterion, JudgeVerdict};

pub fn parse_verdict(text: &str) -> Result<JudgeVerdict, String> {
    let json = extract_json_object(text).ok_or("no JSON object in response")?;
    let value: Value = serde_json::from_str(json).map_err(|e| format!("invalid JSON: {e}"))?;
    let obj = value.as_object().ok_or("response is not a JSON object")?;

    let mut parse_warnings = Vec::new();
    let sub_scores = parse_sub_scores(required(obj, "sub_scores")?, &mut parse_warnings)?;

    Ok(JudgeVerdict {
        sub_scores,
        strengths: string_list(required(obj, "strengths")?, "strengths")?,
        weaknesses: string_list(required(obj, "weaknesses")?, "weaknesses")?,
        interview_questions: string_list(
            required(obj, "interview_questions")?,
            "interview_questions",
        )?,
        summary: required(obj, "summary")?
            .as_str()
            .ok_or("`summary` must be a string")?
            .trim()
            .to_string(),
        recommended_postings: match obj.get("recommended_postings") {
            Some(Value::Null) | None => Vec::new(),
            Some(v) => recommended_list(v)?,
        },
        parse_warnings,
    })
}

fn required<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a Value, String> {
    obj.get(key).ok_or_else(|| format!("missing required key `{key}`"))
}

fn parse_sub_scores(
    value: &Value,
    warnings: &mut Vec<String>,
) -> Result<BTreeMap<Criterion, u32>, String> {
    let raw = value.as_object().ok_or("`sub_scores` must be an object")?;

    let mut scores = BTreeMap::new();
    for (key, v) in raw {
        let Some(criterion) = Criterion::from_key(key) else {
            continue;
        };
        let n = score_number(v).ok_or_else(|| format!("sub-score `{key}` is not a number"))?;
        if !n.is_finite() {
            return Err(format!("sub-score `{key}` is not a finite number"));
        }
        let max = criterion.max_score();
        let clamped = n.round().clamp(0.0, max as f64) as u32;
        if n < 0.0 || n > max as f64 {
            warnings.push(format!(
                "{} score {n} out of range 0..={max}; clamped to {clamped}",
                criterion.key()
            ));
        }
        scores.insert(criterion, clamped);
    }

    for criterion in Criterion::ALL {
        if !scores.contains_key(&criterion) {
            return Err(format!("missing sub-score `{}`", criterion.key()));
        }
    }
    Ok(scores)
}

/// Accepts a bare number, a numeric string, or `{"score": n}`.
fn score_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(o) => o.get("score").and_then(score_number),
        _ => None,
    }
}

fn string_list(value: &Value, key: &str) -> Result<Vec<String>, String> {
    let items = value
        .as_array()
        .ok_or_else(|| format!("`{key}` must be an array"))?;
    Ok(items
        .iter()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

/// Items may be plain strings or objects with a `title`/`source_id`.
fn recommended_list(value: &Value) -> Result<Vec<String>, String> {
    let items = value
        .as_array()
        .ok_or("`recommended_postings` must be an array")?;
    Ok(items
        .iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Object(o) => o
                .get("source_id")
                .or_else(|| o.get("title"))
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EvaluationResult, Grade};

    fn payload(sub_scores: &str) -> String {
        format!(
            r#"{{
                "sub_scores": {sub_scores},
                "strengths": ["Kafka at scale", ""],
                "weaknesses": ["No on-call experience"],
                "interview_questions": ["How did you size the partitions?"],
                "summary": " Solid backend engineer. ",
                "confidence": "high"
            }}"#
        )
    }

    #[test]
    fn test_aliases_parse_and_total_to_grade_a() {
        let text = payload(r#"{"tech": 35, "problem_solving": 22, "soft_skills": 18, "fit": 13}"#);
        let verdict = parse_verdict(&text).unwrap();
        assert!(verdict.parse_warnings.is_empty());
        assert_eq!(verdict.strengths, vec!["Kafka at scale".to_string()]);
        assert_eq!(verdict.summary, "Solid backend engineer.");

        let result = EvaluationResult::assemble(verdict, vec![], "mock");
        assert_eq!(result.total_score, 88);
        assert_eq!(result.grade, Grade::A);
    }

    #[test]
    fn test_out_of_range_scores_are_clamped_with_warning() {
        let text = payload(
            r#"{"technical_skills": 55, "problem_solving": -3, "soft_skills": 20, "domain_fit": 15}"#,
        );
        let verdict = parse_verdict(&text).unwrap();
        assert_eq!(verdict.sub_scores[&Criterion::TechnicalSkills], 40);
        assert_eq!(verdict.sub_scores[&Criterion::ProblemSolving], 0);
        assert_eq!(verdict.parse_warnings.len(), 2);

        let total: u32 = verdict.sub_scores.values().sum();
        assert_eq!(total, 75);
    }

    #[test]
    fn test_missing_required_key_fails() {
        let text = r#"{"sub_scores": {"tech": 1, "problem_solving": 1, "soft_skills": 1, "fit": 1},
                       "strengths": [], "weaknesses": [], "summary": "x"}"#;
        let err = parse_verdict(text).unwrap_err();
        assert!(err.contains("interview_questions"), "{err}");
    }

    #[test]
    fn test_missing_criterion_fails() {
        let text = payload(r#"{"tech": 35, "problem_solving": 22, "soft_skills": 18}"#);
        let err = parse_verdict(&text).unwrap_err();
        assert!(err.contains("domain_fit"), "{err}");
    }

    #[test]
    fn test_nested_and_string_scores_accepted() {
        let text = payload(
            r#"{"technical_skills": {"score": 30, "reason": "ok"}, "problem_solving": "20", "soft_skills": 15.4, "domain_fit": 10}"#,
        );
        let verdict = parse_verdict(&text).unwrap();
        assert_eq!(verdict.sub_scores[&Criterion::TechnicalSkills], 30);
        assert_eq!(verdict.sub_scores[&Criterion::ProblemSolving], 20);
        assert_eq!(verdict.sub_scores[&Criterion::SoftSkills], 15);
    }

    #[test]
    fn test_fenced_reply_with_prose_and_recommendations() {
        let text = format!(
            "Evaluation below.\n```json\n{}\n```",
            r#"{"sub_scores": {"tech": 10, "problem_solving": 10, "soft_skills": 10, "fit": 10},
                "strengths": [], "weaknesses": [], "interview_questions": [], "summary": "s",
                "recommended_postings": ["wd-1", {"title": "Server Engineer"}, 7]}"#
        );
        let verdict = parse_verdict(&text).unwrap();
        assert_eq!(verdict.recommended_postings, vec!["wd-1", "Server Engineer"]);
    }

    #[test]
    fn test_non_finite_scores_fail() {
        for bad in [r#""NaN""#, r#""inf""#, r#""-infinity""#] {
            let text = payload(&format!(
                r#"{{"tech": {bad}, "problem_solving": 22, "soft_skills": 18, "fit": 13}}"#
            ));
            let err = parse_verdict(&text).unwrap_err();
            assert!(err.contains("not a finite number"), "{bad}: {err}");
        }
    }

    #[test]
    fn test_non_json_reply_fails() {
        assert!(parse_verdict("I cannot evaluate this resume.").is_err());
    }
}
