//! Answer extraction and scoring for benchmark responses.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::a2a::config::DatasetKind;

static ANSWER_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)answer:").expect("Invalid regex"));
static BOXED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\boxed\{([^}]+)\}").expect("Invalid regex"));
static TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\text\{([^}]+)\}").expect("Invalid regex"));
static DOLLARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$+").expect("Invalid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex"));
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("Invalid regex"));

/// Absolute tolerance for numeric comparisons.
pub const NUMERIC_TOLERANCE: f64 = 0.01;

/// Pull the answer out of a model response.
///
/// Text after the last `Answer:` marker wins (first line only). Otherwise
/// math answers are cleaned of LaTeX wrappers, and anything else falls back
/// to the last non-empty line.
pub fn extract_answer_from_response(response: &str, dataset: &DatasetKind) -> String {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Some(marker) = ANSWER_MARKER.find_iter(response).last() {
        let tail = response[marker.end()..].trim();
        let first_line = tail.lines().next().unwrap_or("").trim();
        if *dataset == DatasetKind::Math500 {
            let cleaned = clean_math_answer(first_line);
            if !cleaned.is_empty() {
                return cleaned;
            }
        } else {
            return first_line.to_string();
        }
    }

    if *dataset == DatasetKind::Math500 {
        let cleaned = clean_math_answer(response);
        if !cleaned.is_empty() {
            return cleaned;
        }
    }

    trimmed
        .lines()
        .last()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(trimmed)
        .to_string()
}

/// Strip `\boxed{}`, `$`, `\text{}`, alternatives after " or ", and all
/// whitespace.
pub fn clean_math_answer(text: &str) -> String {
    let text = BOXED.replace_all(text.trim(), "$1");
    let text = DOLLARS.replace_all(&text, "");
    let text = TEXT.replace_all(&text, "$1");
    let text = text.split(" or ").next().unwrap_or("").trim();
    WHITESPACE.replace_all(text, "").into_owned()
}

/// Whether `predicted` matches `ground_truth`.
///
/// Compares normalized strings, then (for numeric datasets) the last number
/// in the prediction against the first in the truth, then containment.
pub fn compare_answers(predicted: &str, ground_truth: &str, dataset: &DatasetKind) -> bool {
    let pred = normalize(predicted, true);
    let truth = normalize(ground_truth, false);

    if pred == truth {
        return true;
    }

    if dataset.is_numeric() {
        let pred_num = NUMBER
            .find_iter(&pred)
            .last()
            .and_then(|m| m.as_str().parse::<f64>().ok());
        let truth_num = NUMBER
            .find(&truth)
            .and_then(|m| m.as_str().parse::<f64>().ok());
        if let (Some(p), Some(t)) = (pred_num, truth_num) {
            return (p - t).abs() < NUMERIC_TOLERANCE;
        }
    }

    truth.is_empty() || pred.contains(&truth)
}

fn normalize(text: &str, first_alternative: bool) -> String {
    let lower = text.trim().to_lowercase();
    let unboxed = BOXED.replace_all(&lower, "$1");
    let mut cleaned = DOLLARS.replace_all(&unboxed, "").into_owned();
    if first_alternative {
        if let Some(head) = cleaned.split(" or ").next() {
            cleaned = head.to_string();
        }
    }
    WHITESPACE.replace_all(cleaned.trim(), "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(s: &str) -> DatasetKind {
        DatasetKind::from(s)
    }

    #[test]
    fn test_extract_after_marker() {
        let resp = "Step 1: 5+3.\nAnswer: 8\nThanks";
        assert_eq!(extract_answer_from_response(resp, &kind("gsm8k")), "8");
        assert_eq!(
            extract_answer_from_response("FINAL ANSWER: Paris", &kind("hotpotqa")),
            "Paris"
        );
    }

    #[test]
    fn test_extract_math_cleaning() {
        assert_eq!(
            extract_answer_from_response("Answer: $\\boxed{x = 3}$", &kind("math500")),
            "x=3"
        );
        assert_eq!(
            extract_answer_from_response("The result is \\boxed{42}", &kind("math500")),
            "Theresultis42"
        );
    }

    #[test]
    fn test_extract_last_line_fallback() {
        assert_eq!(
            extract_answer_from_response("thinking...\n\nParis  ", &kind("hotpotqa")),
            "Paris"
        );
        assert_eq!(extract_answer_from_response("   ", &kind("gsm8k")), "");
    }

    #[test]
    fn test_clean_math_answer() {
        assert_eq!(clean_math_answer("\\text{5 cm} or 50 mm"), "5cm");
        assert_eq!(clean_math_answer("$$\\frac{1}{2}$$"), "\\frac{1}{2}");
    }

    #[test]
    fn test_compare_exact_and_boxed() {
        assert!(compare_answers("\\boxed{8}", "8", &kind("math500")));
        assert!(compare_answers(" Paris ", "paris", &kind("hotpotqa")));
        assert!(compare_answers("3 or -3", "3", &kind("math500")));
    }

    #[test]
    fn test_compare_numeric_tolerance() {
        assert!(compare_answers("The total is 72.001", "72", &kind("gsm8k")));
        assert!(!compare_answers("The total is 71", "72", &kind("gsm8k")));
        // Non-numeric datasets use containment instead.
        assert!(compare_answers("it is 72 apples", "72", &kind("hotpotqa")));
    }

    #[test]
    fn test_compare_containment() {
        assert!(compare_answers("The Eiffel Tower", "eiffel tower", &kind("2wikimultihopqa")));
        assert!(!compare_answers("London", "Paris", &kind("hotpotqa")));
    }
}
