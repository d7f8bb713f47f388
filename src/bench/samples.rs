//! Benchmark samples stored as local JSON Lines files.
//!
//! Each non-blank line is an object
//! `{"id": ..., "question": ..., "answer": ..., "context": ...}`; `context`
//! is optional. Numeric answers are accepted and kept as text.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::utilities::errors::SampleLoadError;

/// One benchmark question with its reference answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(deserialize_with = "text_or_number")]
    pub id: String,
    pub question: String,
    #[serde(deserialize_with = "text_or_number")]
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Sample {
    /// Context text, if present and non-blank.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref().filter(|c| !c.trim().is_empty())
    }
}

fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, found {}",
            other
        ))),
    }
}

/// Parse samples from JSONL text. `origin` labels errors.
pub fn parse_jsonl(text: &str, origin: &Path) -> Result<Vec<Sample>, SampleLoadError> {
    let mut seen = HashSet::new();
    let mut samples = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let sample: Sample =
            serde_json::from_str(line).map_err(|source| SampleLoadError::Parse {
                path: origin.to_path_buf(),
                line: idx + 1,
                source,
            })?;
        if !seen.insert(sample.id.clone()) {
            return Err(SampleLoadError::DuplicateId(sample.id));
        }
        samples.push(sample);
    }

    Ok(samples)
}

/// Load up to `limit` samples from a JSONL file.
pub fn load_samples(path: &Path, limit: Option<usize>) -> Result<Vec<Sample>, SampleLoadError> {
    let text = fs::read_to_string(path).map_err(|source| SampleLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut samples = parse_jsonl(&text, path)?;
    if let Some(limit) = limit {
        samples.truncate(limit);
    }
    log::info!("Loaded {} samples from {}", samples.len(), path.display());
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_jsonl() {
        let text = r#"{"id": "gsm8k_0", "question": "5+3?", "answer": 8}

{"id": 1, "question": "Capital?", "answer": "Paris", "context": "France..."}
"#;
        let samples = parse_jsonl(text, Path::new("mem")).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].answer, "8");
        assert_eq!(samples[0].context(), None);
        assert_eq!(samples[1].id, "1");
        assert_eq!(samples[1].context(), Some("France..."));
    }

    #[test]
    fn test_parse_errors_report_line() {
        let text = "{\"id\": \"a\", \"question\": \"q\", \"answer\": \"x\"}\nnot json\n";
        match parse_jsonl(text, Path::new("mem")) {
            Err(SampleLoadError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {:?}", other),
        }

        let dup = "{\"id\": \"a\", \"question\": \"q\", \"answer\": \"x\"}\n{\"id\": \"a\", \"question\": \"q\", \"answer\": \"y\"}";
        assert!(matches!(
            parse_jsonl(dup, Path::new("mem")),
            Err(SampleLoadError::DuplicateId(ref id)) if id == "a"
        ));
    }

    #[test]
    fn test_load_samples_with_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..5 {
            writeln!(file, r#"{{"id": "s{}", "question": "q", "answer": "a"}}"#, i).unwrap();
        }
        let samples = load_samples(file.path(), Some(3)).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[2].id, "s2");

        assert!(matches!(
            load_samples(Path::new("/nonexistent/samples.jsonl"), None),
            Err(SampleLoadError::Io { .. })
        ));
    }
}
