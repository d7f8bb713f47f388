//! Error types for benchmark file handling.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reading or writing checkpoint files.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Checkpoint I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Checkpoint {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors loading benchmark samples.
#[derive(Debug, Error)]
pub enum SampleLoadError {
    #[error("Cannot read samples from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSONL line failed to parse. `line` is 1-based.
    #[error("Invalid sample at {path}:{line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Duplicate sample id '{0}'")]
    DuplicateId(String),
}
