//! JSON checkpoints for resumable benchmark runs.
//!
//! One file per method and model:
//! `<dir>/<experiment>/<method>_<model>_ckpt.json` holding
//! `{"method", "model", "completed", "results": [...]}`.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::utilities::errors::CheckpointError;

/// On-disk layout. Files holding only `results` still load.
#[derive(Debug, Deserialize)]
struct CheckpointFile<T> {
    #[serde(default)]
    completed: Option<usize>,
    results: Vec<T>,
}

/// Reads and writes checkpoint files for one experiment.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    directory: PathBuf,
}

impl CheckpointStore {
    /// Store rooted at `<dir>/<experiment>`.
    pub fn new(dir: impl AsRef<Path>, experiment: &str) -> Self {
        Self {
            directory: dir.as_ref().join(experiment),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path(&self, method: &str, model: &str) -> PathBuf {
        self.directory.join(format!("{}_{}_ckpt.json", method, model))
    }

    pub fn has(&self, method: &str, model: &str) -> bool {
        self.path(method, model).exists()
    }

    /// Saved results, or `None` when no checkpoint exists.
    pub fn load<T: DeserializeOwned>(
        &self,
        method: &str,
        model: &str,
    ) -> Result<Option<Vec<T>>, CheckpointError> {
        let path = self.path(method, model);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|source| CheckpointError::Io {
            path: path.clone(),
            source,
        })?;
        let file: CheckpointFile<T> = serde_json::from_str(&content)
            .map_err(|source| CheckpointError::Json { path: path.clone(), source })?;
        if file.completed.is_some_and(|n| n != file.results.len()) {
            log::warn!(
                "Checkpoint {} claims {:?} completed but holds {} results",
                path.display(),
                file.completed,
                file.results.len()
            );
        }
        log::info!(
            "Loaded checkpoint {} ({} results)",
            path.display(),
            file.results.len()
        );
        Ok(Some(file.results))
    }

    /// Write `results`, replacing any previous checkpoint.
    pub fn save<T: Serialize>(
        &self,
        method: &str,
        model: &str,
        results: &[T],
    ) -> Result<(), CheckpointError> {
        let path = self.path(method, model);
        fs::create_dir_all(&self.directory).map_err(|source| CheckpointError::Io {
            path: self.directory.clone(),
            source,
        })?;

        #[derive(Serialize)]
        struct Borrowed<'a, T> {
            method: &'a str,
            model: &'a str,
            completed: usize,
            results: &'a [T],
        }
        let body = Borrowed {
            method,
            model,
            completed: results.len(),
            results,
        };
        let content = serde_json::to_string_pretty(&body)
            .map_err(|source| CheckpointError::Json { path: path.clone(), source })?;
        fs::write(&path, content).map_err(|source| CheckpointError::Io {
            path: path.clone(),
            source,
        })?;
        log::debug!("Saved checkpoint {} ({} results)", path.display(), results.len());
        Ok(())
    }

    /// Delete the checkpoint. Returns whether one existed.
    pub fn clear(&self, method: &str, model: &str) -> Result<bool, CheckpointError> {
        let path = self.path(method, model);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|source| CheckpointError::Io { path, source })?;
        Ok(true)
    }
}

/// Collects results from concurrent sessions and flushes them to one
/// checkpoint every `flush_every` additions.
#[derive(Debug)]
pub struct CheckpointWriter<T> {
    store: CheckpointStore,
    method: String,
    model: String,
    flush_every: usize,
    results: Mutex<Vec<T>>,
}

impl<T: Serialize> CheckpointWriter<T> {
    /// Writer starting from previously saved `results`.
    pub fn new(
        store: CheckpointStore,
        method: impl Into<String>,
        model: impl Into<String>,
        flush_every: usize,
        results: Vec<T>,
    ) -> Self {
        Self {
            store,
            method: method.into(),
            model: model.into(),
            flush_every: flush_every.max(1),
            results: Mutex::new(results),
        }
    }

    /// Add one result, flushing when the count reaches a multiple of
    /// `flush_every`.
    pub fn push(&self, result: T) -> Result<(), CheckpointError> {
        let mut results = self.results.lock();
        results.push(result);
        if results.len() % self.flush_every == 0 {
            self.store.save(&self.method, &self.model, &results)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.results.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.lock().is_empty()
    }

    /// Write everything collected so far.
    pub fn flush(&self) -> Result<(), CheckpointError> {
        let results = self.results.lock();
        self.store.save(&self.method, &self.model, &results)
    }

    /// Flush and return the collected results.
    pub fn finish(self) -> Result<Vec<T>, CheckpointError> {
        self.flush()?;
        Ok(self.results.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: String,
        ok: bool,
    }

    fn row(id: &str) -> Row {
        Row {
            id: id.into(),
            ok: true,
        }
    }

    #[test]
    fn test_saved_file_records_method_model_and_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path(), "math500");
        store.save("cot", "claude", &[row("1"), row("2")]).unwrap();

        let raw = fs::read_to_string(store.path("cot", "claude")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["method"], "cot");
        assert_eq!(json["model"], "claude");
        assert_eq!(json["completed"], 2);
        assert_eq!(json["results"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_loads_file_with_results_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path(), "gsm8k");
        fs::create_dir_all(store.directory()).unwrap();
        fs::write(
            store.path("a2a", "gpt"),
            r#"{"results": [{"id": "7", "ok": false}]}"#,
        )
        .unwrap();

        let loaded: Vec<Row> = store.load("a2a", "gpt").unwrap().unwrap();
        assert_eq!(
            loaded,
            vec![Row {
                id: "7".into(),
                ok: false
            }]
        );
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path(), "gsm8k");

        assert!(!store.has("a2a", "gpt"));
        assert!(store.load::<Row>("a2a", "gpt").unwrap().is_none());

        store.save("a2a", "gpt", &[row("1"), row("2")]).unwrap();
        assert!(store.has("a2a", "gpt"));
        assert!(store.path("a2a", "gpt").ends_with("gsm8k/a2a_gpt_ckpt.json"));

        let loaded: Vec<Row> = store.load("a2a", "gpt").unwrap().unwrap();
        assert_eq!(loaded, vec![row("1"), row("2")]);

        assert!(store.clear("a2a", "gpt").unwrap());
        assert!(!store.clear("a2a", "gpt").unwrap());
    }

    #[test]
    fn test_corrupt_checkpoint_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path(), "exp");
        fs::create_dir_all(store.directory()).unwrap();
        fs::write(store.path("cot", "claude"), "not json").unwrap();

        let err = store.load::<Row>("cot", "claude").unwrap_err();
        assert!(matches!(err, CheckpointError::Json { .. }));
    }

    #[test]
    fn test_writer_flushes_every_n() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path(), "exp");
        let writer = CheckpointWriter::new(store.clone(), "cot", "gpt", 2, vec![row("0")]);

        writer.push(row("1")).unwrap();
        let saved: Vec<Row> = store.load("cot", "gpt").unwrap().unwrap();
        assert_eq!(saved.len(), 2);

        writer.push(row("2")).unwrap();
        let saved: Vec<Row> = store.load("cot", "gpt").unwrap().unwrap();
        assert_eq!(saved.len(), 2);

        let all = writer.finish().unwrap();
        assert_eq!(all.len(), 3);
        let saved: Vec<Row> = store.load("cot", "gpt").unwrap().unwrap();
        assert_eq!(saved, all);
    }

    #[tokio::test]
    async fn test_writer_shared_across_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path(), "exp");
        let writer = Arc::new(CheckpointWriter::new(store, "a2a", "gpt", 5, Vec::new()));

        let mut handles = Vec::new();
        for i in 0..20 {
            let writer = writer.clone();
            handles.push(tokio::spawn(async move {
                writer.push(row(&i.to_string())).unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(writer.len(), 20);
    }
}
