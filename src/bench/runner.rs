//! Concurrent benchmark driver.
//!
//! Runs one method over a sample set with bounded parallelism. Sessions are
//! independent tokio tasks; results are scored and appended to a shared
//! [`CheckpointWriter`] so an interrupted run can resume.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::a2a::card::CardRecord;
use crate::a2a::config::{DatasetKind, LLMFactory, OrchestrationMode};
use crate::a2a::errors::A2AError;
use crate::a2a::orchestrator::A2AOrchestrator;
use crate::baseline::cot::CotBaseline;
use crate::bench::samples::Sample;
use crate::types::usage_metrics::TokenUsage;
use crate::utilities::answer::{compare_answers, extract_answer_from_response};
use crate::utilities::checkpoint::{CheckpointStore, CheckpointWriter};
use crate::utilities::errors::CheckpointError;

/// Prediction recorded for a sample whose session failed.
pub const ERROR_PREDICTION: &str = "ERROR";

// ---------------------------------------------------------------------------
// Methods and results
// ---------------------------------------------------------------------------

/// Strategy under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Cot,
    NoCot,
    A2a,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cot => "cot",
            Self::NoCot => "no_cot",
            Self::A2a => "a2a",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cot" => Ok(Self::Cot),
            "no_cot" | "no-cot" => Ok(Self::NoCot),
            "a2a" => Ok(Self::A2a),
            other => Err(format!(
                "unknown method '{}' (expected cot, no_cot, or a2a)",
                other
            )),
        }
    }
}

/// Whether a sample produced a scored answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleStatus {
    Ok,
    Errored,
}

/// Scored outcome for one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleResult {
    pub sample_id: String,
    pub method: Method,
    pub model: String,
    pub predicted: String,
    pub ground_truth: String,
    pub raw_response: String,
    pub tokens: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub is_correct: bool,
    pub status: SampleStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cards: Vec<CardRecord>,
}

impl SampleResult {
    /// Result for a sample whose session failed: zero tokens, never correct.
    pub fn errored(sample: &Sample, method: Method, model: &str, error: impl fmt::Display) -> Self {
        Self {
            sample_id: sample.id.clone(),
            method,
            model: model.to_string(),
            predicted: ERROR_PREDICTION.to_string(),
            ground_truth: sample.answer.clone(),
            raw_response: format!("ERROR: {}", error),
            tokens: 0,
            prompt_tokens: 0,
            completion_tokens: 0,
            is_correct: false,
            status: SampleStatus::Errored,
            cards: Vec::new(),
        }
    }
}

/// Counts for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub correct: usize,
    pub errored: usize,
    pub tokens: u64,
}

impl RunSummary {
    pub fn from_results(results: &[SampleResult]) -> Self {
        Self {
            total: results.len(),
            correct: results.iter().filter(|r| r.is_correct).count(),
            errored: results
                .iter()
                .filter(|r| r.status == SampleStatus::Errored)
                .count(),
            tokens: results.iter().map(|r| r.tokens).sum(),
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// Errors that stop a whole run.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error(transparent)]
    Setup(#[from] A2AError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Settings for one benchmark run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub method: Method,
    pub model: String,
    pub dataset: DatasetKind,
    pub mode: OrchestrationMode,
    /// Maximum sessions in flight.
    pub concurrency: usize,
    /// Checkpoint after this many new results.
    pub flush_every: usize,
}

impl RunSettings {
    pub fn new(method: Method, model: impl Into<String>, dataset: impl Into<DatasetKind>) -> Self {
        Self {
            method,
            model: model.into(),
            dataset: dataset.into(),
            mode: OrchestrationMode::default(),
            concurrency: 10,
            flush_every: 10,
        }
    }
}

#[derive(Debug)]
enum Contender {
    Baseline(CotBaseline),
    A2A(A2AOrchestrator, OrchestrationMode),
}

impl Contender {
    async fn answer(
        &self,
        sample: &Sample,
    ) -> Result<(String, TokenUsage, Vec<CardRecord>), A2AError> {
        match self {
            Self::Baseline(baseline) => {
                let out = baseline.run(&sample.question, sample.context()).await?;
                Ok((out.answer, out.usage, Vec::new()))
            }
            Self::A2A(orchestrator, mode) => {
                let result = orchestrator
                    .run_mode(*mode, &sample.question, sample.context())
                    .await?;
                let cards = result.card_records();
                Ok((result.final_answer, result.totals, cards))
            }
        }
    }
}

/// Runs a method over samples, resuming from and writing to checkpoints.
pub struct BenchRunner {
    factory: Arc<dyn LLMFactory>,
    store: CheckpointStore,
    settings: RunSettings,
}

impl BenchRunner {
    pub fn new(factory: Arc<dyn LLMFactory>, store: CheckpointStore, settings: RunSettings) -> Self {
        Self {
            factory,
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    fn contender(&self) -> Result<Contender, A2AError> {
        let s = &self.settings;
        let dataset = s.dataset.as_str();
        Ok(match s.method {
            Method::Cot => Contender::Baseline(CotBaseline::from_factory(
                self.factory.as_ref(),
                &s.model,
                dataset,
                true,
            )?),
            Method::NoCot => Contender::Baseline(CotBaseline::from_factory(
                self.factory.as_ref(),
                &s.model,
                dataset,
                false,
            )?),
            Method::A2a => Contender::A2A(
                A2AOrchestrator::from_factory(self.factory.as_ref(), &s.model, dataset)?,
                s.mode,
            ),
        })
    }

    /// Run every sample not already in the checkpoint.
    ///
    /// Returns all results (resumed first, then new ones in completion
    /// order). A failing session becomes an errored result; only setup and
    /// checkpoint failures abort the run.
    pub async fn run(&self, samples: &[Sample]) -> Result<Vec<SampleResult>, BenchError> {
        let s = &self.settings;
        let method = s.method.as_str();
        let contender = Arc::new(self.contender()?);

        let previous: Vec<SampleResult> =
            self.store.load(method, &s.model)?.unwrap_or_default();
        let done: HashSet<&str> = previous.iter().map(|r| r.sample_id.as_str()).collect();
        let remaining: Vec<Sample> = samples
            .iter()
            .filter(|sample| !done.contains(sample.id.as_str()))
            .cloned()
            .collect();

        if !previous.is_empty() {
            log::info!(
                "Resuming {}-{}: {}/{} completed",
                method,
                s.model,
                previous.len(),
                samples.len()
            );
        }
        if remaining.is_empty() {
            log::info!("{}-{} already complete", method, s.model);
            return Ok(previous);
        }

        log::info!(
            "Running {} with {} on {} ({} remaining, concurrency {})",
            method,
            s.model,
            s.dataset,
            remaining.len(),
            s.concurrency
        );

        let writer = Arc::new(CheckpointWriter::new(
            self.store.clone(),
            method,
            s.model.clone(),
            s.flush_every,
            previous,
        ));
        let semaphore = Arc::new(Semaphore::new(s.concurrency.max(1)));
        let mut join_set: JoinSet<Result<(), CheckpointError>> = JoinSet::new();

        for sample in remaining {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| A2AError::Configuration(e.to_string()))?;
            let contender = contender.clone();
            let writer = writer.clone();
            let (method, model, dataset) = (s.method, s.model.clone(), s.dataset.clone());

            join_set.spawn(async move {
                let _permit = permit;
                // The session runs in its own task so a panic stays tied to its sample.
                let session = {
                    let (sample, model) = (sample.clone(), model.clone());
                    tokio::spawn(async move {
                        score(&contender, &sample, method, &model, &dataset).await
                    })
                };
                let result = match session.await {
                    Ok(result) => result,
                    Err(e) => {
                        log::error!("{} {} session task failed: {}", method, sample.id, e);
                        SampleResult::errored(
                            &sample,
                            method,
                            &model,
                            format!("session task failed: {}", e),
                        )
                    }
                };
                writer.push(result)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(pushed) => pushed?,
                Err(e) => log::error!("Benchmark task failed: {}", e),
            }
        }

        let writer = Arc::try_unwrap(writer).map_err(|_| {
            A2AError::Configuration("checkpoint writer still shared after run".into())
        })?;
        Ok(writer.finish()?)
    }
}

async fn score(
    contender: &Contender,
    sample: &Sample,
    method: Method,
    model: &str,
    dataset: &DatasetKind,
) -> SampleResult {
    match contender.answer(sample).await {
        Ok((raw, usage, cards)) => {
            let predicted = extract_answer_from_response(&raw, dataset);
            let is_correct = compare_answers(&predicted, &sample.answer, dataset);
            log::debug!("{} {}: correct={}", method, sample.id, is_correct);
            SampleResult {
                sample_id: sample.id.clone(),
                method,
                model: model.to_string(),
                predicted,
                ground_truth: sample.answer.clone(),
                raw_response: raw,
                tokens: usage.total_tokens,
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                is_correct,
                status: SampleStatus::Ok,
                cards,
            }
        }
        Err(e) => {
            log::warn!("{} {} failed: {}", method, sample.id, e);
            SampleResult::errored(sample, method, model, &e)
        }
    }
}

/// All cards from A2A results, in result order.
pub fn collect_cards(results: &[SampleResult]) -> Vec<CardRecord> {
    results.iter().flat_map(|r| r.cards.iter().cloned()).collect()
}
