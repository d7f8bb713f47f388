//! Benchmark harness: sample loading and the concurrent driver.

pub mod runner;
pub mod samples;

pub use runner::{BenchError, BenchRunner, Method, RunSettings, RunSummary, SampleResult, SampleStatus};
pub use samples::{load_samples, Sample};
