//! Benchmark utilities: answer scoring and checkpoint files.

pub mod answer;
pub mod checkpoint;
pub mod errors;
