//! Single-agent baselines compared against the A2A protocol.

pub mod cot;

pub use cot::{CotBaseline, CotOutput};
