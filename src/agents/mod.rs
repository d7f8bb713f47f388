//! Planner output parsing.
//!
//! The planner's free-form text is mapped to a [`Decision`] by [`extract`].

pub mod parser;

pub use parser::{extract, Decision};
