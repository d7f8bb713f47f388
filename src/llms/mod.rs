//! Completion gateway.
//!
//! - [`base_llm`] - The [`BaseLLM`] trait and message types
//! - [`errors`] - Gateway error classes
//! - [`providers`] - OpenRouter over HTTP and a scripted replay provider

pub mod base_llm;
pub mod errors;
pub mod providers;

// Re-exports for convenience
pub use base_llm::{BaseLLM, LLMMessage, LLMResponse, MessageRole};
pub use errors::LLMError;
