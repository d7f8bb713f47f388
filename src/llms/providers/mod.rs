//! LLM provider implementations.
//!
//! Each provider implements the [`BaseLLM`](crate::llms::base_llm::BaseLLM)
//! trait.
//!
//! | Provider | Module |
//! |----------|--------|
//! | OpenRouter Chat Completions | [`openrouter`] |
//! | Scripted replay (offline runs, tests) | [`scripted`] |

pub mod openrouter;
pub mod scripted;
