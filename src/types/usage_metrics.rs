//! Token usage accounting for completion calls and sessions.

use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Token counters reported for one completion, or accumulated over a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens used in prompts.
    pub prompt_tokens: u64,
    /// Number of tokens used in completions.
    pub completion_tokens: u64,
    /// Total number of tokens used.
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Create a usage record whose total is the sum of its parts.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Add usage from another record.
    pub fn add_usage(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

impl Add for TokenUsage {
    type Output = TokenUsage;

    fn add(mut self, rhs: TokenUsage) -> TokenUsage {
        self.add_usage(&rhs);
        self
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: TokenUsage) {
        self.add_usage(&rhs);
    }
}

impl std::iter::Sum for TokenUsage {
    fn sum<I: Iterator<Item = TokenUsage>>(iter: I) -> Self {
        iter.fold(TokenUsage::default(), |acc, u| acc + u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_total() {
        let usage = TokenUsage::new(12, 30);
        assert_eq!(usage.total_tokens, 42);
        assert_eq!(usage.prompt_tokens + usage.completion_tokens, 42);
    }

    #[test]
    fn test_accumulates_additively() {
        let mut total = TokenUsage::default();
        total.add_usage(&TokenUsage::new(10, 5));
        total += TokenUsage::new(3, 2);
        assert_eq!(total, TokenUsage::new(13, 7));

        let summed: TokenUsage = vec![TokenUsage::new(1, 1), TokenUsage::new(2, 2)]
            .into_iter()
            .sum();
        assert_eq!(summed.total_tokens, 6);
    }
}
