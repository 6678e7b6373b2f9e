//! Token usage accounting.
//!
//! Each generation reports a [`Usage`]; the run loop folds them into a
//! [`UsageStats`] carried on the final result, broken down per agent so
//! multi-agent runs show where the tokens went.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Token usage for a single model call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
    /// Number of API requests folded into this value.
    pub requests: usize,
}

impl Usage {
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            requests: 1,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn add(&mut self, other: &Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.requests += other.requests;
    }
}

/// Usage aggregated across a run, with a per-agent breakdown.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageStats {
    pub total: Usage,
    pub by_agent: HashMap<String, Usage>,
}

impl UsageStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, agent: &str, usage: Usage) {
        self.total.add(&usage);
        self.by_agent
            .entry(agent.to_string())
            .and_modify(|u| u.add(&usage))
            .or_insert(usage);
    }
}
