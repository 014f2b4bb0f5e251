//! Dispatch tuning parameters.
//!
//! Defaults reproduce the classic colony scheduler: batches of 20 jobs per
//! worker class, a base score of 10000 so that closer jobs score higher, and
//! a 2000 point penalty for workers lacking the required tool.

use serde::{Deserialize, Serialize};

use crate::models::JobPriority;

/// Configuration for `JobManager` and the default scorer.
///
/// Deserializable from any serde format; missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum jobs admitted per worker class per priority level per tick.
    pub batch_cap: usize,
    /// Score of a job at distance 0 from the worker.
    pub base_score: i64,
    /// Subtracted when the worker does not wield the required tool.
    pub tool_penalty: i64,
    /// Score for padding cells and unlocatable worker/job pairs.
    pub fallback_score: i64,
    /// Cancellations at this priority or higher are logged at `info`.
    pub announce_priority: JobPriority,
}

impl DispatchConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-class batch cap.
    pub fn with_batch_cap(mut self, batch_cap: usize) -> Self {
        self.batch_cap = batch_cap;
        self
    }

    /// Sets the base proximity score.
    pub fn with_base_score(mut self, base_score: i64) -> Self {
        self.base_score = base_score;
        self
    }

    /// Sets the missing-tool penalty.
    pub fn with_tool_penalty(mut self, tool_penalty: i64) -> Self {
        self.tool_penalty = tool_penalty;
        self
    }

    /// Sets the fallback score.
    pub fn with_fallback_score(mut self, fallback_score: i64) -> Self {
        self.fallback_score = fallback_score;
        self
    }

    /// Sets the announcement threshold for cancellations.
    pub fn with_announce_priority(mut self, priority: JobPriority) -> Self {
        self.announce_priority = priority;
        self
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_cap: 20,
            base_score: 10_000,
            tool_penalty: 2_000,
            fallback_score: 1,
            announce_priority: JobPriority::High,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = DispatchConfig::default();
        assert_eq!(cfg.batch_cap, 20);
        assert_eq!(cfg.base_score, 10_000);
        assert_eq!(cfg.tool_penalty, 2_000);
        assert_eq!(cfg.fallback_score, 1);
        assert_eq!(cfg.announce_priority, JobPriority::High);
    }

    #[test]
    fn test_builder() {
        let cfg = DispatchConfig::new()
            .with_batch_cap(5)
            .with_base_score(500)
            .with_tool_penalty(100)
            .with_fallback_score(2)
            .with_announce_priority(JobPriority::Low);

        assert_eq!(cfg.batch_cap, 5);
        assert_eq!(cfg.base_score, 500);
        assert_eq!(cfg.tool_penalty, 100);
        assert_eq!(cfg.fallback_score, 2);
        assert_eq!(cfg.announce_priority, JobPriority::Low);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: DispatchConfig = serde_json::from_str(r#"{"batch_cap": 8}"#).unwrap();
        assert_eq!(cfg.batch_cap, 8);
        assert_eq!(cfg.base_score, 10_000);
        assert_eq!(cfg.announce_priority, JobPriority::High);
    }
}
