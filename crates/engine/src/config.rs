//! Engine configuration.

use optiloop_reward::RewardConfig;
use optiloop_sandbox::InputLimits;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// A Stop decision is rerouted when the budget exceeds this many rounds
    pub stop_reroute_min_rounds: usize,

    /// Baseline memory (MB) above which the memory agent may be forced on
    pub memory_override_threshold_mb: f64,

    /// Memory preference above which the memory agent may be forced on
    pub memory_preference_threshold: f64,

    /// Pick the most likely action instead of sampling
    pub deterministic: bool,

    /// Deadline for a single generator call
    pub agent_timeout: Duration,

    /// Input size limits
    pub limits: InputLimits,

    /// Reward constants
    pub reward: RewardConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stop_reroute_min_rounds: 2,
            memory_override_threshold_mb: 10.0,
            memory_preference_threshold: 0.3,
            deterministic: true,
            agent_timeout: Duration::from_secs(60),
            limits: InputLimits::default(),
            reward: RewardConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Sample actions instead of taking the argmax.
    pub fn with_deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    /// Set the per-agent deadline.
    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = timeout;
        self
    }

    /// Set the memory override thresholds.
    pub fn with_memory_override(mut self, threshold_mb: f64, preference: f64) -> Self {
        self.memory_override_threshold_mb = threshold_mb;
        self.memory_preference_threshold = preference;
        self
    }

    /// Set the input limits.
    pub fn with_limits(mut self, limits: InputLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the reward constants.
    pub fn with_reward(mut self, reward: RewardConfig) -> Self {
        self.reward = reward;
        self
    }
}
