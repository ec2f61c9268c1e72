//! Reward constants.

use serde::{Deserialize, Serialize};

/// Tunable reward constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Scale applied to the weighted runtime gain
    pub runtime_scale: f64,

    /// Bonus per unit of test pass rate
    pub test_bonus: f64,

    /// Bonus when the last episode action is not Stop
    pub exploration_bonus: f64,

    /// Penalty for an unsafe verdict
    pub safety_penalty: f64,

    /// Penalty per unit of relative line-count change
    pub length_penalty: f64,

    /// Scale applied to the variance of previous rewards
    pub stability_scale: f64,

    /// Cap on the stability penalty
    pub stability_cap: f64,

    /// Penalty when one action dominates the episode
    pub diversity_penalty: f64,

    /// Share above which an action counts as dominant
    pub diversity_threshold: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            runtime_scale: 0.7,
            test_bonus: 0.2,
            exploration_bonus: 0.05,
            safety_penalty: 0.15,
            length_penalty: 0.05,
            stability_scale: 0.5,
            stability_cap: 0.1,
            diversity_penalty: 0.05,
            diversity_threshold: 0.5,
        }
    }
}

impl RewardConfig {
    /// Set the stability penalty scale and cap.
    pub fn with_stability(mut self, scale: f64, cap: f64) -> Self {
        self.stability_scale = scale;
        self.stability_cap = cap;
        self
    }

    /// Set the runtime scale.
    pub fn with_runtime_scale(mut self, scale: f64) -> Self {
        self.runtime_scale = scale;
        self
    }

    /// Set the diversity penalty and its threshold.
    pub fn with_diversity(mut self, penalty: f64, threshold: f64) -> Self {
        self.diversity_penalty = penalty;
        self.diversity_threshold = threshold;
        self
    }
}
