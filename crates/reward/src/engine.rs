//! Multi-objective reward computation.

use crate::config::RewardConfig;
use optiloop_core::{
    CodeArtifact, ObjectiveWeights, RewardComponents, RewardResult, SafetyVerdict, StrategyAction,
};
use std::collections::HashMap;
use tracing::debug;

/// Everything needed to score one candidate.
#[derive(Debug, Clone)]
pub struct RewardInputs<'a> {
    /// Baseline runtime (s)
    pub baseline_runtime: f64,
    /// Baseline peak memory (MB)
    pub baseline_memory: f64,
    /// Candidate runtime (s)
    pub runtime: f64,
    /// Candidate peak memory (MB)
    pub memory: f64,
    /// Critic quality score
    pub quality: f64,
    /// Candidate test pass rate
    pub test_pass_rate: f64,
    /// Code the candidate was derived from
    pub baseline_code: &'a CodeArtifact,
    /// The candidate
    pub candidate_code: &'a CodeArtifact,
    /// Critic regression verdict
    pub verdict: &'a SafetyVerdict,
    /// Objective weights (normalized here)
    pub weights: ObjectiveWeights,
    /// Rewards of earlier rounds
    pub previous_rewards: &'a [f64],
    /// Actions taken so far this episode
    pub episode_actions: &'a [StrategyAction],
}

/// Relative improvement `(baseline - value) / baseline`, clipped to `[-1, 1]`.
///
/// Zero when the baseline is not positive.
pub fn relative_gain(baseline: f64, value: f64) -> f64 {
    if baseline > 0.0 && value.is_finite() {
        ((baseline - value) / baseline).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

fn line_count(code: &CodeArtifact) -> usize {
    if code.text().is_empty() {
        0
    } else {
        code.lines()
    }
}

/// Pure reward function parameterized by [`RewardConfig`].
#[derive(Debug, Clone, Default)]
pub struct RewardEngine {
    config: RewardConfig,
}

impl RewardEngine {
    /// Engine with custom constants.
    pub fn new(config: RewardConfig) -> Self {
        Self { config }
    }

    /// Active constants.
    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// Score a candidate.
    pub fn score(&self, inputs: &RewardInputs<'_>) -> RewardResult {
        let c = &self.config;

        let runtime_gain = relative_gain(inputs.baseline_runtime, inputs.runtime);
        let memory_gain = relative_gain(inputs.baseline_memory, inputs.memory);
        let quality_score = unit(inputs.quality);
        let test_pass_rate = unit(inputs.test_pass_rate);
        let weights = inputs.weights.normalized();

        let baseline_lines = line_count(inputs.baseline_code);
        let length_change = if baseline_lines > 0 {
            (line_count(inputs.candidate_code) as f64 - baseline_lines as f64) / baseline_lines as f64
        } else {
            0.0
        };

        let exploration_bonus = match inputs.episode_actions.last() {
            Some(action) if !action.is_stop() => c.exploration_bonus,
            _ => 0.0,
        };

        let stability_penalty = if inputs.previous_rewards.len() >= 2 {
            (population_variance(inputs.previous_rewards) * c.stability_scale).min(c.stability_cap)
        } else {
            0.0
        };

        let diversity_penalty = if inputs.episode_actions.len() >= 2 {
            let mut counts: HashMap<StrategyAction, usize> = HashMap::new();
            for action in inputs.episode_actions {
                *counts.entry(*action).or_default() += 1;
            }
            let max_count = counts.values().copied().max().unwrap_or(0);
            let share = max_count as f64 / inputs.episode_actions.len() as f64;
            if share > c.diversity_threshold {
                debug!("Action diversity penalty applied: max share {:.2}", share);
                c.diversity_penalty
            } else {
                0.0
            }
        } else {
            0.0
        };

        let components = RewardComponents {
            runtime: weights.runtime * runtime_gain * c.runtime_scale,
            memory: weights.memory * memory_gain,
            quality: weights.quality * quality_score,
            test_bonus: c.test_bonus * test_pass_rate,
            exploration_bonus,
            length_penalty: c.length_penalty * length_change.abs(),
            safety_penalty: if inputs.verdict.is_unsafe() {
                c.safety_penalty
            } else {
                0.0
            },
            stability_penalty,
            diversity_penalty,
        };

        let raw = components.positive() - components.penalties();
        let reward = if raw.is_finite() {
            raw.clamp(-1.0, 1.0)
        } else {
            -1.0
        };

        RewardResult {
            reward,
            runtime_gain,
            memory_gain,
            quality_score,
            test_pass_rate,
            length_change,
            components,
            weights,
        }
    }
}

/// Score with the default constants.
pub fn score(inputs: &RewardInputs<'_>) -> RewardResult {
    RewardEngine::default().score(inputs)
}
