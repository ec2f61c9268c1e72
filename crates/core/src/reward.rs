//! Reward results and critic verdicts.

use crate::action::ObjectiveWeights;
use serde::{Deserialize, Serialize};

/// Regression verdict returned by the critic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum SafetyVerdict {
    /// No behavioral regression suspected
    #[default]
    Safe,
    /// Likely regression
    Unsafe {
        /// Critic's explanation
        reason: String,
    },
}

impl SafetyVerdict {
    /// Parse a `"SAFE"` / `"UNSAFE <reason>"` reply.
    ///
    /// Any reply containing `UNSAFE` (case-insensitive) is unsafe; everything
    /// else is treated as safe.
    pub fn parse(reply: &str) -> Self {
        let trimmed = reply.trim();
        if trimmed.to_uppercase().contains("UNSAFE") {
            SafetyVerdict::Unsafe {
                reason: trimmed.to_string(),
            }
        } else {
            SafetyVerdict::Safe
        }
    }

    /// Whether the verdict is unsafe.
    pub fn is_unsafe(&self) -> bool {
        matches!(self, SafetyVerdict::Unsafe { .. })
    }
}

/// Quality scores from the critic, each in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticScore {
    /// Overall quality
    pub overall: f64,
    /// Structural quality
    pub structural: f64,
    /// Safety score
    pub safety: f64,
    /// Maintainability
    pub maintainability: f64,
    /// Regression verdict
    pub verdict: SafetyVerdict,
}

impl CriticScore {
    /// Neutral score used when the critic is unavailable.
    pub fn neutral() -> Self {
        Self {
            overall: 0.5,
            structural: 0.5,
            safety: 0.5,
            maintainability: 0.5,
            verdict: SafetyVerdict::Safe,
        }
    }

    /// Copy of the score with every value clamped into `[0, 1]`.
    pub fn clamped(mut self) -> Self {
        for value in [
            &mut self.overall,
            &mut self.structural,
            &mut self.safety,
            &mut self.maintainability,
        ] {
            *value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
        }
        self
    }
}

/// Named contributions to a reward.
///
/// Penalties are stored as positive magnitudes and subtracted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardComponents {
    /// Weighted runtime gain
    pub runtime: f64,
    /// Weighted memory gain
    pub memory: f64,
    /// Weighted quality score
    pub quality: f64,
    /// Bonus for passing tests
    pub test_bonus: f64,
    /// Bonus for a non-stop action
    pub exploration_bonus: f64,
    /// Penalty for changing code length
    pub length_penalty: f64,
    /// Penalty for an unsafe verdict
    pub safety_penalty: f64,
    /// Penalty for reward variance across rounds
    pub stability_penalty: f64,
    /// Penalty for repeating the same action
    pub diversity_penalty: f64,
}

impl RewardComponents {
    /// Sum of positive contributions.
    pub fn positive(&self) -> f64 {
        self.runtime + self.memory + self.quality + self.test_bonus + self.exploration_bonus
    }

    /// Sum of penalties.
    pub fn penalties(&self) -> f64 {
        self.length_penalty + self.safety_penalty + self.stability_penalty + self.diversity_penalty
    }
}

/// Scalar reward and its breakdown for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardResult {
    /// Final reward in `[-1, 1]`
    pub reward: f64,
    /// Relative runtime gain in `[-1, 1]`
    pub runtime_gain: f64,
    /// Relative memory gain in `[-1, 1]`
    pub memory_gain: f64,
    /// Quality score in `[0, 1]`
    pub quality_score: f64,
    /// Test pass rate in `[0, 1]`
    pub test_pass_rate: f64,
    /// Relative change in line count
    pub length_change: f64,
    /// Per-term contributions
    pub components: RewardComponents,
    /// Normalized weights used
    pub weights: ObjectiveWeights,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_parse() {
        assert_eq!(SafetyVerdict::parse("SAFE"), SafetyVerdict::Safe);
        assert_eq!(SafetyVerdict::parse("  safe\n"), SafetyVerdict::Safe);
        let verdict = SafetyVerdict::parse("UNSAFE changes output order ");
        assert_eq!(
            verdict,
            SafetyVerdict::Unsafe {
                reason: "UNSAFE changes output order".to_string()
            }
        );
        assert!(verdict.is_unsafe());
    }

    #[test]
    fn test_critic_score_clamped() {
        let score = CriticScore {
            overall: 1.4,
            structural: -0.2,
            safety: f64::NAN,
            maintainability: 0.6,
            verdict: SafetyVerdict::Safe,
        }
        .clamped();
        assert_eq!(score.overall, 1.0);
        assert_eq!(score.structural, 0.0);
        assert_eq!(score.safety, 0.0);
        assert_eq!(score.maintainability, 0.6);
    }

    #[test]
    fn test_components_sums() {
        let c = RewardComponents {
            runtime: 0.2,
            test_bonus: 0.2,
            safety_penalty: 0.15,
            diversity_penalty: 0.05,
            ..Default::default()
        };
        assert!((c.positive() - 0.4).abs() < 1e-12);
        assert!((c.penalties() - 0.2).abs() < 1e-12);
    }
}
