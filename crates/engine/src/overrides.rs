//! Rules applied on top of the policy's meta-action.

use crate::config::EngineConfig;
use optiloop_core::{
    AgentKind, AppliedOverride, MetaAction, ObjectiveWeights, StrategyAction, StrategyMask,
};
use optiloop_policy::{action_profile, argmax};
use tracing::{info, warn};

/// The effective decision after override rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Action after rerouting
    pub action: StrategyAction,

    /// Generator families to run
    pub mask: StrategyMask,

    /// Normalized objective weights
    pub weights: ObjectiveWeights,

    /// Rules that fired, in order
    pub overrides: Vec<AppliedOverride>,
}

/// Apply the override rules in order: Stop reroute, memory forcing,
/// runtime forcing. Weights are renormalized at the end.
pub fn apply_overrides(
    meta: &MetaAction,
    rounds: usize,
    baseline_memory: f64,
    memory_preference: f64,
    config: &EngineConfig,
) -> Decision {
    let mut action = meta.selected_action;
    let mut mask = meta.strategy_mask;
    let mut weights = meta.weights;
    let mut overrides = Vec::new();

    if action.is_stop() && rounds > config.stop_reroute_min_rounds {
        let non_stop = &meta.action_probabilities[..StrategyAction::Stop.index()];
        let index = argmax(non_stop);
        let to = StrategyAction::from_index(index).unwrap_or(StrategyAction::Algorithmic);
        warn!(
            "Stop rerouted to {} (p={:.3}) with {} rounds budgeted",
            to, non_stop[index], rounds
        );
        action = to;
        mask = action_profile(to).mask;
        overrides.push(AppliedOverride::StopRerouted {
            to,
            probability: non_stop[index],
        });
    }

    if baseline_memory > config.memory_override_threshold_mb
        && memory_preference > config.memory_preference_threshold
        && !mask.contains(AgentKind::Memory)
    {
        mask = mask.with(AgentKind::Memory);
        weights.memory = weights.memory.max(memory_preference);
        weights = weights.normalized();
        info!(
            "Memory-heavy baseline ({:.2} MB), forcing memory agent; memory weight {:.3}",
            baseline_memory, weights.memory
        );
        overrides.push(AppliedOverride::MemoryForced {
            baseline_memory_mb: baseline_memory,
            memory_weight: weights.memory,
        });
    }

    if mask.is_empty() && rounds > 0 {
        warn!("Empty strategy mask, forcing runtime agent");
        mask = mask.with(AgentKind::Runtime);
        overrides.push(AppliedOverride::RuntimeForced);
    }

    Decision {
        action,
        mask,
        weights: weights.normalized(),
        overrides,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optiloop_policy::PolicyAdapter;

    fn meta(action: StrategyAction, probs: [f64; 7]) -> MetaAction {
        let profile = action_profile(action);
        MetaAction {
            selected_action: action,
            action_probabilities: probs,
            entropy: 1.0,
            confidence: probs.iter().copied().fold(0.0, f64::max),
            refinement_depth: profile.depth,
            strategy_mask: profile.mask,
            weights: ObjectiveWeights::new(0.5, 0.3, 0.2),
            model_id: Some("test".to_string()),
            fallback: false,
        }
    }

    #[test]
    fn test_no_rules_fire() {
        let meta = meta(StrategyAction::Algorithmic, [0.9, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let decision = apply_overrides(&meta, 3, 5.0, 0.25, &EngineConfig::default());
        assert_eq!(decision.action, StrategyAction::Algorithmic);
        assert_eq!(decision.mask, StrategyMask::new(true, false, false));
        assert!(decision.overrides.is_empty());
    }

    #[test]
    fn test_stop_rerouted_to_best_non_stop() {
        let meta = meta(StrategyAction::Stop, [0.1, 0.05, 0.05, 0.2, 0.05, 0.05, 0.5]);
        let decision = apply_overrides(&meta, 3, 1.0, 0.25, &EngineConfig::default());
        assert_eq!(decision.action, StrategyAction::RecursionToIteration);
        assert_eq!(decision.mask, StrategyMask::new(true, false, true));
        assert_eq!(
            decision.overrides,
            vec![AppliedOverride::StopRerouted {
                to: StrategyAction::RecursionToIteration,
                probability: 0.2,
            }]
        );
    }

    #[test]
    fn test_stop_kept_on_short_budget_but_runtime_forced() {
        let meta = meta(StrategyAction::Stop, [0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.9]);
        let decision = apply_overrides(&meta, 2, 1.0, 0.25, &EngineConfig::default());
        assert_eq!(decision.action, StrategyAction::Stop);
        assert_eq!(decision.mask, StrategyMask::new(true, false, false));
        assert_eq!(decision.overrides, vec![AppliedOverride::RuntimeForced]);
    }

    #[test]
    fn test_memory_forced_for_heavy_baseline() {
        let meta = meta(StrategyAction::Algorithmic, [0.9, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let decision = apply_overrides(&meta, 3, 20.0, 0.5, &EngineConfig::default());
        assert_eq!(decision.mask, StrategyMask::new(true, true, false));
        assert!(decision.weights.memory > 0.3);
        assert!((decision.weights.total() - 1.0).abs() < 1e-9);
        assert!(matches!(
            decision.overrides[0],
            AppliedOverride::MemoryForced { baseline_memory_mb, .. } if baseline_memory_mb == 20.0
        ));
    }

    #[test]
    fn test_memory_rule_needs_both_thresholds() {
        let meta = meta(StrategyAction::Algorithmic, [0.9, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let config = EngineConfig::default();
        assert!(apply_overrides(&meta, 3, 20.0, 0.3, &config).overrides.is_empty());
        assert!(apply_overrides(&meta, 3, 10.0, 0.5, &config).overrides.is_empty());
    }

    #[test]
    fn test_fallback_meta_passes_through() {
        let fallback = PolicyAdapter::fallback(ObjectiveWeights::new(2.0, 1.0, 1.0));
        let decision = apply_overrides(&fallback, 3, 50.0, 0.9, &EngineConfig::default());
        assert_eq!(decision.mask, StrategyMask::ALL);
        assert!(decision.overrides.is_empty());
        assert!((decision.weights.runtime - 0.5).abs() < 1e-9);
    }
}
