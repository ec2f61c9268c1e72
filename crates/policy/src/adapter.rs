//! Decision policy adapter.
//!
//! Wraps an optional [`ActionModel`] and turns its raw distribution into a
//! [`MetaAction`]: selected strategy, agent mask, suggested depth and
//! objective weights blended from caller preferences and the action's bias.

use crate::model::{ActionModel, PolicyError, Result};
use optiloop_core::{
    MetaAction, ObjectiveWeights, Observation, PolicyDiagnostics, StrategyAction, StrategyMask,
    ACTION_COUNT,
};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, warn};

const ENTROPY_EPSILON: f64 = 1e-8;

/// Share of each weight taken from the caller's preference.
const PREFERENCE_SHARE: f64 = 0.7;

/// Refinement depth suggested by the fallback policy.
pub const FALLBACK_DEPTH: usize = 3;

/// Fixed per-action mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionProfile {
    /// Active generator families
    pub mask: StrategyMask,
    /// Suggested refinement depth
    pub depth: usize,
    /// Objective bias of the action
    pub bias: ObjectiveWeights,
}

const fn profile(mask: (bool, bool, bool), depth: usize, bias: (f64, f64, f64)) -> ActionProfile {
    ActionProfile {
        mask: StrategyMask::new(mask.0, mask.1, mask.2),
        depth,
        bias: ObjectiveWeights {
            runtime: bias.0,
            memory: bias.1,
            quality: bias.2,
        },
    }
}

/// Profiles indexed by [`StrategyAction::index`].
pub const ACTION_PROFILES: [ActionProfile; ACTION_COUNT] = [
    profile((true, false, false), 1, (0.7, 0.3, 0.3)),
    profile((false, true, false), 2, (0.3, 0.7, 0.3)),
    profile((true, true, false), 3, (0.7, 0.7, 0.3)),
    profile((true, false, true), 3, (0.7, 0.3, 0.7)),
    profile((false, true, true), 4, (0.3, 0.7, 0.7)),
    profile((true, true, true), 5, (0.7, 0.7, 0.7)),
    profile((false, false, false), 1, (0.3, 0.3, 0.3)),
];

/// Profile of an action.
pub fn action_profile(action: StrategyAction) -> &'static ActionProfile {
    &ACTION_PROFILES[action.index()]
}

/// Shannon entropy in nats, `-Σ p ln(p + ε)`, never negative.
pub fn entropy(probs: &[f64]) -> f64 {
    let h: f64 = probs
        .iter()
        .map(|p| -p * (p + ENTROPY_EPSILON).ln())
        .sum();
    h.max(0.0)
}

/// First index holding the largest probability.
pub fn argmax(probs: &[f64]) -> usize {
    let mut best = 0;
    for (i, p) in probs.iter().enumerate() {
        if *p > probs[best] {
            best = i;
        }
    }
    best
}

/// Zero out non-finite and negative entries and renormalize.
pub fn sanitize_probabilities(raw: [f64; ACTION_COUNT]) -> Result<[f64; ACTION_COUNT]> {
    let mut probs = raw.map(|p| if p.is_finite() && p > 0.0 { p } else { 0.0 });
    let sum: f64 = probs.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return Err(PolicyError::Inference(
            "model returned an all-zero distribution".to_string(),
        ));
    }
    for p in &mut probs {
        *p /= sum;
    }
    Ok(probs)
}

/// Blend preferences with the action's bias and renormalize.
pub fn blend_weights(preferences: ObjectiveWeights, action: StrategyAction) -> ObjectiveWeights {
    let bias = action_profile(action).bias;
    let blend = |pref: f64, bias: f64| PREFERENCE_SHARE * pref + (1.0 - PREFERENCE_SHARE) * bias;
    ObjectiveWeights::new(
        blend(preferences.runtime, bias.runtime),
        blend(preferences.memory, bias.memory),
        blend(preferences.quality, bias.quality),
    )
    .normalized()
}

fn sample(probs: &[f64], rng: &mut impl Rng) -> usize {
    let draw: f64 = rng.gen::<f64>();
    let mut cumulative = 0.0;
    for (i, p) in probs.iter().enumerate() {
        cumulative += p;
        if draw < cumulative {
            return i;
        }
    }
    // Rounding can leave the cumulative sum just under 1.
    probs.iter().rposition(|p| *p > 0.0).unwrap_or(0)
}

/// Maps observations to meta-actions through an optional model.
#[derive(Clone, Default)]
pub struct PolicyAdapter {
    model: Option<Arc<dyn ActionModel>>,
}

impl std::fmt::Debug for PolicyAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyAdapter")
            .field("model", &self.model_id())
            .finish()
    }
}

impl PolicyAdapter {
    /// Adapter backed by a loaded model.
    pub fn new(model: Arc<dyn ActionModel>) -> Self {
        Self { model: Some(model) }
    }

    /// Adapter that always uses the fallback policy.
    pub fn without_model() -> Self {
        Self { model: None }
    }

    /// Identifier of the backing model, if any.
    pub fn model_id(&self) -> Option<&str> {
        self.model.as_ref().map(|model| model.id())
    }

    /// Whether a model is configured.
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    fn infer(&self, observation: &Observation) -> Result<[f64; ACTION_COUNT]> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| PolicyError::Inference("no model loaded".to_string()))?;
        let observation = Observation::from_slice(observation.as_slice());
        sanitize_probabilities(model.probabilities(&observation)?)
    }

    /// Choose a meta-action for the observation.
    ///
    /// Deterministic calls pick the most likely action; otherwise the
    /// action is sampled. Without a usable model the fallback policy runs.
    pub fn act(
        &self,
        observation: &Observation,
        preferences: ObjectiveWeights,
        deterministic: bool,
    ) -> MetaAction {
        self.act_with_rng(observation, preferences, deterministic, &mut rand::thread_rng())
    }

    /// [`act`](Self::act) with an explicit random source.
    pub fn act_with_rng(
        &self,
        observation: &Observation,
        preferences: ObjectiveWeights,
        deterministic: bool,
        rng: &mut impl Rng,
    ) -> MetaAction {
        if !self.has_model() {
            warn!("No policy model configured, using fallback strategy");
            return Self::fallback(preferences);
        }

        let probs = match self.infer(observation) {
            Ok(probs) => probs,
            Err(e) => {
                warn!("Policy inference failed, using fallback strategy: {}", e);
                return Self::fallback(preferences);
            }
        };

        let index = if deterministic {
            argmax(&probs)
        } else {
            sample(&probs, rng)
        };
        let action = StrategyAction::from_index(index).unwrap_or(StrategyAction::Algorithmic);
        let profile = action_profile(action);
        let meta = MetaAction {
            selected_action: action,
            action_probabilities: probs,
            entropy: entropy(&probs),
            confidence: probs.iter().copied().fold(0.0, f64::max),
            refinement_depth: profile.depth,
            strategy_mask: profile.mask,
            weights: blend_weights(preferences, action),
            model_id: self.model_id().map(str::to_string),
            fallback: false,
        };
        debug!(
            "Policy selected {} (confidence {:.3}, entropy {:.3})",
            action, meta.confidence, meta.entropy
        );
        meta
    }

    /// The meta-action used when no model is available.
    pub fn fallback(preferences: ObjectiveWeights) -> MetaAction {
        let mut probs = [0.0; ACTION_COUNT];
        probs[StrategyAction::Algorithmic.index()] = 1.0;
        MetaAction {
            selected_action: StrategyAction::Algorithmic,
            action_probabilities: probs,
            entropy: 0.0,
            confidence: 1.0,
            refinement_depth: FALLBACK_DEPTH,
            strategy_mask: StrategyMask::ALL,
            weights: preferences.normalized(),
            model_id: None,
            fallback: true,
        }
    }

    /// Distribution summary for the trace.
    ///
    /// Falls back to the uniform distribution when the model is missing or
    /// fails.
    pub fn diagnostics(&self, observation: &Observation) -> PolicyDiagnostics {
        let (probabilities, fallback) = match self.infer(observation) {
            Ok(probs) => (probs, false),
            Err(e) => {
                if self.has_model() {
                    warn!("Policy diagnostics failed: {}", e);
                }
                ([1.0 / ACTION_COUNT as f64; ACTION_COUNT], true)
            }
        };
        let index = argmax(&probabilities);
        PolicyDiagnostics {
            probabilities,
            entropy: entropy(&probabilities),
            confidence: probabilities[index],
            argmax: StrategyAction::from_index(index).unwrap_or(StrategyAction::Algorithmic),
            fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct FixedModel([f64; ACTION_COUNT]);

    impl ActionModel for FixedModel {
        fn id(&self) -> &str {
            "fixed"
        }

        fn probabilities(&self, _observation: &Observation) -> Result<[f64; ACTION_COUNT]> {
            Ok(self.0)
        }
    }

    struct BrokenModel;

    impl ActionModel for BrokenModel {
        fn id(&self) -> &str {
            "broken"
        }

        fn probabilities(&self, _observation: &Observation) -> Result<[f64; ACTION_COUNT]> {
            Err(PolicyError::Inference("boom".to_string()))
        }
    }

    fn adapter(probs: [f64; ACTION_COUNT]) -> PolicyAdapter {
        PolicyAdapter::new(Arc::new(FixedModel(probs)))
    }

    fn prefs() -> ObjectiveWeights {
        ObjectiveWeights::new(0.6, 0.25, 0.15)
    }

    #[test]
    fn test_profiles_match_actions() {
        assert_eq!(action_profile(StrategyAction::Algorithmic).mask, StrategyMask::new(true, false, false));
        assert_eq!(action_profile(StrategyAction::Vectorization).depth, 4);
        assert_eq!(action_profile(StrategyAction::AlternativeSolution).mask, StrategyMask::ALL);
        assert!(action_profile(StrategyAction::Stop).mask.is_empty());
    }

    #[test]
    fn test_deterministic_picks_argmax() {
        let meta = adapter([0.1, 0.1, 0.5, 0.1, 0.1, 0.05, 0.05]).act(&Observation::zeros(), prefs(), true);
        assert_eq!(meta.selected_action, StrategyAction::InPlace);
        assert_eq!(meta.strategy_mask, StrategyMask::new(true, true, false));
        assert_eq!(meta.refinement_depth, 3);
        assert!((meta.confidence - 0.5).abs() < 1e-12);
        assert!(!meta.fallback);
        assert_eq!(meta.model_id.as_deref(), Some("fixed"));
    }

    #[test]
    fn test_ties_pick_first() {
        let meta = adapter([0.3, 0.3, 0.1, 0.1, 0.1, 0.05, 0.05]).act(&Observation::zeros(), prefs(), true);
        assert_eq!(meta.selected_action, StrategyAction::Algorithmic);
    }

    #[test]
    fn test_weights_blend_and_normalize() {
        let meta = adapter([0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]).act(&Observation::zeros(), prefs(), true);
        let w = meta.weights;
        assert!((w.total() - 1.0).abs() < 1e-6);
        // raw: 0.51, 0.385, 0.195
        assert!((w.runtime - 0.51 / 1.09).abs() < 1e-9);
        assert!((w.memory - 0.385 / 1.09).abs() < 1e-9);
    }

    #[test]
    fn test_probabilities_are_sanitized() {
        let meta = adapter([f64::NAN, -1.0, 2.0, 2.0, 0.0, 0.0, 0.0]).act(&Observation::zeros(), prefs(), true);
        let sum: f64 = meta.action_probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert_eq!(meta.action_probabilities[0], 0.0);
        assert_eq!(meta.selected_action, StrategyAction::InPlace);
    }

    #[test]
    fn test_entropy_of_point_mass_and_uniform() {
        let mut point = [0.0; ACTION_COUNT];
        point[0] = 1.0;
        assert!(entropy(&point) < 1e-6);
        let uniform = [1.0 / 7.0; ACTION_COUNT];
        assert!((entropy(&uniform) - 7f64.ln()).abs() < 1e-6);
    }

    #[test]
    fn test_no_model_falls_back() {
        let meta = PolicyAdapter::without_model().act(&Observation::zeros(), prefs(), true);
        assert!(meta.fallback);
        assert_eq!(meta.selected_action, StrategyAction::Algorithmic);
        assert_eq!(meta.action_probabilities, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(meta.entropy, 0.0);
        assert_eq!(meta.confidence, 1.0);
        assert_eq!(meta.refinement_depth, FALLBACK_DEPTH);
        assert_eq!(meta.strategy_mask, StrategyMask::ALL);
        assert!((meta.weights.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_with_zero_preferences_uses_default_split() {
        let meta = PolicyAdapter::fallback(ObjectiveWeights::new(0.0, 0.0, 0.0));
        assert_eq!(meta.weights, ObjectiveWeights::default());
    }

    #[test]
    fn test_inference_error_falls_back() {
        let meta = PolicyAdapter::new(Arc::new(BrokenModel)).act(&Observation::zeros(), prefs(), true);
        assert!(meta.fallback);

        let meta = adapter([0.0; ACTION_COUNT]).act(&Observation::zeros(), prefs(), true);
        assert!(meta.fallback);
    }

    #[test]
    fn test_stochastic_sampling_follows_distribution() {
        let adapter = adapter([0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let meta = adapter.act_with_rng(&Observation::zeros(), prefs(), false, &mut rng);
            assert_eq!(meta.selected_action, StrategyAction::Vectorization);
        }
    }

    #[test]
    fn test_stochastic_sampling_covers_support() {
        let adapter = adapter([0.5, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = [false; 2];
        for _ in 0..200 {
            let meta = adapter.act_with_rng(&Observation::zeros(), prefs(), false, &mut rng);
            seen[meta.selected_action.index()] = true;
        }
        assert!(seen[0] && seen[1]);
    }

    #[test]
    fn test_diagnostics_uniform_without_model() {
        let diag = PolicyAdapter::without_model().diagnostics(&Observation::zeros());
        assert!(diag.fallback);
        assert!((diag.entropy - 7f64.ln()).abs() < 1e-6);
        assert!((diag.confidence - 1.0 / 7.0).abs() < 1e-12);
        assert_eq!(diag.argmax, StrategyAction::Algorithmic);
    }

    #[test]
    fn test_diagnostics_with_model() {
        let diag = adapter([0.0, 0.0, 0.0, 0.0, 0.0, 0.2, 0.8]).diagnostics(&Observation::zeros());
        assert!(!diag.fallback);
        assert_eq!(diag.argmax, StrategyAction::Stop);
        assert!((diag.confidence - 0.8).abs() < 1e-12);
    }
}
