//! Optimization requests, per-round trace and the final report.

use crate::action::{AgentKind, MetaAction, ObjectiveWeights, StrategyAction, ACTION_COUNT};
use crate::error::OptimizeError;
use crate::id::RunId;
use crate::reward::RewardComponents;
use crate::Time;
use serde::{Deserialize, Serialize};

/// Fewest refinement rounds a request may ask for.
pub const MIN_REFINEMENTS: usize = 1;

/// Most refinement rounds a request may ask for.
pub const MAX_REFINEMENTS: usize = 5;

/// One optimization call's input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    /// Source code to optimize
    pub code: String,

    /// Number of refinement rounds
    pub max_refinements: usize,

    /// Runtime preference in `[0, 1]`
    pub runtime_preference: f64,

    /// Memory preference in `[0, 1]`
    pub memory_preference: f64,

    /// Quality preference in `[0, 1]`
    pub quality_preference: f64,
}

impl OptimizationRequest {
    /// Request with default budget (3 rounds) and the default preference split.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            max_refinements: 3,
            runtime_preference: 0.6,
            memory_preference: 0.25,
            quality_preference: 0.15,
        }
    }

    /// Set the number of rounds.
    pub fn with_max_refinements(mut self, rounds: usize) -> Self {
        self.max_refinements = rounds;
        self
    }

    /// Set the three preferences.
    pub fn with_preferences(mut self, runtime: f64, memory: f64, quality: f64) -> Self {
        self.runtime_preference = runtime;
        self.memory_preference = memory;
        self.quality_preference = quality;
        self
    }

    /// Check ranges; out-of-range values are fatal.
    pub fn validate(&self) -> Result<(), OptimizeError> {
        if self.code.trim().is_empty() {
            return Err(OptimizeError::EmptyInput);
        }
        if !(MIN_REFINEMENTS..=MAX_REFINEMENTS).contains(&self.max_refinements) {
            return Err(OptimizeError::InvalidRequest(format!(
                "max_refinements must be in {}..={}, got {}",
                MIN_REFINEMENTS, MAX_REFINEMENTS, self.max_refinements
            )));
        }
        for (name, value) in [
            ("runtime_preference", self.runtime_preference),
            ("memory_preference", self.memory_preference),
            ("quality_preference", self.quality_preference),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(OptimizeError::InvalidRequest(format!(
                    "{} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// A policy rule the orchestrator applied on top of the model's choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum AppliedOverride {
    /// Stop was replaced by the most likely non-stop action
    StopRerouted {
        /// Replacement action
        to: StrategyAction,
        /// Its probability
        probability: f64,
    },
    /// Memory agent switched on for memory-heavy code
    MemoryForced {
        /// Baseline memory that triggered the rule (MB)
        baseline_memory_mb: f64,
        /// Memory weight after renormalization
        memory_weight: f64,
    },
    /// Empty mask replaced by the runtime agent
    RuntimeForced,
}

/// Per-round snapshot of the policy's view of the working code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDiagnostics {
    /// 7-way distribution
    pub probabilities: [f64; ACTION_COUNT],
    /// Entropy (nats)
    pub entropy: f64,
    /// Maximum probability
    pub confidence: f64,
    /// Most likely action
    pub argmax: StrategyAction,
    /// Whether the uniform fallback was used
    pub fallback: bool,
}

/// One refinement round in the trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Round number, starting at 1
    pub round: usize,

    /// Winning agent, if any candidate survived
    pub agent: Option<AgentKind>,

    /// Winning reward, if any candidate survived
    pub reward: Option<f64>,

    /// Candidates requested this round
    pub attempted: usize,

    /// Candidates that survived sanitizing and benchmarking
    pub survived: usize,

    /// Policy diagnostics for the working code after the round
    pub diagnostics: PolicyDiagnostics,

    /// Objective weights in effect
    pub weights: ObjectiveWeights,

    /// Reward breakdown of the winner
    pub components: Option<RewardComponents>,

    /// Winner's runtime improvement over baseline (%)
    pub runtime_improvement_pct: f64,

    /// Winner's memory improvement over baseline (%)
    pub memory_improvement_pct: f64,

    /// Whether the winner replaced the best code
    pub promoted: bool,
}

/// Baseline and final metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetrics {
    /// Baseline runtime (s)
    pub baseline_runtime: f64,
    /// Baseline peak memory (MB)
    pub baseline_memory: f64,
    /// Optimized runtime (s)
    pub optimized_runtime: f64,
    /// Optimized peak memory (MB)
    pub optimized_memory: f64,
    /// Runtime improvement (%)
    pub runtime_improvement_pct: f64,
    /// Memory improvement (%)
    pub memory_improvement_pct: f64,
    /// Test pass rate of the final code
    pub test_pass_rate: f64,
}

impl ReportMetrics {
    /// Build metrics, deriving the improvement percentages.
    pub fn new(
        baseline_runtime: f64,
        baseline_memory: f64,
        optimized_runtime: f64,
        optimized_memory: f64,
        test_pass_rate: f64,
    ) -> Self {
        Self {
            baseline_runtime,
            baseline_memory,
            optimized_runtime,
            optimized_memory,
            runtime_improvement_pct: improvement_pct(baseline_runtime, optimized_runtime),
            memory_improvement_pct: improvement_pct(baseline_memory, optimized_memory),
            test_pass_rate,
        }
    }
}

/// Relative improvement in percent; 0 when the baseline is not positive.
pub fn improvement_pct(baseline: f64, optimized: f64) -> f64 {
    if baseline > 0.0 {
        (baseline - optimized) / baseline * 100.0
    } else {
        0.0
    }
}

/// Result of one optimization call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    /// Run identifier
    pub run_id: RunId,

    /// Best code found (the sanitized input if nothing improved)
    pub optimized_code: String,

    /// Winning agent family, `None` when nothing was promoted
    pub strategy: Option<AgentKind>,

    /// Display label ("Runtime Agent", or "None")
    pub strategy_label: String,

    /// Best reward (0.0 when nothing was promoted)
    pub reward: f64,

    /// Baseline and final metrics
    pub metrics: ReportMetrics,

    /// One entry per round
    pub trace: Vec<TraceEntry>,

    /// Objective weights after overrides
    pub objective_weights: ObjectiveWeights,

    /// Raw policy output, before overrides
    pub meta_action: MetaAction,

    /// Override rules that fired
    pub applied_overrides: Vec<AppliedOverride>,

    /// Rounds executed
    pub refinement_depth: usize,

    /// Sanitizer warnings for the input
    pub warnings: Vec<String>,

    /// Call start
    pub started_at: Time,

    /// Call end
    pub finished_at: Time,
}

impl OptimizationReport {
    /// Whether any round promoted a candidate.
    pub fn improved(&self) -> bool {
        self.strategy.is_some()
    }
}
