//! Strategy actions, agent masks and objective weights.

use serde::{Deserialize, Serialize};

/// Number of discrete strategy actions.
pub const ACTION_COUNT: usize = 7;

/// Default runtime / memory / quality split.
pub const DEFAULT_WEIGHTS: ObjectiveWeights = ObjectiveWeights {
    runtime: 0.6,
    memory: 0.25,
    quality: 0.15,
};

/// A discrete optimization strategy chosen by the decision policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyAction {
    /// Better algorithms and data structures
    Algorithmic,
    /// Reduce memory footprint
    Memory,
    /// Mutate in place instead of allocating
    InPlace,
    /// Replace recursion with iteration
    RecursionToIteration,
    /// Vectorize loops
    Vectorization,
    /// Free-form alternative solution
    AlternativeSolution,
    /// Do nothing
    Stop,
}

impl StrategyAction {
    /// All actions in index order.
    pub const ALL: [StrategyAction; ACTION_COUNT] = [
        StrategyAction::Algorithmic,
        StrategyAction::Memory,
        StrategyAction::InPlace,
        StrategyAction::RecursionToIteration,
        StrategyAction::Vectorization,
        StrategyAction::AlternativeSolution,
        StrategyAction::Stop,
    ];

    /// Stable action index (0..=6).
    pub fn index(self) -> usize {
        match self {
            StrategyAction::Algorithmic => 0,
            StrategyAction::Memory => 1,
            StrategyAction::InPlace => 2,
            StrategyAction::RecursionToIteration => 3,
            StrategyAction::Vectorization => 4,
            StrategyAction::AlternativeSolution => 5,
            StrategyAction::Stop => 6,
        }
    }

    /// Action for an index, if in range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            StrategyAction::Algorithmic => "Algorithmic Optimization",
            StrategyAction::Memory => "Memory Optimization",
            StrategyAction::InPlace => "In-place Refactor",
            StrategyAction::RecursionToIteration => "Recursion-to-Iteration",
            StrategyAction::Vectorization => "Vectorization",
            StrategyAction::AlternativeSolution => "Alternative Solution",
            StrategyAction::Stop => "Stop",
        }
    }

    /// Whether this is the stop action.
    pub fn is_stop(self) -> bool {
        self == StrategyAction::Stop
    }
}

impl std::fmt::Display for StrategyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A candidate-generator family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Runtime-focused rewrites
    Runtime,
    /// Memory-focused rewrites
    Memory,
    /// Readability-focused rewrites
    Readability,
}

impl AgentKind {
    /// All kinds in mask bit order.
    pub const ALL: [AgentKind; 3] = [AgentKind::Runtime, AgentKind::Memory, AgentKind::Readability];

    /// Short lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            AgentKind::Runtime => "runtime",
            AgentKind::Memory => "memory",
            AgentKind::Readability => "readability",
        }
    }

    /// Label used in reports ("Runtime Agent").
    pub fn label(self) -> &'static str {
        match self {
            AgentKind::Runtime => "Runtime Agent",
            AgentKind::Memory => "Memory Agent",
            AgentKind::Readability => "Readability Agent",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which generator families are active (runtime, memory, readability).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StrategyMask {
    /// Runtime agent active
    pub runtime: bool,
    /// Memory agent active
    pub memory: bool,
    /// Readability agent active
    pub readability: bool,
}

impl StrategyMask {
    /// No agent active.
    pub const NONE: StrategyMask = StrategyMask::new(false, false, false);

    /// All agents active.
    pub const ALL: StrategyMask = StrategyMask::new(true, true, true);

    /// Build a mask from its three bits.
    pub const fn new(runtime: bool, memory: bool, readability: bool) -> Self {
        Self {
            runtime,
            memory,
            readability,
        }
    }

    /// Whether the given family is active.
    pub fn contains(&self, kind: AgentKind) -> bool {
        match kind {
            AgentKind::Runtime => self.runtime,
            AgentKind::Memory => self.memory,
            AgentKind::Readability => self.readability,
        }
    }

    /// Copy of the mask with a family switched on.
    pub fn with(mut self, kind: AgentKind) -> Self {
        match kind {
            AgentKind::Runtime => self.runtime = true,
            AgentKind::Memory => self.memory = true,
            AgentKind::Readability => self.readability = true,
        }
        self
    }

    /// Whether no family is active.
    pub fn is_empty(&self) -> bool {
        !(self.runtime || self.memory || self.readability)
    }

    /// Active families in bit order.
    pub fn active(&self) -> Vec<AgentKind> {
        AgentKind::ALL
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .collect()
    }

    /// Mask as `[r, m, q]` with 0/1 entries.
    pub fn bits(&self) -> [u8; 3] {
        [
            self.runtime as u8,
            self.memory as u8,
            self.readability as u8,
        ]
    }
}

impl std::fmt::Display for StrategyMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [r, m, q] = self.bits();
        write!(f, "[{r},{m},{q}]")
    }
}

/// Relative importance of the three objectives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    /// Runtime weight
    pub runtime: f64,
    /// Memory weight
    pub memory: f64,
    /// Quality weight
    pub quality: f64,
}

impl ObjectiveWeights {
    /// Build weights without normalizing.
    pub fn new(runtime: f64, memory: f64, quality: f64) -> Self {
        Self {
            runtime,
            memory,
            quality,
        }
    }

    /// Sum of the three weights.
    pub fn total(&self) -> f64 {
        self.runtime + self.memory + self.quality
    }

    /// Weights scaled to sum to 1.
    ///
    /// Falls back to [`DEFAULT_WEIGHTS`] when the sum is not a positive
    /// finite number.
    pub fn normalized(&self) -> Self {
        let total = self.total();
        if total > 0.0 && total.is_finite() {
            Self {
                runtime: self.runtime / total,
                memory: self.memory / total,
                quality: self.quality / total,
            }
        } else {
            DEFAULT_WEIGHTS
        }
    }
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

/// The decision policy's per-call output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaAction {
    /// Selected strategy
    pub selected_action: StrategyAction,

    /// Full 7-way distribution, sums to 1
    pub action_probabilities: [f64; ACTION_COUNT],

    /// Shannon entropy of the distribution (nats)
    pub entropy: f64,

    /// Maximum probability
    pub confidence: f64,

    /// Suggested refinement depth for the action
    pub refinement_depth: usize,

    /// Active generator families
    pub strategy_mask: StrategyMask,

    /// Objective weights, sum to 1
    pub weights: ObjectiveWeights,

    /// Identifier of the model that produced this action
    pub model_id: Option<String>,

    /// Whether this is the no-model fallback
    pub fallback: bool,
}
