//! optiloop core data models.
//!
//! This crate defines the data contracts shared by the refinement loop:
//! code artifacts, benchmark results, observations, meta-actions, rewards
//! and the per-round trace returned to callers.

#![warn(missing_docs)]

// Identities
mod id;

// Code and execution
mod artifact;

// Policy surface
mod action;
mod observation;

// Scoring and reporting
mod reward;
mod report;
mod error;

// Re-exports
pub use id::RunId;

// Code & execution
pub use artifact::{BenchmarkResult, CodeArtifact, ExecutionOutcome};

// Policy
pub use action::{
    AgentKind, MetaAction, ObjectiveWeights, StrategyAction, StrategyMask,
    ACTION_COUNT, DEFAULT_WEIGHTS,
};
pub use observation::{Observation, OBSERVATION_DIM};

// Reward & report
pub use reward::{CriticScore, RewardComponents, RewardResult, SafetyVerdict};
pub use report::{
    AppliedOverride, OptimizationReport, OptimizationRequest, PolicyDiagnostics,
    ReportMetrics, TraceEntry, improvement_pct, MAX_REFINEMENTS, MIN_REFINEMENTS,
};
pub use error::OptimizeError;

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
