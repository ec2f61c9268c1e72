//! optiloop refinement engine.
//!
//! Drives one optimization call end to end: sanitize and benchmark the
//! input, ask the decision policy for a meta-action once, apply the
//! override rules, then run a bounded number of refinement rounds in which
//! the active generator families propose candidates that are benchmarked,
//! critiqued and scored. The best candidate ever promoted is the result.

#![warn(missing_docs)]

mod config;
mod orchestrator;
mod overrides;
mod state;

pub use config::EngineConfig;
pub use orchestrator::Orchestrator;
pub use overrides::{apply_overrides, Decision};
pub use state::{RefinementState, BEST_REWARD_SENTINEL};

/// Result type for optimization calls.
pub type Result<T> = std::result::Result<T, optiloop_core::OptimizeError>;
