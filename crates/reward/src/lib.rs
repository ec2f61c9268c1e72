//! optiloop reward engine.
//!
//! Scores a benchmarked candidate against the working code with a single
//! scalar in `[-1, 1]`, combining weighted runtime, memory and quality
//! gains with bonuses and penalties.

#![warn(missing_docs, unused_crate_dependencies)]

mod config;
mod engine;

pub use config::RewardConfig;
pub use engine::{relative_gain, score, RewardEngine, RewardInputs};
