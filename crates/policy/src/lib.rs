//! optiloop decision policy.
//!
//! Loads a trained policy head once and adapts its output into the
//! meta-action that steers the refinement loop: which strategy to use,
//! which generator families to run and how to weigh the objectives.
//! Without a model (or when inference fails) a fixed fallback applies.

#![warn(missing_docs)]

mod model;
mod adapter;

pub use model::{
    softmax, ActionModel, Activation, DenseLayer, MlpPolicyModel, PolicyError, Result,
};
pub use adapter::{
    action_profile, argmax, blend_weights, entropy, sanitize_probabilities, ActionProfile,
    PolicyAdapter, ACTION_PROFILES, FALLBACK_DEPTH,
};

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Build an adapter from an optional model path.
///
/// A missing or invalid model file is logged and yields the fallback
/// adapter rather than an error.
pub fn load_adapter(path: Option<&Path>) -> PolicyAdapter {
    let Some(path) = path else {
        return PolicyAdapter::without_model();
    };
    match MlpPolicyModel::load(path) {
        Ok(model) => {
            info!("Policy model '{}' loaded from {}", model.id, path.display());
            PolicyAdapter::new(Arc::new(model))
        }
        Err(e) => {
            warn!("Failed to load policy model from {}: {}", path.display(), e);
            PolicyAdapter::without_model()
        }
    }
}
