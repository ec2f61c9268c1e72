//! Candidate critic.

use crate::chat::ChatModel;
use crate::error::Result;
use crate::prompts::critic_prompts;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use optiloop_core::{CodeArtifact, CriticScore, SafetyVerdict};
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

/// Scores a candidate against the code it was derived from.
#[async_trait]
pub trait Critic: Send + Sync {
    /// Quality scores and regression verdict for `candidate`.
    async fn score(&self, original: &CodeArtifact, candidate: &CodeArtifact) -> Result<CriticScore>;
}

/// First JSON-looking object in a reply
static SCORE_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^}]+\}").expect("Invalid score object regex"));

/// Parse the scoring reply.
///
/// The first `{...}` object in the reply overrides the defaults
/// (structural 0.7, safety 0.8, maintainability 0.7, overall 0.7) key by
/// key; anything unparseable leaves the defaults in place. The verdict is
/// always `Safe` here.
pub fn parse_scores(reply: &str) -> CriticScore {
    let mut score = CriticScore {
        overall: 0.7,
        structural: 0.7,
        safety: 0.8,
        maintainability: 0.7,
        verdict: SafetyVerdict::Safe,
    };

    let Some(object) = SCORE_OBJECT.find(reply) else {
        return score;
    };

    match serde_json::from_str::<serde_json::Value>(object.as_str()) {
        Ok(value) => {
            let read = |key: &str| value.get(key).and_then(serde_json::Value::as_f64);
            if let Some(v) = read("overall") {
                score.overall = v;
            }
            if let Some(v) = read("structural") {
                score.structural = v;
            }
            if let Some(v) = read("safety") {
                score.safety = v;
            }
            if let Some(v) = read("maintainability") {
                score.maintainability = v;
            }
        }
        Err(e) => debug!("Critic scores not parseable, using defaults: {}", e),
    }

    score.clamped()
}

/// Critic backed by a chat model: one scoring call, one regression call.
pub struct LlmCritic {
    chat: Arc<dyn ChatModel>,
}

impl LlmCritic {
    /// Create a critic.
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl Critic for LlmCritic {
    async fn score(&self, original: &CodeArtifact, candidate: &CodeArtifact) -> Result<CriticScore> {
        let (scoring, regression) = critic_prompts(original, candidate);

        let mut score = parse_scores(&self.chat.complete(&scoring).await?);
        score.verdict = SafetyVerdict::parse(&self.chat.complete(&regression).await?);

        debug!(
            "Critic: overall {:.2}, unsafe {}",
            score.overall,
            score.verdict.is_unsafe()
        );
        Ok(score)
    }
}
