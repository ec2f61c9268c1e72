//! Candidate generators.

use crate::chat::ChatModel;
use crate::error::{AgentError, Result};
use crate::prompts::{agent_prompt, strategy_prompt};
use async_trait::async_trait;
use optiloop_core::{AgentKind, CodeArtifact, StrategyAction};
use std::sync::Arc;
use tracing::debug;

/// Proposes a rewrite of the working code.
#[async_trait]
pub trait CandidateGenerator: Send + Sync {
    /// Agent family this generator belongs to.
    fn kind(&self) -> AgentKind;

    /// Propose a rewritten version of `code`.
    async fn propose(&self, code: &CodeArtifact) -> Result<String>;
}

/// Generator backed by a chat model.
pub struct LlmGenerator {
    kind: AgentKind,
    chat: Arc<dyn ChatModel>,
    strategy: Option<StrategyAction>,
}

impl LlmGenerator {
    /// Generator using the family prompt for `kind`.
    pub fn new(kind: AgentKind, chat: Arc<dyn ChatModel>) -> Self {
        Self {
            kind,
            chat,
            strategy: None,
        }
    }

    /// Use the strategy prompt for `action` instead of the family prompt.
    pub fn with_strategy(mut self, action: StrategyAction) -> Self {
        self.strategy = Some(action);
        self
    }

    /// One generator per agent family, sharing the chat model.
    pub fn family(chat: Arc<dyn ChatModel>) -> Vec<Arc<dyn CandidateGenerator>> {
        AgentKind::ALL
            .iter()
            .map(|kind| Arc::new(Self::new(*kind, chat.clone())) as Arc<dyn CandidateGenerator>)
            .collect()
    }

    fn prompt(&self, code: &CodeArtifact) -> String {
        match self.strategy {
            Some(action) => strategy_prompt(action, code),
            None => agent_prompt(self.kind, code),
        }
    }
}

#[async_trait]
impl CandidateGenerator for LlmGenerator {
    fn kind(&self) -> AgentKind {
        self.kind
    }

    async fn propose(&self, code: &CodeArtifact) -> Result<String> {
        let reply = self.chat.complete(&self.prompt(code)).await?;
        if reply.trim().is_empty() {
            return Err(AgentError::EmptyResponse);
        }
        debug!("{} proposed {} chars", self.kind.label(), reply.len());
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records prompts and answers with a fixed reply.
    struct EchoChat {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl EchoChat {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for EchoChat {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn test_propose_uses_family_prompt() {
        let chat = Arc::new(EchoChat::new("print(2)"));
        let generator = LlmGenerator::new(AgentKind::Runtime, chat.clone());
        let reply = generator.propose(&CodeArtifact::new("print(1)")).await.unwrap();
        assert_eq!(reply, "print(2)");
        assert_eq!(generator.kind(), AgentKind::Runtime);

        let prompts = chat.prompts.lock().unwrap();
        assert!(prompts[0].contains("runtime performance"));
        assert!(prompts[0].ends_with("print(1)"));
    }

    #[tokio::test]
    async fn test_strategy_prompt_override() {
        let chat = Arc::new(EchoChat::new("x = 1"));
        let generator = LlmGenerator::new(AgentKind::Memory, chat.clone())
            .with_strategy(StrategyAction::Vectorization);
        generator.propose(&CodeArtifact::new("x = 1")).await.unwrap();
        assert!(chat.prompts.lock().unwrap()[0].contains("vectorization"));
    }

    #[tokio::test]
    async fn test_blank_reply_is_error() {
        let generator = LlmGenerator::new(AgentKind::Readability, Arc::new(EchoChat::new("   ")));
        let err = generator.propose(&CodeArtifact::new("x = 1")).await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyResponse));
    }

    #[test]
    fn test_family_covers_every_kind() {
        let family = LlmGenerator::family(Arc::new(EchoChat::new("x")));
        let kinds: Vec<AgentKind> = family.iter().map(|g| g.kind()).collect();
        assert_eq!(kinds, AgentKind::ALL.to_vec());
    }
}
