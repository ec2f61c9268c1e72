//! optiloop agents.
//!
//! Candidate generators propose rewrites of the working code, one family
//! per [`AgentKind`](optiloop_core::AgentKind); the critic scores a rewrite
//! against the code it came from. Both are backed by an OpenAI-compatible
//! chat completion API through [`ChatClient`].

#![warn(missing_docs)]

mod chat;
mod critic;
mod error;
mod generator;
mod prompts;

pub use chat::{strip_code_fence, ChatClient, ChatConfig, ChatModel, SYSTEM_PROMPT};
pub use critic::{parse_scores, Critic, LlmCritic};
pub use error::{AgentError, Result};
pub use generator::{CandidateGenerator, LlmGenerator};
pub use prompts::{agent_prompt, critic_prompts, strategy_prompt};
