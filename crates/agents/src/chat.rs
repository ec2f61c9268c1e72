//! OpenAI-compatible chat completion client.

use crate::error::{AgentError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// System message sent with every request.
pub const SYSTEM_PROMPT: &str =
    "You are an expert code optimizer. Return only optimized code, no explanations.";

/// A chat model answering a single user prompt.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete `prompt` and return the reply text with any code fence removed.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Chat backend configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// API base, e.g. `https://api.openai.com/v1`
    pub base_url: String,

    /// Bearer token
    pub api_key: String,

    /// Model name
    pub model: String,

    /// Completion token limit
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f64,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 500,
            temperature: 0.2,
            timeout: Duration::from_secs(60),
        }
    }
}

impl ChatConfig {
    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Set the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full `/chat/completions` endpoint.
    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else {
            format!("{}/chat/completions", base)
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the first choice's content from a raw completion body.
fn parse_completion(body: &str) -> Result<String> {
    let response: CompletionResponse =
        serde_json::from_str(body).map_err(|e| AgentError::Parse(e.to_string()))?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(AgentError::EmptyResponse)?;
    let content = strip_code_fence(&content);
    if content.trim().is_empty() {
        return Err(AgentError::EmptyResponse);
    }
    Ok(content)
}

/// Remove a surrounding markdown code fence (```` ```python ... ``` ````).
pub fn strip_code_fence(reply: &str) -> String {
    let trimmed = reply.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let mut lines: Vec<&str> = trimmed.split('\n').collect();
    if lines.len() > 1 {
        lines.remove(0);
    }
    if lines.last().map(|l| l.trim() == "```").unwrap_or(false) {
        lines.pop();
    }
    lines.join("\n")
}

/// HTTP client for an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    config: ChatConfig,
}

impl ChatClient {
    /// Build a client. A blank API key is rejected.
    pub fn new(config: ChatConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AgentError::Api("missing API key".to_string()));
        }
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Active configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = CompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(self.config.api_key.trim())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Timeout(self.config.timeout)
                } else {
                    AgentError::Http(e)
                }
            })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AgentError::Api(format!("status {}: {}", status.as_u16(), body)));
        }

        debug!("Chat completion received ({} bytes)", body.len());
        parse_completion(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```python\nx = 1\n```"), "x = 1");
        assert_eq!(strip_code_fence("```\nx = 1\ny = 2\n```\n"), "x = 1\ny = 2");
        assert_eq!(strip_code_fence("  x = 1  "), "x = 1");
        // unterminated fence keeps the body
        assert_eq!(strip_code_fence("```python\nx = 1"), "x = 1");
    }

    #[test]
    fn test_endpoint() {
        let config = ChatConfig::default().with_base_url("http://localhost:8080/v1/");
        assert_eq!(config.endpoint(), "http://localhost:8080/v1/chat/completions");

        let config = ChatConfig::default().with_base_url("http://host/chat/completions");
        assert_eq!(config.endpoint(), "http://host/chat/completions");
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"```python\nprint(1)\n```"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "print(1)");
    }

    #[test]
    fn test_parse_completion_errors() {
        assert!(matches!(
            parse_completion(r#"{"choices":[]}"#),
            Err(AgentError::EmptyResponse)
        ));
        assert!(matches!(
            parse_completion(r#"{"choices":[{"message":{"content":"  "}}]}"#),
            Err(AgentError::EmptyResponse)
        ));
        assert!(matches!(parse_completion("not json"), Err(AgentError::Parse(_))));
    }

    #[test]
    fn test_missing_api_key() {
        let err = ChatClient::new(ChatConfig::default()).unwrap_err();
        assert!(matches!(err, AgentError::Api(_)));
    }

    #[test]
    fn test_default_config() {
        let config = ChatConfig::default();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_tokens, 500);
        assert_eq!(config.temperature, 0.2);
    }
}
