//! Agent errors.

use std::time::Duration;

/// Error type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors from generators, the critic and the chat backend.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API rejected the request or is misconfigured
    #[error("API error: {0}")]
    Api(String),

    /// The model returned no content
    #[error("Empty response from model")]
    EmptyResponse,

    /// The reply could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// The call did not finish in time
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}
