//! Fatal errors of an optimization call.

/// Errors that abort an optimization call.
///
/// Everything else (generator failures, discarded candidates, critic or
/// policy problems) is logged and absorbed by the loop.
#[derive(Debug, thiserror::Error)]
pub enum OptimizeError {
    /// Input code was empty or whitespace
    #[error("Input code is empty")]
    EmptyInput,

    /// Sanitization produced nothing usable
    #[error("Sanitization failed: {0}")]
    Sanitization(String),

    /// Input exceeds the configured limits
    #[error("Input too large: {0}")]
    InputTooLarge(String),

    /// Request parameters out of range
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The baseline benchmark failed
    #[error("Baseline execution failed: {0}")]
    BaselineFailed(String),
}
