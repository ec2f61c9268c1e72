//! optiloop sandbox.
//!
//! Runs candidate code as a child interpreter process under a deadline and
//! reports runtime, peak memory and exit status. Also hosts the input-side
//! guards that run before anything is executed: the [`Sanitizer`] and the
//! [`InputLimits`].
//!
//! Isolation is limited to a dedicated process group that is killed on
//! timeout; this is not a security boundary.

#![warn(missing_docs)]

mod config;
mod limits;
mod process;
mod sanitizer;

pub use config::SandboxConfig;
pub use limits::InputLimits;
pub use process::{ProcessSandbox, MEMORY_MARKER};
pub use sanitizer::{SanitizedCode, Sanitizer, DANGEROUS_CALLS, DANGEROUS_MODULES};

use async_trait::async_trait;
use optiloop_core::{BenchmarkResult, CodeArtifact, ExecutionOutcome};
use std::time::Duration;

/// Error type for sandbox operations.
pub type Result<T> = std::result::Result<T, SandboxError>;

/// Errors while preparing or starting an execution.
///
/// These never escape [`Sandbox`] methods; they are folded into a failed
/// [`ExecutionOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The interpreter could not be started
    #[error("Failed to spawn {interpreter}: {source}")]
    Spawn {
        /// Interpreter that failed to start
        interpreter: String,
        /// Underlying error
        source: std::io::Error,
    },
}

/// Executes and benchmarks code.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Run the code once. `None` uses the adaptive timeout.
    async fn execute(&self, code: &CodeArtifact, timeout: Option<Duration>) -> ExecutionOutcome;

    /// Run the code the configured number of times and average the metrics.
    async fn benchmark(&self, code: &CodeArtifact) -> BenchmarkResult;
}
