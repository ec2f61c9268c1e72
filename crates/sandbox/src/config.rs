//! Sandbox configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`ProcessSandbox`](crate::ProcessSandbox).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Interpreter binary
    pub interpreter: String,

    /// Timeout before the size-based extension
    pub base_timeout: Duration,

    /// Upper bound on the size-based extension
    pub max_extension: Duration,

    /// Executions per benchmark
    pub runs: usize,

    /// Measure peak memory through the tracemalloc harness
    pub measure_memory: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            base_timeout: Duration::from_secs(15),
            max_extension: Duration::from_secs(5),
            runs: 1,
            measure_memory: true,
        }
    }
}

impl SandboxConfig {
    /// Set the interpreter.
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Set the base timeout.
    pub fn with_base_timeout(mut self, timeout: Duration) -> Self {
        self.base_timeout = timeout;
        self
    }

    /// Set the number of runs per benchmark (at least one).
    pub fn with_runs(mut self, runs: usize) -> Self {
        self.runs = runs.max(1);
        self
    }

    /// Enable or disable memory measurement.
    pub fn with_memory_measurement(mut self, enabled: bool) -> Self {
        self.measure_memory = enabled;
        self
    }

    /// Adaptive timeout: base plus one second per 2000 characters, capped.
    pub fn timeout_for(&self, chars: usize) -> Duration {
        let extension = (chars as f64 / 2000.0).min(self.max_extension.as_secs_f64());
        self.base_timeout + Duration::from_secs_f64(extension.max(0.0))
    }
}
