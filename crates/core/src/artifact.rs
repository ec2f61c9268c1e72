//! Code artifacts and execution results.

use serde::{Deserialize, Serialize};

/// An immutable piece of source code.
///
/// Every transformation (sanitizing, rewriting) produces a new artifact;
/// the text is never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeArtifact {
    text: String,
    lines: usize,
    chars: usize,
}

impl CodeArtifact {
    /// Wrap source text, deriving line and character counts.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        // Newline-separated segments: "" is one line, "a\n" is two.
        let lines = text.split('\n').count();
        let chars = text.chars().count();
        Self { text, lines, chars }
    }

    /// Source text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of newline-separated lines.
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Number of characters.
    pub fn chars(&self) -> usize {
        self.chars
    }

    /// Whether the artifact holds only whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Consume the artifact, returning its text.
    pub fn into_text(self) -> String {
        self.text
    }
}

impl From<&str> for CodeArtifact {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for CodeArtifact {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl std::fmt::Display for CodeArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Result of a single sandboxed execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Whether the process exited with status 0 before the deadline
    pub success: bool,

    /// Captured standard output
    pub output: String,

    /// Captured standard error, or the failure reason
    pub error: Option<String>,

    /// Wall-clock runtime in seconds (the timeout on a timeout)
    pub runtime_seconds: f64,

    /// Peak memory in MB (0 when not measured)
    pub memory_mb: f64,

    /// Process return code (-1 when killed or never started)
    pub return_code: i32,

    /// Whether the execution hit its deadline
    pub timed_out: bool,
}

impl ExecutionOutcome {
    /// An outcome for a process that could not be run at all.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
            runtime_seconds: 0.0,
            memory_mb: 0.0,
            return_code: -1,
            timed_out: false,
        }
    }
}

/// Averaged benchmark metrics for a piece of code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Whether at least one run succeeded
    pub success: bool,

    /// Average runtime in seconds over successful runs
    pub runtime: f64,

    /// Average peak memory in MB over successful runs
    pub memory: f64,

    /// Fraction of passing runs, in [0, 1]
    pub test_pass_rate: f64,

    /// Error from the last failing run
    pub error: Option<String>,

    /// Number of runs attempted
    pub runs: usize,
}

impl BenchmarkResult {
    /// A successful benchmark.
    pub fn succeeded(runtime: f64, memory: f64, test_pass_rate: f64) -> Self {
        Self {
            success: true,
            runtime: runtime.max(0.0),
            memory: memory.max(0.0),
            test_pass_rate: test_pass_rate.clamp(0.0, 1.0),
            error: None,
            runs: 1,
        }
    }

    /// A failed benchmark.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            runtime: 0.0,
            memory: 0.0,
            test_pass_rate: 0.0,
            error: Some(error.into()),
            runs: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_counts() {
        let code = CodeArtifact::new("def f():\n    return 1\n");
        assert_eq!(code.lines(), 3);
        assert_eq!(code.chars(), 22);
        assert!(!code.is_blank());
    }

    #[test]
    fn test_empty_artifact_has_one_line() {
        let code = CodeArtifact::new("");
        assert_eq!(code.lines(), 1);
        assert!(code.is_blank());
    }

    #[test]
    fn test_benchmark_constructors_clamp() {
        let ok = BenchmarkResult::succeeded(-1.0, 2.0, 1.5);
        assert!(ok.success);
        assert_eq!(ok.runtime, 0.0);
        assert_eq!(ok.test_pass_rate, 1.0);

        let failed = BenchmarkResult::failed("boom");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }
}
