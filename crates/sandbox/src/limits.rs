//! Input size limits.

use optiloop_core::{CodeArtifact, OptimizeError};
use serde::{Deserialize, Serialize};

/// Maximum accepted input size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLimits {
    /// Maximum number of lines
    pub max_lines: usize,

    /// Maximum number of characters
    pub max_chars: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_lines: 300,
            max_chars: 10_000,
        }
    }
}

impl InputLimits {
    /// Custom limits.
    pub fn new(max_lines: usize, max_chars: usize) -> Self {
        Self { max_lines, max_chars }
    }

    /// Reject code exceeding either limit.
    pub fn check(&self, code: &CodeArtifact) -> Result<(), OptimizeError> {
        if code.lines() > self.max_lines {
            return Err(OptimizeError::InputTooLarge(format!(
                "code exceeds maximum length of {} lines ({} lines)",
                self.max_lines,
                code.lines()
            )));
        }
        if code.chars() > self.max_chars {
            return Err(OptimizeError::InputTooLarge(format!(
                "code exceeds maximum size of {} characters ({} characters)",
                self.max_chars,
                code.chars()
            )));
        }
        Ok(())
    }
}
