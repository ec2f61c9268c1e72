//! optiloop feature encoder.
//!
//! Turns Python source plus its baseline metrics into the fixed
//! 64-dimensional [`Observation`](optiloop_core::Observation) the decision
//! policy consumes. Source is parsed with tree-sitter; code the Python
//! grammar rejects encodes to the zero vector.

#![warn(missing_docs)]

mod scanner;
mod features;

pub use scanner::{scan, NodeCounts, ScanError, ScanReport};
pub use features::{encode, encode_report, LINT_SCORE, TEST_PASS_RATIO};
