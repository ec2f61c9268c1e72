//! Run identifiers.
//!
//! A run id is a ULID, so ids sort by start time and carry the instant
//! the run began. They print as `run-<ulid>`; parsing accepts the bare
//! ULID as well.

use crate::Time;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

const PREFIX: &str = "run-";

/// Identifies one optimization call in logs and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Ulid);

impl RunId {
    /// Id for a run starting now.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// When the run was started, to the millisecond.
    pub fn started_at(&self) -> Time {
        Time::from(self.0.datetime())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", PREFIX, self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(PREFIX).unwrap_or(s);
        Ok(Self(raw.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_prefixed_and_parses_back() {
        let id = RunId::new();
        let shown = id.to_string();
        assert!(shown.starts_with("run-"));
        assert_eq!(shown.parse::<RunId>().unwrap(), id);
        assert_eq!(shown["run-".len()..].parse::<RunId>().unwrap(), id);
        assert!("run-not-a-ulid".parse::<RunId>().is_err());
    }

    #[test]
    fn test_started_at_tracks_creation() {
        let before = chrono::Utc::now() - chrono::Duration::milliseconds(1);
        let id = RunId::new();
        let after = chrono::Utc::now() + chrono::Duration::milliseconds(1);
        assert!(id.started_at() >= before && id.started_at() <= after);
    }

    #[test]
    fn test_serializes_as_bare_ulid() {
        let id = RunId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json.trim_matches('"').len(), 26);
    }
}
