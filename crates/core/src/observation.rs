//! Fixed-length observation vector consumed by the decision policy.

use serde::{Deserialize, Serialize};

/// Length of every observation.
pub const OBSERVATION_DIM: usize = 64;

/// A 64-dimensional feature vector with every entry in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation(Vec<f32>);

impl Observation {
    /// The all-zero observation.
    pub fn zeros() -> Self {
        Self(vec![0.0; OBSERVATION_DIM])
    }

    /// Build an observation from a slice of any length.
    ///
    /// Shorter inputs are zero-padded, longer inputs truncated, and
    /// non-finite entries replaced by zero.
    pub fn from_slice(values: &[f32]) -> Self {
        let mut features = vec![0.0; OBSERVATION_DIM];
        for (slot, value) in features.iter_mut().zip(values) {
            *slot = if value.is_finite() { *value } else { 0.0 };
        }
        Self(features)
    }

    /// Feature values.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Feature at `index`, or 0 when out of range.
    pub fn get(&self, index: usize) -> f32 {
        self.0.get(index).copied().unwrap_or(0.0)
    }

    /// Whether every feature is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }
}

impl Default for Observation {
    fn default() -> Self {
        Self::zeros()
    }
}

impl From<[f32; OBSERVATION_DIM]> for Observation {
    fn from(values: [f32; OBSERVATION_DIM]) -> Self {
        Self::from_slice(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_pads_short_input() {
        let obs = Observation::from_slice(&[0.5; 32]);
        assert_eq!(obs.as_slice().len(), OBSERVATION_DIM);
        assert_eq!(obs.get(31), 0.5);
        assert_eq!(obs.get(32), 0.0);
    }

    #[test]
    fn test_from_slice_truncates_long_input() {
        let obs = Observation::from_slice(&[0.25; 100]);
        assert_eq!(obs.as_slice().len(), OBSERVATION_DIM);
        assert_eq!(obs.get(63), 0.25);
    }

    #[test]
    fn test_from_slice_drops_nan() {
        let obs = Observation::from_slice(&[f32::NAN, f32::INFINITY, 0.1]);
        assert_eq!(obs.get(0), 0.0);
        assert_eq!(obs.get(1), 0.0);
        assert_eq!(obs.get(2), 0.1);
    }

    #[test]
    fn test_zeros() {
        assert!(Observation::zeros().is_zero());
        assert!(!Observation::from_slice(&[1.0]).is_zero());
    }
}
