//! Exact dynamic time warping for single-joint angle sequences.
//!
//! The full `n × m` accumulated-cost recurrence is evaluated with no
//! warping window; per-joint sequences are short enough that the quadratic
//! pass is cheap. Only the final cost is needed, so two rolling rows suffice.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{ComparisonConfig, DEFAULT_DTW_SCALE_FACTOR, DEFAULT_MIN_SEQUENCE_LENGTH};
use crate::error::{MotionError, Result};
use crate::math::cost_to_score;
use crate::pose::JointName;
use crate::sequence::AngleSequence;

/// Alignment result for one joint.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DtwResult {
    pub joint: JointName,
    /// Similarity in `[0, 100]`; higher is better.
    pub score: f64,
    /// Accumulated absolute angle difference along the optimal path.
    pub raw_cost: f64,
    /// `raw_cost / (user_len + reference_len)`.
    pub normalized_cost: f64,
    pub user_len: usize,
    pub reference_len: usize,
}

/// Accumulated DTW cost between two angle series.
///
/// Returns `None` if either series is empty.
///
/// # Example
///
/// ```
/// use motion_match::dtw::dtw_cost;
///
/// // A slowed-down copy aligns at zero cost
/// let cost = dtw_cost(&[10.0, 20.0, 30.0], &[10.0, 10.0, 20.0, 20.0, 30.0]).unwrap();
/// assert_eq!(cost, 0.0);
/// ```
#[must_use]
pub fn dtw_cost(user: &[f64], reference: &[f64]) -> Option<f64> {
    if user.is_empty() || reference.is_empty() {
        return None;
    }

    let m = reference.len();
    let mut prev = vec![0.0_f64; m];
    let mut curr = vec![0.0_f64; m];

    for (i, &u) in user.iter().enumerate() {
        for (j, &r) in reference.iter().enumerate() {
            let d = (u - r).abs();
            curr[j] = d + match (i, j) {
                (0, 0) => 0.0,
                (0, _) => curr[j - 1],
                (_, 0) => prev[0],
                _ => prev[j].min(curr[j - 1]).min(prev[j - 1]),
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    Some(prev[m - 1])
}

/// Per-joint exact DTW scorer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarDtw {
    scale_factor: f64,
    min_len: usize,
}

impl ScalarDtw {
    #[must_use]
    pub const fn new(scale_factor: f64, min_len: usize) -> Self {
        Self {
            scale_factor,
            min_len,
        }
    }

    #[must_use]
    pub const fn from_config(config: &ComparisonConfig) -> Self {
        Self::new(config.dtw_scale_factor, config.min_sequence_length)
    }

    #[must_use]
    pub const fn min_len(&self) -> usize {
        self.min_len
    }

    /// Align the user's sequence for `joint` against the reference's.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::InsufficientData`] if either sequence is
    /// shorter than the minimum length.
    pub fn compare(
        &self,
        user: &AngleSequence,
        reference: &AngleSequence,
        joint: JointName,
    ) -> Result<DtwResult> {
        self.compare_angles(&user.angles(), &reference.angles(), joint)
    }

    /// Same as [`ScalarDtw::compare`] on bare angle series.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::InsufficientData`] if either series is
    /// shorter than the minimum length.
    pub fn compare_angles(
        &self,
        user: &[f64],
        reference: &[f64],
        joint: JointName,
    ) -> Result<DtwResult> {
        let shortest = user.len().min(reference.len());
        if shortest < self.min_len {
            return Err(MotionError::insufficient(self.min_len, shortest));
        }
        let raw_cost =
            dtw_cost(user, reference).ok_or(MotionError::insufficient(self.min_len, 0))?;
        let normalized_cost = raw_cost / (user.len() + reference.len()) as f64;

        Ok(DtwResult {
            joint,
            score: cost_to_score(normalized_cost, self.scale_factor),
            raw_cost,
            normalized_cost,
            user_len: user.len(),
            reference_len: reference.len(),
        })
    }
}

impl Default for ScalarDtw {
    fn default() -> Self {
        Self::new(DEFAULT_DTW_SCALE_FACTOR, DEFAULT_MIN_SEQUENCE_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const JOINT: JointName = JointName::LeftElbow;

    fn wave(n: usize) -> Vec<f64> {
        (0..n).map(|i| 90.0 + 40.0 * (i as f64 * 0.4).sin()).collect()
    }

    #[test]
    fn test_identical_sequences() {
        let s = wave(30);
        let result = ScalarDtw::default().compare_angles(&s, &s, JOINT).unwrap();
        assert_relative_eq!(result.raw_cost, 0.0);
        assert_relative_eq!(result.score, 100.0);
    }

    #[test]
    fn test_constant_offset() {
        let user = AngleSequence::from_angles(JOINT, &[120.0; 10], 33).unwrap();
        let reference = AngleSequence::from_angles(JOINT, &[90.0; 10], 33).unwrap();
        let result = ScalarDtw::default().compare(&user, &reference, JOINT).unwrap();

        assert_relative_eq!(result.raw_cost, 300.0, epsilon = 1e-9);
        assert_relative_eq!(result.normalized_cost, 15.0, epsilon = 1e-9);
        assert_relative_eq!(result.score, 60.0, epsilon = 1e-9);
        assert_eq!((result.user_len, result.reference_len), (10, 10));
    }

    #[test]
    fn test_fifteen_degree_deviation_costs_twenty_points() {
        let reference = wave(20);
        let user: Vec<f64> = reference.iter().map(|a| a + 15.0).collect();
        let result = ScalarDtw::default().compare_angles(&user, &reference, JOINT).unwrap();
        // Warping can only shorten the diagonal cost
        assert!(result.score >= 80.0 - 1e-9);
        assert!(result.score < 100.0);
    }

    #[test]
    fn test_short_sequences_rejected() {
        let dtw = ScalarDtw::default();
        let err = dtw.compare_angles(&[1.0; 4], &[1.0; 10], JOINT).unwrap_err();
        assert_eq!(err, MotionError::insufficient(5, 4));
        assert!(dtw.compare_angles(&[1.0; 10], &[], JOINT).unwrap_err().is_insufficient_data());
        assert!(dtw.compare_angles(&[1.0; 5], &[1.0; 5], JOINT).is_ok());
    }

    #[test]
    fn test_slower_copy_beats_noise() {
        let s = wave(20);
        let slow: Vec<f64> = s.iter().flat_map(|&a| [a, a]).collect();
        let noisy: Vec<f64> = s
            .iter()
            .enumerate()
            .map(|(i, &a)| if i % 2 == 0 { a + 15.0 } else { a - 15.0 })
            .collect();

        let dtw = ScalarDtw::default();
        let slow_score = dtw.compare_angles(&slow, &s, JOINT).unwrap().score;
        let noisy_score = dtw.compare_angles(&noisy, &s, JOINT).unwrap().score;
        assert_relative_eq!(slow_score, 100.0);
        assert!(slow_score >= noisy_score);
    }

    #[test]
    fn test_score_clamped_at_zero() {
        let result = ScalarDtw::default()
            .compare_angles(&[0.0; 6], &[180.0; 6], JOINT)
            .unwrap();
        assert_relative_eq!(result.score, 0.0);
    }

    #[test]
    fn test_dtw_cost_edge_rows() {
        assert_eq!(dtw_cost(&[], &[1.0]), None);
        assert_relative_eq!(dtw_cost(&[5.0], &[1.0, 2.0, 3.0]).unwrap(), 9.0);
        assert_relative_eq!(dtw_cost(&[1.0, 2.0, 3.0], &[5.0]).unwrap(), 9.0);
    }
}
