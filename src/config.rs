//! Configuration for motion comparison.
//!
//! [`ComparisonConfig`] centralizes every tunable threshold of the engine and
//! nests the [`ScoringPolicy`] that turns component scores into a final score.
//! All constants are policy, not derived values; they live here so they can
//! be tuned and tested independently of the algorithms.
//!
//! # Example
//!
//! ```
//! use motion_match::ComparisonConfig;
//!
//! let config = ComparisonConfig::default();
//! assert_eq!(config.nearest_sample_window_ms, 300);
//!
//! let strict = ComparisonConfig::strict().with_fast_dtw_radius(8);
//! assert!(strict.validate().is_ok());
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MotionError, Result};

/// Score penalty per degree of path-normalized DTW cost.
///
/// A uniform 15° deviation on two equal-length sequences yields a normalized
/// cost of 7.5 (`15·n / 2n`), which this factor turns into a 20-point penalty.
/// Frozen: changing it breaks score comparability across releases.
pub const DEFAULT_DTW_SCALE_FACTOR: f64 = 8.0 / 3.0;

/// Minimum samples per sequence for any comparison.
pub const DEFAULT_MIN_SEQUENCE_LENGTH: usize = 5;

/// Nearest-sample tolerance used for real-time pose matching.
pub const DEFAULT_NEAREST_SAMPLE_WINDOW_MS: u64 = 300;

/// FastDTW search radius.
pub const DEFAULT_FAST_DTW_RADIUS: usize = 5;

/// Detector confidence below which a landmark counts as missing.
pub const DEFAULT_MIN_LANDMARK_CONFIDENCE: f64 = 0.3;

/// Engine configuration.
///
/// # Core Parameters
///
/// - `dtw_scale_factor`: maps normalized DTW cost to a score penalty.
/// - `min_sequence_length`: shorter sequences are rejected, never padded.
/// - `fast_dtw_radius`: FastDTW refinement window half-width.
///
/// # Timing Parameters
///
/// - `significant_movement_threshold_degrees`: aggregate per-frame angle change
///   that marks a movement event.
/// - `gap_epsilon_degrees` / `gap_min_duration_ms`: what counts as a pause.
/// - `delay_grace_ms`, `speed_tolerance`, `speed_consistency`: pacing verdicts.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ComparisonConfig {
    /// Sum of per-joint angle changes (degrees) above which a frame is a
    /// significant movement.
    pub significant_movement_threshold_degrees: f64,

    /// Largest per-joint change (degrees) still considered "not moving".
    pub gap_epsilon_degrees: f64,

    /// Shortest stillness span reported as a gap.
    pub gap_min_duration_ms: u64,

    /// Tolerance for nearest-timestamp lookups.
    pub nearest_sample_window_ms: u64,

    /// FastDTW radius.
    pub fast_dtw_radius: usize,

    /// Score penalty per unit of normalized DTW cost.
    pub dtw_scale_factor: f64,

    /// Minimum sequence length for a valid comparison.
    pub min_sequence_length: usize,

    /// Landmarks below this detector confidence are treated as missing.
    pub min_landmark_confidence: f64,

    /// Allowed extra latency before the user's first movement.
    pub delay_grace_ms: u64,

    /// Relative interval difference tolerated before calling a pace slow/fast.
    pub speed_tolerance: f64,

    /// Fraction of movement intervals that must agree for a slow/fast verdict.
    pub speed_consistency: f64,

    /// Angle difference at which a single-frame joint score reaches zero.
    pub pose_angle_tolerance_degrees: f64,

    /// Final score blending and feedback policy.
    pub scoring: ScoringPolicy,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            significant_movement_threshold_degrees: 15.0,
            gap_epsilon_degrees: 2.0,
            gap_min_duration_ms: 1000,
            nearest_sample_window_ms: DEFAULT_NEAREST_SAMPLE_WINDOW_MS,
            fast_dtw_radius: DEFAULT_FAST_DTW_RADIUS,
            dtw_scale_factor: DEFAULT_DTW_SCALE_FACTOR,
            min_sequence_length: DEFAULT_MIN_SEQUENCE_LENGTH,
            min_landmark_confidence: DEFAULT_MIN_LANDMARK_CONFIDENCE,
            delay_grace_ms: 1000,
            speed_tolerance: 0.25,
            speed_consistency: 0.6,
            pose_angle_tolerance_degrees: 45.0,
            scoring: ScoringPolicy::default(),
        }
    }
}

impl ComparisonConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::InvalidConfig`] if any parameter is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.significant_movement_threshold_degrees.is_nan()
            || self.significant_movement_threshold_degrees <= 0.0
        {
            return Err(MotionError::invalid_config(
                "significant_movement_threshold_degrees must be positive",
            ));
        }
        if self.gap_epsilon_degrees.is_nan() || self.gap_epsilon_degrees < 0.0 {
            return Err(MotionError::invalid_config(
                "gap_epsilon_degrees must be non-negative",
            ));
        }
        if self.fast_dtw_radius == 0 {
            return Err(MotionError::invalid_config(
                "fast_dtw_radius must be at least 1",
            ));
        }
        if !self.dtw_scale_factor.is_finite() || self.dtw_scale_factor <= 0.0 {
            return Err(MotionError::invalid_config(
                "dtw_scale_factor must be positive and finite",
            ));
        }
        if self.min_sequence_length < 2 {
            return Err(MotionError::invalid_config(
                "min_sequence_length must be at least 2",
            ));
        }
        if !(0.0..=1.0).contains(&self.min_landmark_confidence) {
            return Err(MotionError::invalid_config(
                "min_landmark_confidence must be within [0, 1]",
            ));
        }
        if !(0.0..1.0).contains(&self.speed_tolerance) {
            return Err(MotionError::invalid_config(
                "speed_tolerance must be within [0, 1)",
            ));
        }
        if self.speed_consistency.is_nan()
            || self.speed_consistency <= 0.5
            || self.speed_consistency > 1.0
        {
            return Err(MotionError::invalid_config(
                "speed_consistency must be within (0.5, 1]",
            ));
        }
        if self.pose_angle_tolerance_degrees.is_nan() || self.pose_angle_tolerance_degrees <= 0.0 {
            return Err(MotionError::invalid_config(
                "pose_angle_tolerance_degrees must be positive",
            ));
        }
        self.scoring.validate()
    }

    /// Preset for coached practice: tighter timing and pose tolerances.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            significant_movement_threshold_degrees: 10.0,
            gap_min_duration_ms: 600,
            delay_grace_ms: 500,
            speed_tolerance: 0.15,
            pose_angle_tolerance_degrees: 30.0,
            min_landmark_confidence: 0.5,
            ..Self::default()
        }
    }

    /// Preset for beginners and noisy detectors.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            significant_movement_threshold_degrees: 20.0,
            gap_epsilon_degrees: 3.0,
            gap_min_duration_ms: 1500,
            delay_grace_ms: 2000,
            speed_tolerance: 0.35,
            pose_angle_tolerance_degrees: 60.0,
            min_landmark_confidence: 0.2,
            fast_dtw_radius: 10,
            ..Self::default()
        }
    }

    /// Set the FastDTW radius.
    #[must_use]
    pub const fn with_fast_dtw_radius(mut self, radius: usize) -> Self {
        self.fast_dtw_radius = radius;
        self
    }

    /// Set the minimum sequence length.
    #[must_use]
    pub const fn with_min_sequence_length(mut self, len: usize) -> Self {
        self.min_sequence_length = len;
        self
    }

    /// Set the nearest-sample window.
    #[must_use]
    pub const fn with_nearest_sample_window_ms(mut self, window_ms: u64) -> Self {
        self.nearest_sample_window_ms = window_ms;
        self
    }

    /// Set the significant-movement threshold.
    #[must_use]
    pub const fn with_significant_movement_threshold(mut self, degrees: f64) -> Self {
        self.significant_movement_threshold_degrees = degrees;
        self
    }

    /// Set the gap detection parameters.
    #[must_use]
    pub const fn with_gap_detection(mut self, epsilon_degrees: f64, min_duration_ms: u64) -> Self {
        self.gap_epsilon_degrees = epsilon_degrees;
        self.gap_min_duration_ms = min_duration_ms;
        self
    }

    /// Set the delay grace period.
    #[must_use]
    pub const fn with_delay_grace_ms(mut self, grace_ms: u64) -> Self {
        self.delay_grace_ms = grace_ms;
        self
    }

    /// Replace the scoring policy.
    #[must_use]
    pub fn with_scoring(mut self, scoring: ScoringPolicy) -> Self {
        self.scoring = scoring;
        self
    }
}

/// How component scores combine into the final score and feedback.
///
/// FastDTW is diagnostic only: the final score is
/// `round(dtw_weight · mean_joint_dtw + pose_weight · latest_pose)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScoringPolicy {
    /// Weight of the mean per-joint DTW score.
    pub dtw_weight: f64,

    /// Weight of the latest-frame pose comparison.
    pub pose_weight: f64,

    /// Lower bounds of the feedback tiers, best tier first. Must be strictly
    /// decreasing; scores below the last bound fall into the lowest tier.
    pub tier_thresholds: [f64; 6],
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            dtw_weight: 0.7,
            pose_weight: 0.3,
            tier_thresholds: [90.0, 80.0, 70.0, 60.0, 50.0, 30.0],
        }
    }
}

impl ScoringPolicy {
    /// Validate weights and tier ordering.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::InvalidConfig`] for negative weights, weights not
    /// summing to 1, or non-decreasing tier thresholds.
    pub fn validate(&self) -> Result<()> {
        if self.dtw_weight < 0.0 || self.pose_weight < 0.0 {
            return Err(MotionError::invalid_config("score weights must be non-negative"));
        }
        if ((self.dtw_weight + self.pose_weight) - 1.0).abs() > 1e-9 {
            return Err(MotionError::invalid_config("score weights must sum to 1"));
        }
        let ordered = self.tier_thresholds.windows(2).all(|w| w[0] > w[1]);
        let in_range = self
            .tier_thresholds
            .iter()
            .all(|t| (0.0..=100.0).contains(t));
        if !ordered || !in_range {
            return Err(MotionError::invalid_config(
                "tier thresholds must be strictly decreasing within [0, 100]",
            ));
        }
        Ok(())
    }
}
