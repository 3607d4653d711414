//! Error types for motion comparison operations.
//!
//! Every failure the engine can report is a [`MotionError`]. Most of them are
//! local to one joint or one step and are absorbed by the evaluation session;
//! only [`MotionError::InsufficientData`] for the whole evaluation reaches the
//! caller of [`crate::EvaluationSession::finish`].

use thiserror::Error;

use crate::pose::JointName;

/// Main error type for motion comparison operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    /// The joint angle is undefined for the given landmarks.
    #[error("Degenerate geometry for {joint}: missing landmark or zero-length limb segment")]
    DegenerateGeometry { joint: JointName },

    /// A sample was not newer than the last one recorded for its joint.
    #[error("Out-of-order sample for {joint}: {got_ms}ms is not after {last_ms}ms")]
    OutOfOrderSample {
        joint: JointName,
        last_ms: u64,
        got_ms: u64,
    },

    /// Too few samples or frames for a meaningful comparison.
    #[error("Insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Angle vectors disagree in length or joint ordering.
    #[error("Dimension mismatch: {detail}")]
    DimensionMismatch { detail: String },

    /// A value failed validation at construction.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for motion comparison operations.
pub type Result<T> = std::result::Result<T, MotionError>;

impl MotionError {
    /// Create a degenerate geometry error.
    #[must_use]
    pub const fn degenerate(joint: JointName) -> Self {
        Self::DegenerateGeometry { joint }
    }

    /// Create an out-of-order sample error.
    #[must_use]
    pub const fn out_of_order(joint: JointName, last_ms: u64, got_ms: u64) -> Self {
        Self::OutOfOrderSample {
            joint,
            last_ms,
            got_ms,
        }
    }

    /// Create an insufficient data error.
    #[must_use]
    pub const fn insufficient(required: usize, actual: usize) -> Self {
        Self::InsufficientData { required, actual }
    }

    /// Create a dimension mismatch error for differing joint counts.
    #[must_use]
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            detail: format!("expected {expected} joints, got {actual}"),
        }
    }

    /// Create a dimension mismatch error for joint lists that differ in
    /// membership or order.
    #[must_use]
    pub fn joint_order_mismatch(expected: &[JointName], actual: &[JointName]) -> Self {
        if expected.len() != actual.len() {
            return Self::dimension_mismatch(expected.len(), actual.len());
        }
        let names = |joints: &[JointName]| {
            joints
                .iter()
                .map(|j| j.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        Self::DimensionMismatch {
            detail: format!(
                "joints [{}] do not match expected [{}]",
                names(actual),
                names(expected)
            ),
        }
    }

    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether this error is the "not enough data" condition.
    #[must_use]
    pub const fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}
