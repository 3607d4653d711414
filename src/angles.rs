//! Joint angle extraction from landmark frames.
//!
//! Each [`JointName`] has a fixed landmark triple `(a, b, c)`; its angle is
//! the interior angle at `b`. A joint whose landmarks are missing, below the
//! confidence floor, or coincident is skipped for that frame. No default
//! angle is ever substituted.

use crate::config::DEFAULT_MIN_LANDMARK_CONFIDENCE;
use crate::error::{MotionError, Result};
use crate::math::interior_angle_degrees;
use crate::pose::{JointName, LandmarkFrame, Position};
use crate::sequence::AngleFrame;

/// Converts landmark frames into joint angles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleExtractor {
    min_confidence: f64,
}

impl AngleExtractor {
    /// Create an extractor that ignores landmarks below `min_confidence`.
    #[must_use]
    pub const fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }

    #[must_use]
    pub const fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Interior angle at `b` formed by `a` and `c`, in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::DegenerateGeometry`] if any landmark is missing
    /// (or below the confidence floor) or if `a` or `c` coincides with `b`.
    pub fn angle_at(
        &self,
        joint: JointName,
        a: Option<&Position>,
        b: Option<&Position>,
        c: Option<&Position>,
    ) -> Result<f64> {
        let floor = self.min_confidence;
        match (usable(a, floor), usable(b, floor), usable(c, floor)) {
            (Some(a), Some(b), Some(c)) => {
                interior_angle_degrees(&a.to_vector(), &b.to_vector(), &c.to_vector())
                    .ok_or(MotionError::degenerate(joint))
            }
            _ => Err(MotionError::degenerate(joint)),
        }
    }

    /// Angle of one joint in `frame`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`AngleExtractor::angle_at`].
    pub fn joint_angle(&self, frame: &LandmarkFrame, joint: JointName) -> Result<f64> {
        let (a, b, c) = joint.landmark_triple();
        self.angle_at(joint, frame.get(a), frame.get(b), frame.get(c))
    }

    /// All measurable joint angles in `frame`.
    #[must_use]
    pub fn extract(&self, frame: &LandmarkFrame) -> AngleFrame {
        let mut angles = AngleFrame::new(frame.timestamp_ms());
        for joint in JointName::ALL {
            match self.joint_angle(frame, joint) {
                Ok(angle) => {
                    angles.angles.insert(joint, angle);
                }
                Err(_) => {
                    tracing::debug!(
                        joint = joint.as_str(),
                        timestamp_ms = frame.timestamp_ms(),
                        "skipping joint with degenerate geometry"
                    );
                }
            }
        }
        angles
    }
}

impl Default for AngleExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_LANDMARK_CONFIDENCE)
    }
}

fn usable(p: Option<&Position>, min_confidence: f64) -> Option<&Position> {
    p.filter(|p| p.confidence >= min_confidence)
}
