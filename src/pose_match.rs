//! Latest-frame pose comparison.
//!
//! The user's most recent angle frame is compared joint by joint with the
//! reference's most recent frame, so a user who finishes the routine in the
//! right shape is rewarded however their tempo drifted. Timestamp-aligned
//! lookups against the reference are available through
//! [`PoseMatcher::compare_frame`].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::buffer::SequenceBuffer;
use crate::config::ComparisonConfig;
use crate::math::mean;
use crate::pose::JointName;
use crate::sequence::AngleFrame;

/// Score of one joint in a single-frame comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointScore {
    pub joint: JointName,
    pub user_angle: f64,
    pub reference_angle: f64,
    /// Absolute angle difference in degrees.
    pub difference: f64,
    /// Similarity in `[0, 100]`.
    pub score: f64,
}

/// Joint-by-joint comparison of one user frame against the reference.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoseComparison {
    pub joint_scores: Vec<JointScore>,
    /// Mean joint score; 0 when no joint could be compared.
    pub overall_score: f64,
}

impl PoseComparison {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joint_scores.is_empty()
    }

    #[must_use]
    pub fn joint(&self, joint: JointName) -> Option<&JointScore> {
        self.joint_scores.iter().find(|s| s.joint == joint)
    }
}

/// Compares single frames against a reference buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseMatcher {
    window_ms: u64,
    tolerance_degrees: f64,
}

impl PoseMatcher {
    #[must_use]
    pub const fn new(window_ms: u64, tolerance_degrees: f64) -> Self {
        Self {
            window_ms,
            tolerance_degrees,
        }
    }

    #[must_use]
    pub const fn from_config(config: &ComparisonConfig) -> Self {
        Self::new(
            config.nearest_sample_window_ms,
            config.pose_angle_tolerance_degrees,
        )
    }

    /// Score for an absolute angle difference: 100 at zero, falling linearly
    /// to 0 at the tolerance.
    #[must_use]
    pub fn joint_score(&self, difference_degrees: f64) -> f64 {
        (100.0 * (1.0 - difference_degrees.abs() / self.tolerance_degrees)).clamp(0.0, 100.0)
    }

    /// Compare `frame` with the reference samples nearest to its timestamp.
    ///
    /// Joints missing on either side, or without a reference sample inside
    /// the window, are left out.
    #[must_use]
    pub fn compare_frame(&self, frame: &AngleFrame, reference: &SequenceBuffer) -> PoseComparison {
        let joint_scores = frame
            .angles
            .iter()
            .filter_map(|(&joint, &user_angle)| {
                let sample = reference.nearest_sample(joint, frame.timestamp_ms, self.window_ms)?;
                Some(self.score_joint(joint, user_angle, sample.angle_degrees()))
            })
            .collect();
        Self::summarize(joint_scores)
    }

    /// Compare two frames directly, ignoring their timestamps.
    #[must_use]
    pub fn compare_frames(&self, user: &AngleFrame, reference: &AngleFrame) -> PoseComparison {
        let joint_scores = user
            .angles
            .iter()
            .filter_map(|(&joint, &user_angle)| {
                let reference_angle = reference.get(joint)?;
                Some(self.score_joint(joint, user_angle, reference_angle))
            })
            .collect();
        Self::summarize(joint_scores)
    }

    /// Compare the user's most recent frame with the reference's most recent
    /// frame. Empty if either buffer has no frames.
    #[must_use]
    pub fn compare_latest(&self, user: &SequenceBuffer, reference: &SequenceBuffer) -> PoseComparison {
        match (user.frames().last(), reference.frames().last()) {
            (Some(user), Some(reference)) => self.compare_frames(user, reference),
            _ => PoseComparison::default(),
        }
    }

    fn score_joint(&self, joint: JointName, user_angle: f64, reference_angle: f64) -> JointScore {
        let difference = (user_angle - reference_angle).abs();
        JointScore {
            joint,
            user_angle,
            reference_angle,
            difference,
            score: self.joint_score(difference),
        }
    }

    fn summarize(joint_scores: Vec<JointScore>) -> PoseComparison {
        let overall_score = mean(joint_scores.iter().map(|s| s.score)).unwrap_or(0.0);
        PoseComparison {
            joint_scores,
            overall_score,
        }
    }
}

impl Default for PoseMatcher {
    fn default() -> Self {
        Self::from_config(&ComparisonConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference() -> SequenceBuffer {
        let mut buffer = SequenceBuffer::new();
        for (i, ts) in [0u64, 100, 200, 300].into_iter().enumerate() {
            let frame = AngleFrame::new(ts)
                .with_angle(JointName::LeftKnee, 90.0 + 10.0 * i as f64)
                .with_angle(JointName::LeftHip, 170.0);
            buffer.record_frame(frame).unwrap();
        }
        buffer
    }

    #[test]
    fn test_joint_score_linear_falloff() {
        let matcher = PoseMatcher::default();
        assert_relative_eq!(matcher.joint_score(0.0), 100.0);
        assert_relative_eq!(matcher.joint_score(22.5), 50.0);
        assert_relative_eq!(matcher.joint_score(-22.5), 50.0);
        assert_relative_eq!(matcher.joint_score(90.0), 0.0);
    }

    #[test]
    fn test_compare_frame_uses_nearest_reference_sample() {
        let matcher = PoseMatcher::default();
        let frame = AngleFrame::new(190)
            .with_angle(JointName::LeftKnee, 110.0)
            .with_angle(JointName::LeftHip, 125.0)
            .with_angle(JointName::RightKnee, 90.0);

        let comparison = matcher.compare_frame(&frame, &reference());
        assert_eq!(comparison.joint_scores.len(), 2);

        let knee = comparison.joint(JointName::LeftKnee).unwrap();
        assert_relative_eq!(knee.reference_angle, 110.0);
        assert_relative_eq!(knee.score, 100.0);

        let hip = comparison.joint(JointName::LeftHip).unwrap();
        assert_relative_eq!(hip.difference, 45.0);
        assert_relative_eq!(hip.score, 0.0);

        assert_relative_eq!(comparison.overall_score, 50.0);
    }

    #[test]
    fn test_outside_window_scores_zero() {
        let matcher = PoseMatcher::default();
        let frame = AngleFrame::new(5_000).with_angle(JointName::LeftKnee, 120.0);
        let comparison = matcher.compare_frame(&frame, &reference());
        assert!(comparison.is_empty());
        assert_relative_eq!(comparison.overall_score, 0.0);
    }

    #[test]
    fn test_compare_latest() {
        let matcher = PoseMatcher::default();
        let mut user = SequenceBuffer::new();
        assert!(matcher.compare_latest(&user, &reference()).is_empty());

        user.record_frame(AngleFrame::new(0).with_angle(JointName::LeftKnee, 60.0))
            .unwrap();
        user.record_frame(AngleFrame::new(290).with_angle(JointName::LeftKnee, 120.0))
            .unwrap();
        let comparison = matcher.compare_latest(&user, &reference());
        assert_eq!(comparison.joint_scores.len(), 1);
        assert_relative_eq!(comparison.overall_score, 100.0);
    }

    #[test]
    fn test_compare_latest_ignores_tempo() {
        let matcher = PoseMatcher::default();
        let knee = |i: usize| 120.0 - 40.0 * (i as f64 / 60.0 * std::f64::consts::TAU).cos();

        let mut reference = SequenceBuffer::new();
        let mut user = SequenceBuffer::new();
        for i in 0..60 {
            let at = |ts: u64| AngleFrame::new(ts).with_angle(JointName::LeftKnee, knee(i));
            reference.record_frame(at(i as u64 * 33)).unwrap();
            user.record_frame(at(i as u64 * 66)).unwrap();
        }

        // Half-tempo user ends at 3.9 s, long after the reference's 1.9 s
        assert!(matcher.compare_frame(&user.frames()[59], &reference).is_empty());

        let comparison = matcher.compare_latest(&user, &reference);
        assert_eq!(comparison.joint_scores.len(), 1);
        assert_relative_eq!(comparison.overall_score, 100.0);
    }

    #[test]
    fn test_compare_frames_skips_unshared_joints() {
        let matcher = PoseMatcher::default();
        let user = AngleFrame::new(0)
            .with_angle(JointName::LeftKnee, 100.0)
            .with_angle(JointName::RightKnee, 90.0);
        let reference = AngleFrame::new(9_000)
            .with_angle(JointName::LeftKnee, 122.5)
            .with_angle(JointName::LeftHip, 170.0);

        let comparison = matcher.compare_frames(&user, &reference);
        assert_eq!(comparison.joint_scores.len(), 1);
        assert_relative_eq!(comparison.joint(JointName::LeftKnee).unwrap().score, 50.0);
        assert_relative_eq!(comparison.overall_score, 50.0);
    }
}
