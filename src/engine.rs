//! Evaluation sessions: from landmark frames to a [`ComparisonResult`].
//!
//! A session owns one buffer per stream. Frames are pushed while recording;
//! [`EvaluationSession::finish`] consumes the session and runs every scoring
//! step, so buffers are never shared between evaluations.

use std::collections::BTreeMap;

use crate::aggregate::{ComparisonResult, ScoreAggregator};
use crate::angles::AngleExtractor;
use crate::buffer::SequenceBuffer;
use crate::config::ComparisonConfig;
use crate::dtw::{DtwResult, ScalarDtw};
use crate::error::{MotionError, Result};
use crate::fastdtw::{FastDtw, FastDtwResult};
use crate::pose::{JointName, LandmarkFrame};
use crate::pose_match::PoseMatcher;
use crate::sequence::{AngleFrame, AngleSequence, AngleVectorSequence};
use crate::timing::TimingAnalyzer;

/// One user-versus-reference evaluation.
///
/// # Example
///
/// ```
/// use motion_match::{AngleFrame, ComparisonConfig, EvaluationSession, JointName};
///
/// let mut session = EvaluationSession::new(ComparisonConfig::default())?;
/// for i in 0..10u64 {
///     let angle = 90.0 + 5.0 * i as f64;
///     session.push_user_angles(AngleFrame::new(i * 33).with_angle(JointName::LeftElbow, angle))?;
///     session.push_reference_angles(AngleFrame::new(i * 33).with_angle(JointName::LeftElbow, angle))?;
/// }
/// let result = session.finish()?;
/// assert_eq!(result.final_score, 100);
/// # Ok::<(), motion_match::MotionError>(())
/// ```
#[derive(Debug, Clone)]
pub struct EvaluationSession {
    config: ComparisonConfig,
    extractor: AngleExtractor,
    user: SequenceBuffer,
    reference: SequenceBuffer,
}

impl EvaluationSession {
    /// Start a session with fresh buffers.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: ComparisonConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            extractor: AngleExtractor::new(config.min_landmark_confidence),
            config,
            user: SequenceBuffer::new(),
            reference: SequenceBuffer::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    #[must_use]
    pub fn user_buffer(&self) -> &SequenceBuffer {
        &self.user
    }

    #[must_use]
    pub fn reference_buffer(&self) -> &SequenceBuffer {
        &self.reference
    }

    /// Extract and record the joint angles of a user frame.
    ///
    /// Returns the number of joints recorded.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::OutOfOrderSample`] if the frame is not newer
    /// than the previous one; nothing is recorded in that case.
    pub fn push_user_frame(&mut self, frame: &LandmarkFrame) -> Result<usize> {
        let angles = self.extractor.extract(frame);
        self.user.record_frame(angles)
    }

    /// Extract and record the joint angles of a reference frame.
    ///
    /// # Errors
    ///
    /// Same conditions as [`EvaluationSession::push_user_frame`].
    pub fn push_reference_frame(&mut self, frame: &LandmarkFrame) -> Result<usize> {
        let angles = self.extractor.extract(frame);
        self.reference.record_frame(angles)
    }

    /// Record precomputed user angles.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::OutOfOrderSample`] for a stale frame and
    /// [`MotionError::InvalidInput`] for an angle outside `[0, 180]`.
    pub fn push_user_angles(&mut self, frame: AngleFrame) -> Result<usize> {
        self.user.record_frame(frame)
    }

    /// Record precomputed reference angles.
    ///
    /// # Errors
    ///
    /// Same conditions as [`EvaluationSession::push_user_angles`].
    pub fn push_reference_angles(&mut self, frame: AngleFrame) -> Result<usize> {
        self.reference.record_frame(frame)
    }

    /// Score the session.
    ///
    /// Per-joint failures shrink the set of scored joints; a failed FastDTW
    /// pass leaves [`ComparisonResult::fast_dtw`] empty.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::InsufficientData`] if either stream has fewer
    /// frames than the minimum sequence length or no joint can be scored.
    pub fn finish(self) -> Result<ComparisonResult> {
        let min_len = self.config.min_sequence_length;
        let shortest = self.user.frame_count().min(self.reference.frame_count());
        if shortest < min_len {
            tracing::warn!(
                user_frames = self.user.frame_count(),
                reference_frames = self.reference.frame_count(),
                required = min_len,
                "not enough pose frames to evaluate"
            );
            return Err(MotionError::insufficient(min_len, shortest));
        }

        let (per_joint, excluded) = self.score_joints();
        let fast_dtw = self.align_vectors(&per_joint);
        let timing = TimingAnalyzer::new(&self.config).analyze(self.user.frames(), self.reference.frames());
        let pose = PoseMatcher::from_config(&self.config).compare_latest(&self.user, &self.reference);

        let mut result = ScoreAggregator::from_config(&self.config)
            .aggregate(per_joint, pose, fast_dtw, timing.issues)
            .map_err(|err| {
                tracing::warn!(excluded = excluded.len(), "no joint had enough samples to score");
                err
            })?;

        result.excluded_joints.extend(excluded);
        result.excluded_joints.sort_unstable();
        result.user_gaps = timing.user_gaps;
        result.user_angles = self.user.angle_table();
        result.reference_angles = self.reference.angle_table();

        tracing::info!(
            final_score = result.final_score,
            valid_joints = result.valid_joint_count(),
            fast_dtw = result.fast_dtw.is_some(),
            "evaluation complete"
        );
        Ok(result)
    }

    /// Scalar DTW for every joint recorded in both streams.
    fn score_joints(&self) -> (BTreeMap<JointName, DtwResult>, Vec<JointName>) {
        let dtw = ScalarDtw::from_config(&self.config);
        let mut per_joint = BTreeMap::new();
        let mut excluded = Vec::new();

        for joint in JointName::ALL {
            let (Some(user), Some(reference)) = (self.user.sequence(joint), self.reference.sequence(joint))
            else {
                continue;
            };
            match dtw.compare(user, reference, joint) {
                Ok(result) => {
                    per_joint.insert(joint, result);
                }
                Err(err) => {
                    tracing::debug!(joint = joint.as_str(), error = %err, "joint excluded from scoring");
                    excluded.push(joint);
                }
            }
        }
        (per_joint, excluded)
    }

    /// FastDTW over the joints that passed scalar scoring.
    fn align_vectors(&self, per_joint: &BTreeMap<JointName, DtwResult>) -> Option<FastDtwResult> {
        if per_joint.is_empty() {
            return None;
        }
        let stack = |buffer: &SequenceBuffer| -> Result<AngleVectorSequence> {
            let sequences: Vec<&AngleSequence> = per_joint
                .keys()
                .filter_map(|&joint| buffer.sequence(joint))
                .collect();
            AngleVectorSequence::from_sequences(&sequences)
        };

        let aligned = stack(&self.reference).and_then(|reference| {
            let user = stack(&self.user)?;
            FastDtw::from_config(&self.config).compare(&reference, &user, self.config.fast_dtw_radius)
        });
        match aligned {
            Ok(result) => Some(result),
            Err(err) => {
                tracing::warn!(error = %err, "FastDTW alignment skipped");
                None
            }
        }
    }
}

/// Evaluate two complete landmark streams.
///
/// Frames that are not newer than their predecessor are skipped.
///
/// # Errors
///
/// Returns [`MotionError::InvalidConfig`] for an invalid `config` and
/// [`MotionError::InsufficientData`] under the conditions of
/// [`EvaluationSession::finish`].
pub fn compare_streams(
    user: &[LandmarkFrame],
    reference: &[LandmarkFrame],
    config: &ComparisonConfig,
) -> Result<ComparisonResult> {
    let mut session = EvaluationSession::new(config.clone())?;
    for frame in user {
        skip_stale(session.push_user_frame(frame), "user")?;
    }
    for frame in reference {
        skip_stale(session.push_reference_frame(frame), "reference")?;
    }
    session.finish()
}

/// Evaluate two complete angle streams.
///
/// # Errors
///
/// Same conditions as [`compare_streams`], plus
/// [`MotionError::InvalidInput`] for an angle outside `[0, 180]`.
pub fn compare_angle_streams(
    user: &[AngleFrame],
    reference: &[AngleFrame],
    config: &ComparisonConfig,
) -> Result<ComparisonResult> {
    let mut session = EvaluationSession::new(config.clone())?;
    for frame in user {
        skip_stale(session.push_user_angles(frame.clone()), "user")?;
    }
    for frame in reference {
        skip_stale(session.push_reference_angles(frame.clone()), "reference")?;
    }
    session.finish()
}

fn skip_stale(pushed: Result<usize>, stream: &str) -> Result<()> {
    match pushed {
        Ok(_) => Ok(()),
        Err(err @ MotionError::OutOfOrderSample { .. }) => {
            tracing::debug!(stream, error = %err, "skipping stale frame");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(angles: &[f64], joints: &[JointName]) -> Vec<AngleFrame> {
        angles
            .iter()
            .zip(0u64..)
            .map(|(&a, i)| {
                joints
                    .iter()
                    .fold(AngleFrame::new(i * 40), |f, &j| f.with_angle(j, a))
            })
            .collect()
    }

    fn sweep(n: usize) -> Vec<f64> {
        (0..n).map(|i| 60.0 + 80.0 * (i as f64 / n as f64)).collect()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ComparisonConfig::default().with_min_sequence_length(0);
        assert!(EvaluationSession::new(config).is_err());
    }

    #[test]
    fn test_identical_streams() {
        let joints = [JointName::LeftElbow, JointName::RightKnee];
        let stream = frames(&sweep(30), &joints);
        let result = compare_angle_streams(&stream, &stream, &ComparisonConfig::default()).unwrap();

        assert_eq!(result.final_score, 100);
        assert_eq!(result.valid_joint_count(), 2);
        let fast = result.fast_dtw.as_ref().unwrap();
        assert_eq!(fast.joint_names, joints.to_vec());
        assert_eq!(result.user_angles.n_rows(), 30);
    }

    #[test]
    fn test_short_joint_excluded() {
        let mut user = frames(&sweep(20), &[JointName::LeftElbow]);
        // Right knee only in the first three user frames
        for frame in user.iter_mut().take(3) {
            frame.angles.insert(JointName::RightKnee, 100.0);
        }
        let reference = frames(&sweep(20), &[JointName::LeftElbow, JointName::RightKnee]);

        let result = compare_angle_streams(&user, &reference, &ComparisonConfig::default()).unwrap();
        assert_eq!(result.valid_joint_count(), 1);
        assert_eq!(result.excluded_joints, vec![JointName::RightKnee]);
        assert_eq!(result.fast_dtw.as_ref().unwrap().joint_names, vec![JointName::LeftElbow]);
    }

    #[test]
    fn test_too_few_frames() {
        let user = frames(&[90.0; 3], &[JointName::LeftElbow]);
        let reference = frames(&[90.0; 10], &[JointName::LeftElbow]);
        let err = compare_angle_streams(&user, &reference, &ComparisonConfig::default()).unwrap_err();
        assert_eq!(err, MotionError::insufficient(5, 3));
    }

    #[test]
    fn test_stale_frames_skipped() {
        let mut user = frames(&sweep(10), &[JointName::LeftElbow]);
        let stale = user[2].clone();
        user.insert(5, stale);
        let reference = frames(&sweep(10), &[JointName::LeftElbow]);

        let result = compare_angle_streams(&user, &reference, &ComparisonConfig::default()).unwrap();
        assert_eq!(result.user_angles.n_rows(), 10);
        assert_eq!(result.final_score, 100);
    }

    #[test]
    fn test_session_buffers_are_independent() {
        let mut session = EvaluationSession::new(ComparisonConfig::default()).unwrap();
        session
            .push_user_angles(AngleFrame::new(0).with_angle(JointName::LeftHip, 170.0))
            .unwrap();
        assert_eq!(session.user_buffer().frame_count(), 1);
        assert!(session.reference_buffer().is_empty());
    }
}
