//! Score aggregation and feedback.
//!
//! The final score blends the mean per-joint DTW score with the latest-frame
//! pose comparison:
//!
//! ```text
//! final = round(dtw_weight · mean(valid joint DTW scores) + pose_weight · pose)
//! ```
//!
//! clamped to `[0, 100]`. A joint is valid when both of its sequences met the
//! minimum length; invalid joints are left out of the mean rather than
//! counted as zero. The FastDTW result rides along for display and does not
//! enter the final score.

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{ComparisonConfig, ScoringPolicy, DEFAULT_MIN_SEQUENCE_LENGTH};
use crate::dtw::DtwResult;
use crate::error::{MotionError, Result};
use crate::fastdtw::FastDtwResult;
use crate::math::mean;
use crate::pose::JointName;
use crate::pose_match::PoseComparison;
use crate::sequence::AngleTable;
use crate::timing::{Gap, Speed, TimingIssues};

/// Message shown when an evaluation could not be scored.
pub const NOT_ENOUGH_DATA_MESSAGE: &str = "Not enough pose data. Please try again.";

/// Feedback band of a final score, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FeedbackTier {
    Excellent,
    Great,
    Good,
    Decent,
    Fair,
    KeepPracticing,
    MorePracticeNeeded,
}

impl FeedbackTier {
    pub const ALL: [Self; 7] = [
        Self::Excellent,
        Self::Great,
        Self::Good,
        Self::Decent,
        Self::Fair,
        Self::KeepPracticing,
        Self::MorePracticeNeeded,
    ];

    /// Tier of `score` given descending lower bounds for the first six tiers.
    ///
    /// Total over every input: anything below the last bound, including NaN,
    /// lands in [`FeedbackTier::MorePracticeNeeded`].
    #[must_use]
    pub fn from_score(score: f64, thresholds: &[f64; 6]) -> Self {
        thresholds
            .iter()
            .position(|&bound| score >= bound)
            .map_or(Self::MorePracticeNeeded, |i| Self::ALL[i])
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent work! Your form is nearly perfect and matches the reference movement with high precision.",
            Self::Great => "Great job! Your movement shows good precision with only minor deviations from the reference.",
            Self::Good => "Good performance! Your movement is mostly on track, with a few areas that could use improvement.",
            Self::Decent => "Decent effort. Your movement has the right general pattern, but needs refinement in several areas.",
            Self::Fair => "Fair attempt. Your movement shows some similarities to the reference, but needs significant improvement.",
            Self::KeepPracticing => "Keep practicing. Your movement needs considerable refinement to match the reference pattern.",
            Self::MorePracticeNeeded => "More practice needed. Try focusing on matching the basic form of the reference movement.",
        }
    }
}

impl fmt::Display for FeedbackTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Everything produced by one evaluation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComparisonResult {
    /// DTW result of every valid joint.
    pub joint_results: BTreeMap<JointName, DtwResult>,
    /// Joints that had samples but were too short to score.
    pub excluded_joints: Vec<JointName>,
    /// Mean DTW score over valid joints.
    pub dtw_score: f64,
    pub pose: PoseComparison,
    /// Multi-joint alignment, absent when it could not be computed.
    pub fast_dtw: Option<FastDtwResult>,
    pub timing: TimingIssues,
    /// Stillness intervals found in the user stream.
    pub user_gaps: Vec<Gap>,
    /// Final score in `[0, 100]`.
    pub final_score: u8,
    pub feedback_tier: FeedbackTier,
    pub feedback: String,
    /// Raw angle tables for display.
    pub user_angles: AngleTable,
    pub reference_angles: AngleTable,
}

impl ComparisonResult {
    #[must_use]
    pub fn valid_joint_count(&self) -> usize {
        self.joint_results.len()
    }

    /// Valid joint with the lowest DTW score.
    #[must_use]
    pub fn weakest_joint(&self) -> Option<&DtwResult> {
        self.joint_results
            .values()
            .min_by(|a, b| a.score.total_cmp(&b.score))
    }

    /// Short notes describing detected timing issues.
    #[must_use]
    pub fn timing_notes(&self) -> Vec<&'static str> {
        let mut notes = Vec::new();
        if self.timing.delays {
            notes.push("You started later than the reference.");
        }
        if self.timing.gaps {
            notes.push("There were pauses where you stopped moving.");
        }
        if self.timing.speed != Speed::Good {
            notes.push(self.timing.speed.description());
        }
        notes
    }
}

/// Caller-facing outcome of an evaluation, including the not-enough-data case.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComparisonOutcome {
    pub final_score: u8,
    pub feedback: String,
    pub result: Option<ComparisonResult>,
}

impl ComparisonOutcome {
    /// Convert an evaluation result into an outcome.
    ///
    /// [`MotionError::InsufficientData`] becomes a zero score with
    /// [`NOT_ENOUGH_DATA_MESSAGE`].
    ///
    /// # Errors
    ///
    /// Any other error is passed through.
    pub fn from_result(result: Result<ComparisonResult>) -> Result<Self> {
        match result {
            Ok(result) => Ok(Self {
                final_score: result.final_score,
                feedback: result.feedback.clone(),
                result: Some(result),
            }),
            Err(err) if err.is_insufficient_data() => Ok(Self {
                final_score: 0,
                feedback: NOT_ENOUGH_DATA_MESSAGE.to_string(),
                result: None,
            }),
            Err(err) => Err(err),
        }
    }

    #[must_use]
    pub fn is_scored(&self) -> bool {
        self.result.is_some()
    }
}

/// Blends component scores into a [`ComparisonResult`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreAggregator {
    policy: ScoringPolicy,
    min_len: usize,
}

impl ScoreAggregator {
    #[must_use]
    pub const fn new(policy: ScoringPolicy, min_len: usize) -> Self {
        Self { policy, min_len }
    }

    #[must_use]
    pub fn from_config(config: &ComparisonConfig) -> Self {
        Self::new(config.scoring.clone(), config.min_sequence_length)
    }

    fn is_valid(&self, result: &DtwResult) -> bool {
        result.user_len >= self.min_len && result.reference_len >= self.min_len
    }

    /// Combine per-joint DTW results, the pose comparison, FastDTW and
    /// timing into a result.
    ///
    /// Angle tables and gaps are left empty for the caller to attach.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::InsufficientData`] if no joint is valid.
    pub fn aggregate(
        &self,
        per_joint: BTreeMap<JointName, DtwResult>,
        pose: PoseComparison,
        fast_dtw: Option<FastDtwResult>,
        timing: TimingIssues,
    ) -> Result<ComparisonResult> {
        let (joint_results, excluded): (BTreeMap<_, _>, BTreeMap<_, _>) =
            per_joint.into_iter().partition(|(_, r)| self.is_valid(r));

        let dtw_score = mean(joint_results.values().map(|r| r.score))
            .ok_or(MotionError::insufficient(self.min_len, 0))?;

        let blended = self.policy.dtw_weight * dtw_score + self.policy.pose_weight * pose.overall_score;
        let final_score = blended.round().clamp(0.0, 100.0) as u8;
        let feedback_tier = FeedbackTier::from_score(f64::from(final_score), &self.policy.tier_thresholds);

        Ok(ComparisonResult {
            joint_results,
            excluded_joints: excluded.into_keys().collect(),
            dtw_score,
            pose,
            fast_dtw,
            timing,
            user_gaps: Vec::new(),
            final_score,
            feedback_tier,
            feedback: feedback_tier.message().to_string(),
            user_angles: AngleTable::default(),
            reference_angles: AngleTable::default(),
        })
    }
}

impl Default for ScoreAggregator {
    fn default() -> Self {
        Self::new(ScoringPolicy::default(), DEFAULT_MIN_SEQUENCE_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dtw(joint: JointName, score: f64, len: usize) -> (JointName, DtwResult) {
        (
            joint,
            DtwResult {
                joint,
                score,
                raw_cost: 0.0,
                normalized_cost: 0.0,
                user_len: len,
                reference_len: 10,
            },
        )
    }

    fn pose(score: f64) -> PoseComparison {
        PoseComparison {
            joint_scores: Vec::new(),
            overall_score: score,
        }
    }

    #[test]
    fn test_tiers_cover_range() {
        let thresholds = ScoringPolicy::default().tier_thresholds;
        assert_eq!(FeedbackTier::from_score(100.0, &thresholds), FeedbackTier::Excellent);
        assert_eq!(FeedbackTier::from_score(90.0, &thresholds), FeedbackTier::Excellent);
        assert_eq!(FeedbackTier::from_score(89.0, &thresholds), FeedbackTier::Great);
        assert_eq!(FeedbackTier::from_score(50.0, &thresholds), FeedbackTier::Fair);
        assert_eq!(FeedbackTier::from_score(30.0, &thresholds), FeedbackTier::KeepPracticing);
        assert_eq!(FeedbackTier::from_score(29.0, &thresholds), FeedbackTier::MorePracticeNeeded);
        assert_eq!(FeedbackTier::from_score(0.0, &thresholds), FeedbackTier::MorePracticeNeeded);

        let mut previous = FeedbackTier::Excellent;
        for score in (0..=100).rev() {
            let tier = FeedbackTier::from_score(f64::from(score), &thresholds);
            assert!(tier >= previous);
            previous = tier;
        }
    }

    #[test]
    fn test_blend_weights() {
        let per_joint = BTreeMap::from([
            dtw(JointName::LeftKnee, 80.0, 10),
            dtw(JointName::RightKnee, 60.0, 10),
        ]);
        let result = ScoreAggregator::default()
            .aggregate(per_joint, pose(100.0), None, TimingIssues::default())
            .unwrap();
        assert_relative_eq!(result.dtw_score, 70.0);
        // 0.7 · 70 + 0.3 · 100 = 79
        assert_eq!(result.final_score, 79);
        assert_eq!(result.feedback_tier, FeedbackTier::Good);
        assert_eq!(result.feedback, FeedbackTier::Good.message());
    }

    #[test]
    fn test_short_joints_excluded_not_zeroed() {
        let per_joint = BTreeMap::from([
            dtw(JointName::LeftKnee, 90.0, 10),
            dtw(JointName::RightKnee, 100.0, 3),
        ]);
        let result = ScoreAggregator::default()
            .aggregate(per_joint, pose(90.0), None, TimingIssues::default())
            .unwrap();
        assert_eq!(result.valid_joint_count(), 1);
        assert_eq!(result.excluded_joints, vec![JointName::RightKnee]);
        assert_eq!(result.final_score, 90);
    }

    #[test]
    fn test_no_valid_joint_is_insufficient() {
        let per_joint = BTreeMap::from([dtw(JointName::LeftKnee, 90.0, 2)]);
        let err = ScoreAggregator::default()
            .aggregate(per_joint, pose(90.0), None, TimingIssues::default())
            .unwrap_err();
        assert!(err.is_insufficient_data());

        let outcome = ComparisonOutcome::from_result(Err(err)).unwrap();
        assert_eq!(outcome.final_score, 0);
        assert_eq!(outcome.feedback, NOT_ENOUGH_DATA_MESSAGE);
        assert!(!outcome.is_scored());
    }

    #[test]
    fn test_outcome_passes_other_errors() {
        let err = MotionError::invalid_config("bad");
        assert!(ComparisonOutcome::from_result(Err(err)).is_err());
    }

    #[test]
    fn test_final_score_bounded() {
        for (d, p) in [(0.0, 0.0), (100.0, 100.0), (100.0, 0.0), (0.0, 100.0), (33.3, 66.6)] {
            let per_joint = BTreeMap::from([dtw(JointName::LeftElbow, d, 10)]);
            let result = ScoreAggregator::default()
                .aggregate(per_joint, pose(p), None, TimingIssues::default())
                .unwrap();
            assert!(result.final_score <= 100);
        }
    }

    #[test]
    fn test_timing_notes() {
        let per_joint = BTreeMap::from([dtw(JointName::LeftElbow, 90.0, 10)]);
        let timing = TimingIssues {
            delays: true,
            gaps: false,
            speed: Speed::Slow,
        };
        let result = ScoreAggregator::default()
            .aggregate(per_joint, pose(90.0), None, timing)
            .unwrap();
        assert_eq!(result.timing_notes().len(), 2);
        assert_eq!(result.weakest_joint().map(|r| r.joint), Some(JointName::LeftElbow));
    }
}
