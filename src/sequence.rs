//! Angle sample and sequence data structures.
//!
//! Invariants are checked when values are built, not where they are used:
//!
//! | Type | Invariant |
//! |------|-----------|
//! | [`AngleSample`] | angle finite and within `[0, 180]` |
//! | [`AngleSequence`] | one joint, non-decreasing timestamps |
//! | [`AngleVectorSequence`] | every frame has one value per joint, joints in canonical order |

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MotionError, Result};
use crate::pose::JointName;

/// One joint angle measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct AngleSample {
    joint: JointName,
    timestamp_ms: u64,
    angle_degrees: f64,
}

impl AngleSample {
    /// Create a validated sample.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::InvalidInput`] if the angle is not a finite
    /// value in `[0, 180]`.
    pub fn new(joint: JointName, timestamp_ms: u64, angle_degrees: f64) -> Result<Self> {
        if !(0.0..=180.0).contains(&angle_degrees) {
            return Err(MotionError::invalid_input(format!(
                "{joint} angle {angle_degrees} outside [0, 180]"
            )));
        }
        Ok(Self {
            joint,
            timestamp_ms,
            angle_degrees,
        })
    }

    #[must_use]
    pub const fn joint(&self) -> JointName {
        self.joint
    }

    #[must_use]
    pub const fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    #[must_use]
    pub const fn angle_degrees(&self) -> f64 {
        self.angle_degrees
    }
}

/// Time-ordered samples of one joint from one source.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct AngleSequence {
    joint: JointName,
    samples: Vec<AngleSample>,
}

impl AngleSequence {
    /// Create an empty sequence for `joint`.
    #[must_use]
    pub const fn empty(joint: JointName) -> Self {
        Self {
            joint,
            samples: Vec::new(),
        }
    }

    /// Create a sequence from samples.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::InvalidInput`] if a sample belongs to another
    /// joint or timestamps decrease.
    pub fn new(joint: JointName, samples: Vec<AngleSample>) -> Result<Self> {
        if let Some(stray) = samples.iter().find(|s| s.joint != joint) {
            return Err(MotionError::invalid_input(format!(
                "{} sample in {joint} sequence",
                stray.joint
            )));
        }
        if let Some(index) = samples
            .windows(2)
            .position(|w| w[1].timestamp_ms < w[0].timestamp_ms)
        {
            return Err(MotionError::invalid_input(format!(
                "{joint} timestamps decrease at index {}",
                index + 1
            )));
        }
        Ok(Self { joint, samples })
    }

    /// Build a sequence from evenly spaced angles starting at t = 0.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::InvalidInput`] if any angle is out of range.
    pub fn from_angles(joint: JointName, angles: &[f64], interval_ms: u64) -> Result<Self> {
        let samples = angles
            .iter()
            .zip(0u64..)
            .map(|(&angle, i)| AngleSample::new(joint, i * interval_ms, angle))
            .collect::<Result<Vec<_>>>()?;
        Self::new(joint, samples)
    }

    /// Append a sample already known to satisfy the ordering invariant.
    pub(crate) fn push(&mut self, sample: AngleSample) {
        debug_assert_eq!(sample.joint, self.joint);
        debug_assert!(self
            .samples
            .last()
            .map_or(true, |last| last.timestamp_ms <= sample.timestamp_ms));
        self.samples.push(sample);
    }

    #[must_use]
    pub const fn joint(&self) -> JointName {
        self.joint
    }

    #[must_use]
    pub fn samples(&self) -> &[AngleSample] {
        &self.samples
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&AngleSample> {
        self.samples.last()
    }

    /// Angle values in time order.
    #[must_use]
    pub fn angles(&self) -> Vec<f64> {
        self.samples.iter().map(AngleSample::angle_degrees).collect()
    }

    /// Time spanned by the sequence in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.timestamp_ms - first.timestamp_ms,
            _ => 0,
        }
    }
}

/// All joint angles extracted from one landmark frame.
///
/// Joints whose geometry was degenerate in that frame are simply absent.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AngleFrame {
    pub timestamp_ms: u64,
    pub angles: BTreeMap<JointName, f64>,
}

impl AngleFrame {
    #[must_use]
    pub fn new(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            angles: BTreeMap::new(),
        }
    }

    /// Builder-style insert, mostly for tests and synthetic streams.
    #[must_use]
    pub fn with_angle(mut self, joint: JointName, angle_degrees: f64) -> Self {
        self.angles.insert(joint, angle_degrees);
        self
    }

    #[must_use]
    pub fn get(&self, joint: JointName) -> Option<f64> {
        self.angles.get(&joint).copied()
    }
}

/// Angles of all compared joints at one sample index.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AngleVectorFrame {
    values: Vec<f64>,
}

impl AngleVectorFrame {
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Component-wise mean of two frames of equal dimension.
    #[must_use]
    pub(crate) fn midpoint(&self, other: &Self) -> Self {
        let values = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a + b) / 2.0)
            .collect();
        Self { values }
    }
}

/// Multi-joint angle stream used by FastDTW.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct AngleVectorSequence {
    joints: Vec<JointName>,
    frames: Vec<AngleVectorFrame>,
}

impl AngleVectorSequence {
    /// Create a vector sequence.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::InvalidInput`] if joints are not strictly in
    /// canonical order, and [`MotionError::DimensionMismatch`] if a frame's
    /// length differs from the joint count.
    pub fn new(joints: Vec<JointName>, frames: Vec<AngleVectorFrame>) -> Result<Self> {
        if joints.is_empty() {
            return Err(MotionError::invalid_input("vector sequence without joints"));
        }
        if !joints.windows(2).all(|w| w[0] < w[1]) {
            return Err(MotionError::invalid_input(
                "joints must be unique and in canonical order",
            ));
        }
        if let Some(frame) = frames.iter().find(|f| f.dim() != joints.len()) {
            return Err(MotionError::dimension_mismatch(joints.len(), frame.dim()));
        }
        Ok(Self { joints, frames })
    }

    /// Stack per-joint sequences into frames.
    ///
    /// Sequences shorter than the longest one are padded with their last
    /// angle so every frame carries a value for every joint.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::InvalidInput`] if `sequences` is empty, contains
    /// an empty sequence, or is not in canonical joint order.
    pub fn from_sequences(sequences: &[&AngleSequence]) -> Result<Self> {
        if sequences.iter().any(|s| s.is_empty()) {
            return Err(MotionError::invalid_input("cannot stack an empty sequence"));
        }
        let joints: Vec<JointName> = sequences.iter().map(|s| s.joint()).collect();
        let n_frames = sequences.iter().map(|s| s.len()).max().unwrap_or(0);

        let frames = (0..n_frames)
            .map(|i| {
                let values = sequences
                    .iter()
                    .map(|s| {
                        let samples = s.samples();
                        samples[i.min(samples.len() - 1)].angle_degrees()
                    })
                    .collect();
                AngleVectorFrame::new(values)
            })
            .collect();

        Self::new(joints, frames)
    }

    #[must_use]
    pub fn joints(&self) -> &[JointName] {
        &self.joints
    }

    #[must_use]
    pub fn frames(&self) -> &[AngleVectorFrame] {
        &self.frames
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Tabular angle export for charts: one row per frame, one column per joint.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AngleTable {
    /// Frame timestamps, one per row.
    pub timestamps_ms: Vec<u64>,
    /// Per-joint column; `None` where the joint was not measurable.
    pub angles: BTreeMap<JointName, Vec<Option<f64>>>,
}

impl AngleTable {
    /// Build a table from angle frames.
    #[must_use]
    pub fn from_frames(frames: &[AngleFrame]) -> Self {
        let mut angles: BTreeMap<JointName, Vec<Option<f64>>> = BTreeMap::new();
        for joint in frames.iter().flat_map(|f| f.angles.keys()) {
            angles.entry(*joint).or_default();
        }
        for (joint, column) in &mut angles {
            column.extend(frames.iter().map(|f| f.get(*joint)));
        }

        Self {
            timestamps_ms: frames.iter().map(|f| f.timestamp_ms).collect(),
            angles,
        }
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.timestamps_ms.len()
    }
}

/// Deserialization goes through the validating constructors, so a value
/// read from JSON holds the same invariants as one built in code.
#[cfg(feature = "serde")]
mod de {
    use serde::{Deserialize, Deserializer};

    use super::{AngleSample, AngleSequence, AngleVectorFrame, AngleVectorSequence};
    use crate::pose::JointName;

    #[derive(Deserialize)]
    struct SampleRecord {
        joint: JointName,
        timestamp_ms: u64,
        angle_degrees: f64,
    }

    #[derive(Deserialize)]
    struct SequenceRecord {
        joint: JointName,
        samples: Vec<AngleSample>,
    }

    #[derive(Deserialize)]
    struct VectorSequenceRecord {
        joints: Vec<JointName>,
        frames: Vec<AngleVectorFrame>,
    }

    impl<'de> Deserialize<'de> for AngleSample {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let r = SampleRecord::deserialize(deserializer)?;
            Self::new(r.joint, r.timestamp_ms, r.angle_degrees).map_err(serde::de::Error::custom)
        }
    }

    impl<'de> Deserialize<'de> for AngleSequence {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let r = SequenceRecord::deserialize(deserializer)?;
            Self::new(r.joint, r.samples).map_err(serde::de::Error::custom)
        }
    }

    impl<'de> Deserialize<'de> for AngleVectorSequence {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let r = VectorSequenceRecord::deserialize(deserializer)?;
            Self::new(r.joints, r.frames).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_validation() {
        assert!(AngleSample::new(JointName::LeftKnee, 0, 0.0).is_ok());
        assert!(AngleSample::new(JointName::LeftKnee, 0, 180.0).is_ok());
        assert!(AngleSample::new(JointName::LeftKnee, 0, 180.5).is_err());
        assert!(AngleSample::new(JointName::LeftKnee, 0, f64::NAN).is_err());
    }

    #[test]
    fn test_sequence_rejects_foreign_joint_and_disorder() {
        let a = AngleSample::new(JointName::LeftHip, 10, 90.0).unwrap();
        let b = AngleSample::new(JointName::LeftHip, 5, 91.0).unwrap();
        let c = AngleSample::new(JointName::RightHip, 20, 92.0).unwrap();

        assert!(AngleSequence::new(JointName::LeftHip, vec![a, b]).is_err());
        assert!(AngleSequence::new(JointName::LeftHip, vec![a, c]).is_err());
        // Equal timestamps are allowed
        assert!(AngleSequence::new(JointName::LeftHip, vec![a, a]).is_ok());
    }

    #[test]
    fn test_from_angles() {
        let seq = AngleSequence::from_angles(JointName::LeftElbow, &[10.0, 20.0, 30.0], 100).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.samples()[2].timestamp_ms(), 200);
        assert_eq!(seq.angles(), vec![10.0, 20.0, 30.0]);
        assert_eq!(seq.duration_ms(), 200);
    }

    #[test]
    fn test_vector_sequence_pads_with_last_value() {
        let elbow = AngleSequence::from_angles(JointName::LeftElbow, &[1.0, 2.0, 3.0], 10).unwrap();
        let knee = AngleSequence::from_angles(JointName::LeftKnee, &[7.0], 10).unwrap();

        let vectors = AngleVectorSequence::from_sequences(&[&elbow, &knee]).unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors.joints(), &[JointName::LeftElbow, JointName::LeftKnee]);
        assert_eq!(vectors.frames()[2].values(), &[3.0, 7.0]);
    }

    #[test]
    fn test_vector_sequence_dimension_check() {
        let frames = vec![AngleVectorFrame::new(vec![1.0, 2.0]), AngleVectorFrame::new(vec![1.0])];
        let err = AngleVectorSequence::new(vec![JointName::LeftElbow, JointName::RightElbow], frames)
            .unwrap_err();
        assert_eq!(err, MotionError::dimension_mismatch(2, 1));

        let unordered = AngleVectorSequence::new(
            vec![JointName::RightElbow, JointName::LeftElbow],
            Vec::new(),
        );
        assert!(unordered.is_err());
    }

    #[test]
    fn test_angle_table() {
        let frames = vec![
            AngleFrame::new(0).with_angle(JointName::LeftKnee, 90.0),
            AngleFrame::new(33)
                .with_angle(JointName::LeftKnee, 95.0)
                .with_angle(JointName::RightKnee, 80.0),
        ];
        let table = AngleTable::from_frames(&frames);
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.angles[&JointName::LeftKnee], vec![Some(90.0), Some(95.0)]);
        assert_eq!(table.angles[&JointName::RightKnee], vec![None, Some(80.0)]);
    }
}
