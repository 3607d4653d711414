//! Per-session storage of timestamped joint angles.
//!
//! A [`SequenceBuffer`] holds one stream (user or reference). It keeps one
//! [`AngleSequence`] per joint for the alignment steps and the list of whole
//! [`AngleFrame`]s for timing analysis and tabular export.
//!
//! Buffers grow without bound; the owner caps them by discarding the buffer
//! when its evaluation session ends.

use std::collections::BTreeMap;

use crate::error::{MotionError, Result};
use crate::pose::JointName;
use crate::sequence::{AngleFrame, AngleSample, AngleSequence, AngleTable};

/// Angle history of one stream.
///
/// # Example
///
/// ```
/// use motion_match::{JointName, SequenceBuffer};
///
/// let mut buffer = SequenceBuffer::new();
/// buffer.record(JointName::LeftKnee, 0, 170.0)?;
/// buffer.record(JointName::LeftKnee, 40, 150.0)?;
/// assert!(buffer.record(JointName::LeftKnee, 40, 140.0).is_err());
///
/// let nearest = buffer.nearest_sample(JointName::LeftKnee, 35, 300).unwrap();
/// assert_eq!(nearest.timestamp_ms(), 40);
/// # Ok::<(), motion_match::MotionError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct SequenceBuffer {
    /// Per-joint sequences.
    sequences: BTreeMap<JointName, AngleSequence>,

    /// Whole frames in arrival order.
    frames: Vec<AngleFrame>,
}

impl SequenceBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample to `joint`'s sequence.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::OutOfOrderSample`] if `timestamp_ms` is not
    /// greater than the joint's last timestamp, and
    /// [`MotionError::InvalidInput`] for an out-of-range angle. The buffer is
    /// unchanged on error.
    pub fn record(&mut self, joint: JointName, timestamp_ms: u64, angle_degrees: f64) -> Result<()> {
        self.check_order(joint, timestamp_ms)?;
        let sample = AngleSample::new(joint, timestamp_ms, angle_degrees)?;
        self.sequences
            .entry(joint)
            .or_insert_with(|| AngleSequence::empty(joint))
            .push(sample);
        Ok(())
    }

    /// Record every angle of `frame` and keep the frame for timing analysis.
    ///
    /// The frame is all-or-nothing: if any of its samples would be rejected,
    /// nothing is recorded. A frame that is not newer than the previous one
    /// is reported against its first joint. Empty frames are ignored.
    ///
    /// Returns the number of joint samples recorded.
    ///
    /// # Errors
    ///
    /// Same conditions as [`SequenceBuffer::record`].
    pub fn record_frame(&mut self, frame: AngleFrame) -> Result<usize> {
        let Some(&first_joint) = frame.angles.keys().next() else {
            return Ok(0);
        };
        if let Some(last) = self.frames.last() {
            if frame.timestamp_ms <= last.timestamp_ms {
                return Err(MotionError::out_of_order(
                    first_joint,
                    last.timestamp_ms,
                    frame.timestamp_ms,
                ));
            }
        }

        let samples = frame
            .angles
            .iter()
            .map(|(&joint, &angle)| {
                self.check_order(joint, frame.timestamp_ms)?;
                AngleSample::new(joint, frame.timestamp_ms, angle)
            })
            .collect::<Result<Vec<_>>>()?;

        for sample in &samples {
            self.sequences
                .entry(sample.joint())
                .or_insert_with(|| AngleSequence::empty(sample.joint()))
                .push(*sample);
        }
        self.frames.push(frame);
        Ok(samples.len())
    }

    fn check_order(&self, joint: JointName, timestamp_ms: u64) -> Result<()> {
        match self.sequences.get(&joint).and_then(AngleSequence::last) {
            Some(last) if timestamp_ms <= last.timestamp_ms() => Err(MotionError::out_of_order(
                joint,
                last.timestamp_ms(),
                timestamp_ms,
            )),
            _ => Ok(()),
        }
    }

    /// Copy of `joint`'s sequence (empty if never recorded).
    #[must_use]
    pub fn export_sequence(&self, joint: JointName) -> AngleSequence {
        self.sequences
            .get(&joint)
            .cloned()
            .unwrap_or_else(|| AngleSequence::empty(joint))
    }

    /// Borrow `joint`'s sequence.
    #[must_use]
    pub fn sequence(&self, joint: JointName) -> Option<&AngleSequence> {
        self.sequences.get(&joint)
    }

    /// Sample of `joint` closest in time to `timestamp_ms`.
    ///
    /// Returns `None` when the joint has no samples or the closest one is
    /// more than `window_ms` away. On a tie the earlier sample wins.
    #[must_use]
    pub fn nearest_sample(
        &self,
        joint: JointName,
        timestamp_ms: u64,
        window_ms: u64,
    ) -> Option<AngleSample> {
        let samples = self.sequences.get(&joint)?.samples();
        let idx = samples.partition_point(|s| s.timestamp_ms() < timestamp_ms);

        let before = idx.checked_sub(1).map(|i| samples[i]);
        let after = samples.get(idx).copied();
        let nearest = match (before, after) {
            (Some(b), Some(a)) => {
                if timestamp_ms - b.timestamp_ms() <= a.timestamp_ms() - timestamp_ms {
                    b
                } else {
                    a
                }
            }
            (Some(only), None) | (None, Some(only)) => only,
            (None, None) => return None,
        };

        (nearest.timestamp_ms().abs_diff(timestamp_ms) <= window_ms).then_some(nearest)
    }

    /// Recorded frames in arrival order.
    #[must_use]
    pub fn frames(&self) -> &[AngleFrame] {
        &self.frames
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Number of samples recorded for `joint`.
    #[must_use]
    pub fn sample_count(&self, joint: JointName) -> usize {
        self.sequences.get(&joint).map_or(0, AngleSequence::len)
    }

    /// Joints with at least one sample, in canonical order.
    pub fn joints(&self) -> impl Iterator<Item = JointName> + '_ {
        self.sequences.keys().copied()
    }

    /// Frame-by-joint table for display.
    #[must_use]
    pub fn angle_table(&self) -> AngleTable {
        AngleTable::from_frames(&self.frames)
    }

    /// Discard all samples and frames.
    pub fn reset(&mut self) {
        self.sequences.clear();
        self.frames.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty() && self.frames.is_empty()
    }
}
