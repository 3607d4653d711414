//! Pacing analysis of angle-frame streams.
//!
//! The analyzer looks at how much the body moves between consecutive frames:
//!
//! - **Significant movement**: the summed per-joint angle change from the
//!   previous frame exceeds a threshold.
//! - **Gap**: a sustained run of frames where no joint moves more than a small
//!   epsilon, lasting at least a minimum duration.
//! - **Speed**: intervals between movement onsets of the user compared with
//!   the reference's, inside a tolerance band.
//! - **Delay**: the user starts moving noticeably later than the reference.
//!
//! Only joints present in both of two consecutive frames contribute to
//! their delta; a frame pair sharing no joint is neither moving nor still.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::ComparisonConfig;
use crate::sequence::AngleFrame;

/// Overall pace of the user relative to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Speed {
    /// Consistently longer intervals than the reference.
    Slow,
    /// Within tolerance, or no consistent trend.
    #[default]
    Good,
    /// Consistently shorter intervals than the reference.
    Fast,
}

impl Speed {
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Slow => "Slower than the reference - try to keep up with the tempo",
            Self::Good => "Good pacing",
            Self::Fast => "Faster than the reference - slow down and control the movement",
        }
    }
}

/// Timing verdicts for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingIssues {
    /// The user started moving late.
    pub delays: bool,
    /// The user stream contains at least one stillness gap.
    pub gaps: bool,
    /// Overall pace.
    pub speed: Speed,
}

/// Stillness interval, as inclusive frame indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gap {
    pub start: usize,
    pub end: usize,
    pub duration_ms: u64,
}

/// Full timing analysis of a user/reference pair.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingReport {
    pub issues: TimingIssues,
    pub user_movements: Vec<usize>,
    pub reference_movements: Vec<usize>,
    pub user_gaps: Vec<Gap>,
}

/// Change between two frames over their shared joints.
#[derive(Debug, Clone, Copy)]
struct FrameDelta {
    total: f64,
    max: f64,
}

fn frame_delta(prev: &AngleFrame, cur: &AngleFrame) -> Option<FrameDelta> {
    let mut shared = 0usize;
    let mut total = 0.0;
    let mut max = 0.0f64;
    for (joint, angle) in &cur.angles {
        if let Some(prev_angle) = prev.get(*joint) {
            let d = (angle - prev_angle).abs();
            total += d;
            max = max.max(d);
            shared += 1;
        }
    }
    (shared > 0).then_some(FrameDelta { total, max })
}

/// Pacing analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingAnalyzer {
    significant_threshold: f64,
    gap_epsilon: f64,
    gap_min_duration_ms: u64,
    delay_grace_ms: u64,
    speed_tolerance: f64,
    speed_consistency: f64,
}

impl TimingAnalyzer {
    /// Create an analyzer from the timing fields of `config`.
    #[must_use]
    pub fn new(config: &ComparisonConfig) -> Self {
        Self {
            significant_threshold: config.significant_movement_threshold_degrees,
            gap_epsilon: config.gap_epsilon_degrees,
            gap_min_duration_ms: config.gap_min_duration_ms,
            delay_grace_ms: config.delay_grace_ms,
            speed_tolerance: config.speed_tolerance,
            speed_consistency: config.speed_consistency,
        }
    }

    /// Indices of frames whose aggregate angle change exceeds the threshold.
    #[must_use]
    pub fn significant_movements(&self, frames: &[AngleFrame]) -> Vec<usize> {
        frames
            .windows(2)
            .enumerate()
            .filter_map(|(i, w)| {
                frame_delta(&w[0], &w[1])
                    .filter(|d| d.total > self.significant_threshold)
                    .map(|_| i + 1)
            })
            .collect()
    }

    /// Significant frames whose predecessor is not significant.
    #[must_use]
    pub fn movement_onsets(&self, frames: &[AngleFrame]) -> Vec<usize> {
        let significant = self.significant_movements(frames);
        significant
            .iter()
            .enumerate()
            .filter(|&(k, &idx)| k == 0 || significant[k - 1] + 1 != idx)
            .map(|(_, &idx)| idx)
            .collect()
    }

    /// Stillness runs lasting at least the minimum gap duration.
    #[must_use]
    pub fn detect_gaps(&self, frames: &[AngleFrame]) -> Vec<Gap> {
        let mut gaps = Vec::new();
        let mut run_start: Option<usize> = None;

        for i in 1..=frames.len() {
            let still = i < frames.len()
                && frame_delta(&frames[i - 1], &frames[i]).is_some_and(|d| d.max <= self.gap_epsilon);

            match (still, run_start) {
                (true, None) => run_start = Some(i - 1),
                (false, Some(start)) => {
                    let end = i - 1;
                    let duration_ms = frames[end].timestamp_ms.saturating_sub(frames[start].timestamp_ms);
                    if duration_ms >= self.gap_min_duration_ms {
                        gaps.push(Gap {
                            start,
                            end,
                            duration_ms,
                        });
                    }
                    run_start = None;
                }
                _ => {}
            }
        }
        gaps
    }

    /// Time from the stream's first frame to its first significant movement.
    ///
    /// A stream that never moves reports its whole span.
    fn movement_latency(frames: &[AngleFrame], movements: &[usize]) -> u64 {
        let (Some(first), Some(last)) = (frames.first(), frames.last()) else {
            return 0;
        };
        let start = first.timestamp_ms;
        movements.first().map_or(last.timestamp_ms.saturating_sub(start), |&idx| {
            frames[idx].timestamp_ms.saturating_sub(start)
        })
    }

    /// Whether the user's first movement lags the reference's by more than
    /// the grace period.
    #[must_use]
    pub fn has_delay(&self, user: &[AngleFrame], reference: &[AngleFrame]) -> bool {
        let ref_movements = self.significant_movements(reference);
        if ref_movements.is_empty() {
            return false;
        }
        let user_movements = self.significant_movements(user);

        let user_latency = Self::movement_latency(user, &user_movements);
        let ref_latency = Self::movement_latency(reference, &ref_movements);
        user_latency > ref_latency.saturating_add(self.delay_grace_ms)
    }

    fn verdict(&self, ratio: f64) -> Speed {
        if ratio > 1.0 + self.speed_tolerance {
            Speed::Slow
        } else if ratio < 1.0 - self.speed_tolerance {
            Speed::Fast
        } else {
            Speed::Good
        }
    }

    /// Classify the user's pace against the reference.
    ///
    /// Intervals between successive movement onsets are paired by index.
    /// When neither stream has two onsets, the span from first to last
    /// significant movement is compared instead.
    #[must_use]
    pub fn classify_speed(&self, user: &[AngleFrame], reference: &[AngleFrame]) -> Speed {
        let intervals = |frames: &[AngleFrame], onsets: &[usize]| -> Vec<u64> {
            onsets
                .windows(2)
                .map(|w| frames[w[1]].timestamp_ms.saturating_sub(frames[w[0]].timestamp_ms))
                .collect()
        };
        let user_intervals = intervals(user, &self.movement_onsets(user));
        let ref_intervals = intervals(reference, &self.movement_onsets(reference));

        let verdicts: Vec<Speed> = user_intervals
            .iter()
            .zip(&ref_intervals)
            .filter(|(_, &r)| r > 0)
            .map(|(&u, &r)| self.verdict(u as f64 / r as f64))
            .collect();

        if verdicts.is_empty() {
            return self.classify_by_span(user, reference);
        }

        let n = verdicts.len() as f64;
        let share = |speed: Speed| verdicts.iter().filter(|&&v| v == speed).count() as f64 / n;
        if share(Speed::Slow) >= self.speed_consistency {
            Speed::Slow
        } else if share(Speed::Fast) >= self.speed_consistency {
            Speed::Fast
        } else {
            Speed::Good
        }
    }

    fn classify_by_span(&self, user: &[AngleFrame], reference: &[AngleFrame]) -> Speed {
        let span = |frames: &[AngleFrame]| -> Option<u64> {
            let movements = self.significant_movements(frames);
            match (movements.first(), movements.last()) {
                (Some(&a), Some(&b)) if b > a => {
                    Some(frames[b].timestamp_ms.saturating_sub(frames[a].timestamp_ms))
                }
                _ => None,
            }
        };
        match (span(user), span(reference)) {
            (Some(u), Some(r)) if r > 0 => self.verdict(u as f64 / r as f64),
            _ => Speed::Good,
        }
    }

    /// Run every timing check.
    #[must_use]
    pub fn analyze(&self, user: &[AngleFrame], reference: &[AngleFrame]) -> TimingReport {
        let user_gaps = self.detect_gaps(user);
        let issues = TimingIssues {
            delays: self.has_delay(user, reference),
            gaps: !user_gaps.is_empty(),
            speed: self.classify_speed(user, reference),
        };
        tracing::debug!(
            delays = issues.delays,
            gaps = user_gaps.len(),
            speed = ?issues.speed,
            "timing analysis complete"
        );

        TimingReport {
            issues,
            user_movements: self.significant_movements(user),
            reference_movements: self.significant_movements(reference),
            user_gaps,
        }
    }
}

impl Default for TimingAnalyzer {
    fn default() -> Self {
        Self::new(&ComparisonConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::JointName;

    const FRAME_MS: u64 = 50;

    /// Stream of single-joint frames from a list of angles.
    fn stream(angles: &[f64]) -> Vec<AngleFrame> {
        angles
            .iter()
            .zip(0u64..)
            .map(|(&a, i)| AngleFrame::new(i * FRAME_MS).with_angle(JointName::RightKnee, a))
            .collect()
    }

    /// `bursts` short movements separated by `rest` still frames.
    fn bursty(bursts: usize, rest: usize) -> Vec<f64> {
        let mut angles = vec![90.0];
        for b in 0..bursts {
            let target = if b % 2 == 0 { 150.0 } else { 90.0 };
            let from = *angles.last().unwrap();
            angles.extend((1..=3).map(|k| from + (target - from) * f64::from(k) / 3.0));
            angles.extend(std::iter::repeat(target).take(rest));
        }
        angles
    }

    #[test]
    fn test_significant_movements() {
        let analyzer = TimingAnalyzer::default();
        let frames = stream(&[90.0, 91.0, 120.0, 121.0, 100.0]);
        assert_eq!(analyzer.significant_movements(&frames), vec![2, 4]);
        assert!(analyzer.significant_movements(&[]).is_empty());
    }

    #[test]
    fn test_onsets_collapse_runs() {
        let analyzer = TimingAnalyzer::default();
        let frames = stream(&[90.0, 120.0, 150.0, 150.0, 120.0, 90.0]);
        assert_eq!(analyzer.significant_movements(&frames), vec![1, 2, 4, 5]);
        assert_eq!(analyzer.movement_onsets(&frames), vec![1, 4]);
    }

    #[test]
    fn test_gap_detection() {
        let analyzer = TimingAnalyzer::default();
        // 30 still frames = 1450ms, then movement, then 5 still frames = 200ms
        let mut angles = vec![100.0; 30];
        angles.extend([130.0, 160.0]);
        angles.extend(vec![160.5; 5]);
        let frames = stream(&angles);

        let gaps = analyzer.detect_gaps(&frames);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].start, 0);
        assert_eq!(gaps[0].end, 29);
        assert_eq!(gaps[0].duration_ms, 29 * FRAME_MS);
    }

    #[test]
    fn test_gap_at_stream_end() {
        let analyzer = TimingAnalyzer::default();
        let mut angles = vec![90.0, 130.0];
        angles.extend(vec![130.0; 25]);
        let gaps = analyzer.detect_gaps(&stream(&angles));
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].start, 1);
        assert_eq!(gaps[0].end, 26);
    }

    #[test]
    fn test_delay_detection() {
        let analyzer = TimingAnalyzer::default();
        let reference = stream(&bursty(4, 5));

        let mut late = vec![90.0; 41];
        late.extend(bursty(4, 5));
        assert!(analyzer.has_delay(&stream(&late), &reference));
        assert!(!analyzer.has_delay(&reference, &reference));

        // User never moves at all
        assert!(analyzer.has_delay(&stream(&[90.0; 60]), &reference));

        // Reference never moves: nothing to be late for
        assert!(!analyzer.has_delay(&stream(&late), &stream(&[90.0; 60])));
    }

    #[test]
    fn test_speed_classification() {
        let analyzer = TimingAnalyzer::default();
        let reference = stream(&bursty(6, 6));
        let slow = stream(&bursty(6, 14));
        let fast = stream(&bursty(6, 2));

        assert_eq!(analyzer.classify_speed(&reference, &reference), Speed::Good);
        assert_eq!(analyzer.classify_speed(&slow, &reference), Speed::Slow);
        assert_eq!(analyzer.classify_speed(&fast, &reference), Speed::Fast);
    }

    #[test]
    fn test_speed_without_onset_pairs_uses_span() {
        let analyzer = TimingAnalyzer::default();
        // One continuous movement each; the user's lasts twice as long
        let reference: Vec<f64> = (0..8).map(|i| 20.0 + 20.0 * f64::from(i)).collect();
        let user: Vec<f64> = (0..15)
            .map(|i| if i % 2 == 0 { 90.0 } else { 110.0 })
            .collect();
        assert_eq!(
            analyzer.classify_speed(&stream(&reference), &stream(&reference)),
            Speed::Good
        );
        let verdict = analyzer.classify_speed(&stream(&user), &stream(&reference));
        assert_eq!(verdict, Speed::Slow);
    }

    #[test]
    fn test_analyze_report() {
        let analyzer = TimingAnalyzer::default();
        let mut user = vec![90.0; 30];
        user.extend(bursty(3, 5));
        let report = analyzer.analyze(&stream(&user), &stream(&bursty(3, 5)));
        assert!(report.issues.delays);
        assert!(report.issues.gaps);
        assert!(!report.user_gaps.is_empty());
        assert!(!report.reference_movements.is_empty());
    }
}
