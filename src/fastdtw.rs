//! Multi-resolution approximate DTW over full-body angle vectors.
//!
//! Both streams are repeatedly halved by averaging consecutive frames until
//! they are short enough for exact DTW. The coarse optimal path is then
//! projected back up one level, widened by `radius` cells, and used as the
//! only region the next finer DTW pass may visit. Run time stays near
//! `O(n · radius)` instead of `O(n · m)`.
//!
//! Cell cost is the Euclidean distance between two angle vectors.
//!
//! `compare` keeps the cheapest pass over every radius up to the one asked
//! for, so widening the radius never raises the cost.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{ComparisonConfig, DEFAULT_DTW_SCALE_FACTOR, DEFAULT_MIN_SEQUENCE_LENGTH};
use crate::error::{MotionError, Result};
use crate::math::{cost_to_score, euclidean_distance};
use crate::pose::JointName;
use crate::sequence::{AngleVectorFrame, AngleVectorSequence};

/// Warping path as `(reference_index, user_index)` pairs from `(0, 0)` to
/// the last frame of both streams.
pub type WarpPath = Vec<(usize, usize)>;

/// Result of a multi-joint alignment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FastDtwResult {
    /// Whole-routine similarity in `[0, 100]`.
    pub overall_score: f64,
    /// One score per warping path step.
    pub per_frame_scores: Vec<f64>,
    /// Mean absolute angle difference per joint along the path, in degrees.
    pub joint_errors: Vec<f64>,
    /// Joint of each `joint_errors` entry.
    pub joint_names: Vec<JointName>,
    /// Accumulated Euclidean cost along the path.
    pub total_cost: f64,
    pub path: WarpPath,
}

impl FastDtwResult {
    /// Joint with the largest mean error.
    #[must_use]
    pub fn worst_joint(&self) -> Option<(JointName, f64)> {
        self.joint_names
            .iter()
            .copied()
            .zip(self.joint_errors.iter().copied())
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Allowed column range `[lo, hi]` for each row of the cost matrix.
type Window = Vec<(usize, usize)>;

/// Approximate DTW scorer for angle-vector streams.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FastDtw {
    scale_factor: f64,
    min_len: usize,
}

impl FastDtw {
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

    /// Align `user` against `reference` with search radius `radius`.
    ///
    /// The returned cost is non-increasing in `radius`, and exact once
    /// `radius + 2` reaches the shorter length.
    ///
    /// # Errors
    ///
    /// - [`MotionError::DimensionMismatch`] if the two sequences do not carry
    ///   the same joints in the same order
    /// - [`MotionError::InsufficientData`] if either sequence is shorter than
    ///   the minimum length
    pub fn compare(
        &self,
        reference: &AngleVectorSequence,
        user: &AngleVectorSequence,
        radius: usize,
    ) -> Result<FastDtwResult> {
        if reference.joints() != user.joints() {
            return Err(MotionError::joint_order_mismatch(
                reference.joints(),
                user.joints(),
            ));
        }
        let shortest = reference.len().min(user.len());
        if shortest < self.min_len {
            return Err(MotionError::insufficient(self.min_len, shortest));
        }

        let ref_frames = reference.frames();
        let user_frames = user.frames();
        let (total_cost, path) = best_within_radius(ref_frames, user_frames, radius);

        let dims = reference.joints().len();
        let sqrt_dims = (dims as f64).sqrt();
        let normalized = total_cost / ((ref_frames.len() + user_frames.len()) as f64 * sqrt_dims);

        let per_frame_scores = path
            .iter()
            .map(|&(i, j)| {
                let d = euclidean_distance(ref_frames[i].values(), user_frames[j].values());
                cost_to_score(d / (2.0 * sqrt_dims), self.scale_factor)
            })
            .collect();

        let mut joint_errors = vec![0.0_f64; dims];
        for &(i, j) in &path {
            let pairs = ref_frames[i].values().iter().zip(user_frames[j].values());
            for (err, (r, u)) in joint_errors.iter_mut().zip(pairs) {
                *err += (r - u).abs();
            }
        }
        let steps = path.len() as f64;
        for err in &mut joint_errors {
            *err /= steps;
        }

        Ok(FastDtwResult {
            overall_score: cost_to_score(normalized, self.scale_factor),
            per_frame_scores,
            joint_errors,
            joint_names: reference.joints().to_vec(),
            total_cost,
            path,
        })
    }
}

impl Default for FastDtw {
    fn default() -> Self {
        Self::new(DEFAULT_DTW_SCALE_FACTOR, DEFAULT_MIN_SEQUENCE_LENGTH)
    }
}

/// Cheapest alignment over every radius from 0 up to `radius`.
///
/// A single refinement pass is not monotone in its radius, since the coarse
/// path it projects changes with the radius too. Taking the minimum over all
/// smaller radii makes a wider radius never cost more than a narrower one.
fn best_within_radius(
    x: &[AngleVectorFrame],
    y: &[AngleVectorFrame],
    radius: usize,
) -> (f64, WarpPath) {
    let mut best = fast_dtw(x, y, 0);
    for r in 1..=radius {
        let candidate = fast_dtw(x, y, r);
        if candidate.0 < best.0 {
            best = candidate;
        }
        // Past this point every pass is exact DTW
        if x.len().min(y.len()) <= r + 2 {
            break;
        }
    }
    best
}

fn fast_dtw(x: &[AngleVectorFrame], y: &[AngleVectorFrame], radius: usize) -> (f64, WarpPath) {
    let min_size = radius + 2;
    if x.len() <= min_size || y.len() <= min_size {
        let full = vec![(0, y.len() - 1); x.len()];
        return windowed_dtw(x, y, &full);
    }

    let (_, coarse_path) = fast_dtw(&coarsen(x), &coarsen(y), radius);
    let window = expand_window(&coarse_path, x.len(), y.len(), radius);
    windowed_dtw(x, y, &window)
}

/// Halve a stream by averaging consecutive pairs; an odd last frame is kept.
fn coarsen(frames: &[AngleVectorFrame]) -> Vec<AngleVectorFrame> {
    frames
        .chunks(2)
        .map(|pair| match pair {
            [a, b] => a.midpoint(b),
            _ => pair[0].clone(),
        })
        .collect()
}

/// Project a coarse path to full resolution, widened by `radius` coarse cells.
fn expand_window(coarse_path: &[(usize, usize)], n: usize, m: usize, radius: usize) -> Window {
    let mut window = vec![(usize::MAX, 0); n];

    for &(ci, cj) in coarse_path {
        let row_lo = 2 * ci.saturating_sub(radius);
        let row_hi = (2 * (ci + radius) + 1).min(n - 1);
        let col_lo = 2 * cj.saturating_sub(radius);
        let col_hi = (2 * (cj + radius) + 1).min(m - 1);

        for row in window.iter_mut().take(row_hi + 1).skip(row_lo) {
            row.0 = row.0.min(col_lo);
            row.1 = row.1.max(col_hi);
        }
    }
    window
}

/// DTW restricted to `window`; cells outside it are unreachable.
fn windowed_dtw(x: &[AngleVectorFrame], y: &[AngleVectorFrame], window: &[(usize, usize)]) -> (f64, WarpPath) {
    let n = x.len();
    let m = y.len();

    let lookup = |cost: &[Vec<f64>], i: usize, j: usize| -> f64 {
        let (lo, hi) = window[i];
        if j < lo || j > hi {
            f64::INFINITY
        } else {
            cost[i][j - lo]
        }
    };

    let mut cost: Vec<Vec<f64>> = Vec::with_capacity(n);
    for (i, &(lo, hi)) in window.iter().enumerate() {
        cost.push(vec![f64::INFINITY; hi + 1 - lo]);
        for j in lo..=hi {
            let d = euclidean_distance(x[i].values(), y[j].values());
            let best_prev = match (i, j) {
                (0, 0) => 0.0,
                (0, _) => lookup(&cost, 0, j - 1),
                (_, 0) => lookup(&cost, i - 1, 0),
                _ => lookup(&cost, i - 1, j - 1)
                    .min(lookup(&cost, i - 1, j))
                    .min(lookup(&cost, i, j - 1)),
            };
            cost[i][j - lo] = d + best_prev;
        }
    }

    let total = lookup(&cost, n - 1, m - 1);

    let mut path = vec![(n - 1, m - 1)];
    let (mut i, mut j) = (n - 1, m - 1);
    while (i, j) != (0, 0) {
        (i, j) = if i == 0 {
            (0, j - 1)
        } else if j == 0 {
            (i - 1, 0)
        } else {
            let diag = lookup(&cost, i - 1, j - 1);
            let up = lookup(&cost, i - 1, j);
            let left = lookup(&cost, i, j - 1);
            if diag <= up && diag <= left {
                (i - 1, j - 1)
            } else if up <= left {
                (i - 1, j)
            } else {
                (i, j - 1)
            }
        };
        path.push((i, j));
    }
    path.reverse();

    (total, path)
}
