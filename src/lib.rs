//! Motion Match Library
//!
//! Scores how closely a recorded body movement follows a reference movement.
//!
//! Landmark frames from a pose estimator are turned into joint angles, buffered
//! per stream, and compared in several ways:
//!
//! - **Per-joint DTW**: exact dynamic time warping of each joint's angle series
//! - **FastDTW**: approximate multi-joint alignment with per-frame and per-joint errors
//! - **Pose match**: the user's latest frame against the reference's latest frame
//! - **Timing**: late start, pauses, and pace relative to the reference
//!
//! # Quick Start
//!
//! ```
//! use motion_match::{compare_streams, ComparisonConfig, LandmarkFrame};
//!
//! // Right arm opening from 90° to 150° over 20 frames
//! let frames: Vec<LandmarkFrame> = (0..20u64)
//!     .map(|i| {
//!         let theta = (90.0 + 3.0 * i as f64).to_radians();
//!         LandmarkFrame::from_named(
//!             i * 33,
//!             [
//!                 ("right_shoulder", [0.0, 1.0, 0.9]),
//!                 ("right_elbow", [0.0, 0.0, 0.9]),
//!                 ("right_wrist", [theta.sin(), theta.cos(), 0.9]),
//!             ],
//!         )
//!     })
//!     .collect::<motion_match::Result<_>>()?;
//!
//! let result = compare_streams(&frames, &frames, &ComparisonConfig::default())?;
//! assert_eq!(result.final_score, 100);
//! println!("{}", result.feedback);
//! # Ok::<(), motion_match::MotionError>(())
//! ```
//!
//! # Scoring
//!
//! | Component | Weight | Source |
//! |-----------|--------|--------|
//! | Mean per-joint DTW score | 0.7 | [`dtw::ScalarDtw`] |
//! | Latest-frame pose score | 0.3 | [`pose_match::PoseMatcher`] |
//! | FastDTW | diagnostic | [`fastdtw::FastDtw`] |
//!
//! # Presets
//!
//! ```
//! use motion_match::ComparisonConfig;
//!
//! let default_config = ComparisonConfig::default();
//! let strict_config = ComparisonConfig::strict();
//! let lenient_config = ComparisonConfig::lenient();
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod aggregate;
pub mod angles;
pub mod buffer;
pub mod config;
pub mod dtw;
pub mod engine;
pub mod error;
pub mod fastdtw;
pub mod math;
pub mod pose;
pub mod pose_match;
pub mod sequence;
pub mod timing;

// Re-exports for convenient access
pub use aggregate::{
    ComparisonOutcome, ComparisonResult, FeedbackTier, ScoreAggregator, NOT_ENOUGH_DATA_MESSAGE,
};
pub use angles::AngleExtractor;
pub use buffer::SequenceBuffer;
pub use config::{ComparisonConfig, ScoringPolicy};
pub use dtw::{DtwResult, ScalarDtw};
pub use engine::{compare_angle_streams, compare_streams, EvaluationSession};
pub use error::{MotionError, Result};
pub use fastdtw::{FastDtw, FastDtwResult};
pub use pose::{JointName, Landmark, LandmarkFrame, Position};
pub use pose_match::{JointScore, PoseComparison, PoseMatcher};
pub use sequence::{
    AngleFrame, AngleSample, AngleSequence, AngleTable, AngleVectorFrame, AngleVectorSequence,
};
pub use timing::{Gap, Speed, TimingAnalyzer, TimingIssues, TimingReport};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
