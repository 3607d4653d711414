//! Pose input types: body landmarks, landmark frames and joint names.
//!
//! A [`LandmarkFrame`] is the per-frame input supplied by the pose detector.
//! A [`JointName`] names one of the twelve measured joints; the landmarks
//! forming each joint angle are fixed by [`JointName::landmark_triple`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MotionError, Result};

/// Named body point produced by the pose detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Landmark {
    Nose,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    /// Tip of the left hand (index finger knuckle).
    LeftIndex,
    RightIndex,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftFootIndex,
    RightFootIndex,
}

impl Landmark {
    /// Every landmark, in declaration order.
    pub const ALL: [Self; 17] = [
        Self::Nose,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftIndex,
        Self::RightIndex,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftFootIndex,
        Self::RightFootIndex,
    ];

    /// Snake-case name as emitted by the pose detector.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftIndex => "left_index",
            Self::RightIndex => "right_index",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
            Self::LeftFootIndex => "left_foot_index",
            Self::RightFootIndex => "right_foot_index",
        }
    }
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Landmark {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| MotionError::invalid_input(format!("unknown landmark '{s}'")))
    }
}

/// Joint whose interior angle is tracked.
///
/// Ordering is fixed by declaration order and defines the component order of
/// every joint-angle vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum JointName {
    LeftElbow,
    RightElbow,
    LeftShoulder,
    RightShoulder,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl JointName {
    /// Number of tracked joints.
    pub const COUNT: usize = 12;

    /// Every joint, in canonical vector order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    /// Snake-case joint name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }

    /// Human-readable label ("left elbow").
    #[must_use]
    pub fn label(self) -> String {
        self.as_str().replace('_', " ")
    }

    /// Landmarks `(a, b, c)` whose interior angle at `b` is this joint's angle.
    #[must_use]
    pub const fn landmark_triple(self) -> (Landmark, Landmark, Landmark) {
        use Landmark as L;
        match self {
            Self::LeftElbow => (L::LeftShoulder, L::LeftElbow, L::LeftWrist),
            Self::RightElbow => (L::RightShoulder, L::RightElbow, L::RightWrist),
            Self::LeftShoulder => (L::LeftHip, L::LeftShoulder, L::LeftElbow),
            Self::RightShoulder => (L::RightHip, L::RightShoulder, L::RightElbow),
            Self::LeftWrist => (L::LeftElbow, L::LeftWrist, L::LeftIndex),
            Self::RightWrist => (L::RightElbow, L::RightWrist, L::RightIndex),
            Self::LeftHip => (L::LeftShoulder, L::LeftHip, L::LeftKnee),
            Self::RightHip => (L::RightShoulder, L::RightHip, L::RightKnee),
            Self::LeftKnee => (L::LeftHip, L::LeftKnee, L::LeftAnkle),
            Self::RightKnee => (L::RightHip, L::RightKnee, L::RightAnkle),
            Self::LeftAnkle => (L::LeftKnee, L::LeftAnkle, L::LeftFootIndex),
            Self::RightAnkle => (L::RightKnee, L::RightAnkle, L::RightFootIndex),
        }
    }
}

impl fmt::Display for JointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JointName {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|j| j.as_str() == s)
            .ok_or_else(|| MotionError::invalid_input(format!("unknown joint '{s}'")))
    }
}

/// Landmark position in image (or world) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Position {
    pub x: f64,
    pub y: f64,
    /// Depth; 0 for 2-D detectors.
    pub z: f64,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f64,
}

impl Position {
    /// Create a validated 2-D position.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::InvalidInput`] for non-finite coordinates or a
    /// confidence outside `[0, 1]`.
    pub fn new(x: f64, y: f64, confidence: f64) -> Result<Self> {
        Self::new_3d(x, y, 0.0, confidence)
    }

    /// Create a validated 3-D position.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Position::new`].
    pub fn new_3d(x: f64, y: f64, z: f64, confidence: f64) -> Result<Self> {
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            return Err(MotionError::invalid_input(format!(
                "non-finite landmark coordinates ({x}, {y}, {z})"
            )));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(MotionError::invalid_input(format!(
                "landmark confidence {confidence} outside [0, 1]"
            )));
        }
        Ok(Self { x, y, z, confidence })
    }

    #[must_use]
    pub fn to_vector(&self) -> nalgebra::Vector3<f64> {
        nalgebra::Vector3::new(self.x, self.y, self.z)
    }
}

/// One detector frame: a timestamp and the landmarks seen in it.
///
/// Immutable once built; use [`LandmarkFrame::builder`] to assemble one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LandmarkFrame {
    timestamp_ms: u64,
    landmarks: BTreeMap<Landmark, Position>,
}

impl LandmarkFrame {
    /// Create a frame from already validated positions.
    #[must_use]
    pub fn new(timestamp_ms: u64, landmarks: BTreeMap<Landmark, Position>) -> Self {
        Self {
            timestamp_ms,
            landmarks,
        }
    }

    /// Start building a frame at `timestamp_ms`.
    #[must_use]
    pub fn builder(timestamp_ms: u64) -> LandmarkFrameBuilder {
        LandmarkFrameBuilder {
            timestamp_ms,
            landmarks: BTreeMap::new(),
        }
    }

    /// Build a frame from detector output keyed by landmark name.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::InvalidInput`] for an unknown landmark name or
    /// an invalid position.
    pub fn from_named<'a, I>(timestamp_ms: u64, points: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, [f64; 3])>,
    {
        let mut builder = Self::builder(timestamp_ms);
        for (name, [x, y, confidence]) in points {
            builder = builder.landmark(name.parse()?, Position::new(x, y, confidence)?);
        }
        Ok(builder.build())
    }

    #[must_use]
    pub const fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    #[must_use]
    pub fn get(&self, landmark: Landmark) -> Option<&Position> {
        self.landmarks.get(&landmark)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Landmark, &Position)> {
        self.landmarks.iter().map(|(l, p)| (*l, p))
    }
}

/// Builder for [`LandmarkFrame`].
#[derive(Debug, Clone)]
pub struct LandmarkFrameBuilder {
    timestamp_ms: u64,
    landmarks: BTreeMap<Landmark, Position>,
}

impl LandmarkFrameBuilder {
    /// Set (or replace) one landmark.
    #[must_use]
    pub fn landmark(mut self, landmark: Landmark, position: Position) -> Self {
        self.landmarks.insert(landmark, position);
        self
    }

    #[must_use]
    pub fn build(self) -> LandmarkFrame {
        LandmarkFrame::new(self.timestamp_ms, self.landmarks)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Position {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Record {
            x: f64,
            y: f64,
            #[serde(default)]
            z: f64,
            confidence: f64,
        }

        let r = Record::deserialize(deserializer)?;
        Self::new_3d(r.x, r.y, r.z, r.confidence).map_err(serde::de::Error::custom)
    }
}
