use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Landmark indices following the MediaPipe hand schema:
/// wrist at 0, then four joints per finger from the base outward.
pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Number of landmarks in one detected hand
pub const LANDMARK_COUNT: usize = 21;

/// A single hand keypoint in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// The four fingers the classifiers look at (the thumb is ignored)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finger {
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub fn tip(self) -> usize {
        match self {
            Finger::Index => INDEX_TIP,
            Finger::Middle => MIDDLE_TIP,
            Finger::Ring => RING_TIP,
            Finger::Pinky => PINKY_TIP,
        }
    }

    /// The joint the interior angle is measured at
    pub fn knuckle(self) -> usize {
        match self {
            Finger::Index => INDEX_PIP,
            Finger::Middle => MIDDLE_PIP,
            Finger::Ring => RING_PIP,
            Finger::Pinky => PINKY_PIP,
        }
    }

    pub fn base(self) -> usize {
        match self {
            Finger::Index => INDEX_MCP,
            Finger::Middle => MIDDLE_MCP,
            Finger::Ring => RING_MCP,
            Finger::Pinky => PINKY_MCP,
        }
    }
}

/// One detected hand: an ordered, complete set of 21 landmarks.
/// The fixed-size array makes a malformed set unrepresentable; the only
/// fallible constructor is [`LandmarkSet::from_points`] at the
/// deserialization boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    points: [Point; LANDMARK_COUNT],
}

impl LandmarkSet {
    pub fn new(points: [Point; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// Builds a set from a slice, rejecting anything but exactly 21 points.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let points: [Point; LANDMARK_COUNT] = points.try_into().ok()?;
        Some(Self { points })
    }

    pub fn point(&self, index: usize) -> Point {
        self.points[index]
    }

    pub fn wrist(&self) -> Point {
        self.points[WRIST]
    }

    /// The (tip, knuckle, base) triple for a finger
    pub fn finger(&self, finger: Finger) -> (Point, Point, Point) {
        (
            self.points[finger.tip()],
            self.points[finger.knuckle()],
            self.points[finger.base()],
        )
    }
}

/// Detector-adaptation boundary: exactly one detected hand is valid input
/// for classification. Zero hands means nothing to do; more than one is
/// rejected the same way.
pub fn single_hand(mut hands: Vec<LandmarkSet>) -> Option<LandmarkSet> {
    match hands.len() {
        1 => hands.pop(),
        0 => None,
        n => {
            debug!("Rejecting frame with {} hands", n);
            None
        }
    }
}

/// External hand-landmark detector. Implementations wrap whatever model
/// produces the landmarks; the core only sees this seam.
pub trait LandmarkDetector: Send {
    /// Returns all hands detected in the frame, each as a complete 21-point set.
    fn detect(&mut self, frame: &RgbImage) -> Vec<LandmarkSet>;
}
