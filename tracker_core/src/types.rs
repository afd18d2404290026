//! Fundamental types used across the entire workspace.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Scalar type: f64 throughout for numerical precision in the filter math.
// ---------------------------------------------------------------------------

/// Generic dynamic-size vector (fusion state and measurement)
pub type DVec = DVector<f64>;

/// Generic dynamic-size matrix (A, H, Q, R, P)
pub type DMat = DMatrix<f64>;

// ---------------------------------------------------------------------------
// Identifier types — newtype wrappers so IDs are never confused at compile time
// ---------------------------------------------------------------------------

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TargetId(pub u32);

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ViewId(pub u8);

/// Number of camera views feeding the fusion stage.
pub const NUM_VIEWS: usize = 2;

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Appearance color
// ---------------------------------------------------------------------------

/// Mean color of an image patch, one value per channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn channels(&self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }
}

// ---------------------------------------------------------------------------
// Region of interest
// ---------------------------------------------------------------------------

/// Axis-aligned rectangle in frame coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True if `(px, py)` lies inside the rectangle (edges inclusive).
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// A single per-frame candidate from the circle detector. Ephemeral:
/// consumed entirely within one frame's association pass.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Detection {
    pub x: f64,
    pub y: f64,
    /// Detector-reported radius, when available
    pub radius: Option<f64>,
}

impl Detection {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            radius: None,
        }
    }

    pub fn with_radius(x: f64, y: f64, radius: f64) -> Self {
        Self {
            x,
            y,
            radius: Some(radius),
        }
    }
}

// ---------------------------------------------------------------------------
// Estimates
// ---------------------------------------------------------------------------

/// Planar centroid estimate emitted by a particle filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Estimate2d {
    pub x: f64,
    pub y: f64,
}

impl Estimate2d {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Fused physical-space estimate for one target, emitted once per frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Estimate3d {
    pub target: TargetId,
    /// Physical position [x, y, z]
    pub position: [f64; 3],
    /// Velocity components when the fusion state carries them
    pub velocity: Option<[f64; 3]>,
}
