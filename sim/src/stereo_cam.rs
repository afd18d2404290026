//! Two-view projection rig.
//!
//! The inverse of the core's disparity-to-depth model: a physical point
//! (X, Y, Z) lands at the same pixel height in both views, view 1 sees its
//! horizontal position directly and view 2 sees it shifted by
//! `depth_scale / Z` physical units. Feeding these projections back through
//! the fusion measurement `W = depth_scale / |xe2 − xe1|` recovers Z.

use serde::{Deserialize, Serialize};
use tracker_core::config::AxisScale;
use tracker_core::types::Estimate2d;

/// Minimum depth accepted by the projection; everything closer is treated
/// as sitting on this plane.
const MIN_DEPTH: f64 = 1e-3;

/// The two offset cameras as one unit.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct StereoRig {
    pub axis_scale: AxisScale,
}

impl StereoRig {
    pub fn new(axis_scale: AxisScale) -> Self {
        Self { axis_scale }
    }

    /// Project a physical point into pixel coordinates of both views.
    pub fn project(&self, position: [f64; 3]) -> [Estimate2d; 2] {
        let [x, y, z] = position;
        let depth = z.max(MIN_DEPTH);
        let disparity = self.axis_scale.z / depth;

        let view1 = Estimate2d::new(x / self.axis_scale.x, y / self.axis_scale.y);
        let view2 = Estimate2d::new((x + disparity) / self.axis_scale.x, y / self.axis_scale.y);
        [view1, view2]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
