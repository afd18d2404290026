//! Camera frame geometry: scaled frame dimensions and inspect regions.
//!
//! The inspect region biases association toward where a filter expects its
//! target; its derivation from the filter's own prediction lives here, at
//! the geometry collaborator seam, not in the core.

use serde::{Deserialize, Serialize};
use tracker_core::types::{Estimate2d, Rect};

/// Geometry of one camera view.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CameraParams {
    /// Native frame width (pixels)
    pub frame_width: f64,
    /// Native frame height (pixels)
    pub frame_height: f64,
    /// Frames are shrunk so their area matches this (pixels²); all tracking
    /// runs in the scaled coordinates
    pub target_area: f64,
    /// Inspect-window width in scaled pixels
    pub inspect_width: f64,
    /// Inspect-window height in scaled pixels
    pub inspect_height: f64,
}

impl CameraParams {
    pub fn scale_factor(&self) -> f64 {
        (self.target_area / (self.frame_width * self.frame_height)).sqrt()
    }

    pub fn scaled_width(&self) -> f64 {
        self.frame_width * self.scale_factor()
    }

    pub fn scaled_height(&self) -> f64 {
        self.frame_height * self.scale_factor()
    }
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            frame_width: 1280.0,
            frame_height: 960.0,
            target_area: 640.0 * 480.0,
            inspect_width: 120.0,
            inspect_height: 120.0,
        }
    }
}

/// Rectangle of the configured inspect size around `center`, clamped to the
/// scaled frame. The center drifts off-middle when the prediction sits near
/// an edge.
pub fn inspect_region(center: Estimate2d, params: &CameraParams) -> Rect {
    let cols = params.scaled_width();
    let rows = params.scaled_height();
    let x1 = (center.x - params.inspect_width / 2.0).max(0.0);
    let x2 = (center.x + params.inspect_width / 2.0).min(cols);
    let y1 = (center.y - params.inspect_height / 2.0).max(0.0);
    let y2 = (center.y + params.inspect_height / 2.0).min(rows);
    Rect::new(x1, y1, x2 - x1, y2 - y1)
}

/// Full scaled frame, used when a filter has no credible prediction.
pub fn full_frame(params: &CameraParams) -> Rect {
    Rect::new(0.0, 0.0, params.scaled_width(), params.scaled_height())
}

/// One region per prediction: the inspect window around it, or the full
/// frame when the prediction has left the domain.
pub fn regions_from_predictions(predictions: &[Estimate2d], params: &CameraParams) -> Vec<Rect> {
    let cols = params.scaled_width();
    let rows = params.scaled_height();
    predictions
        .iter()
        .map(|p| {
            if p.x < 0.0 || p.x > cols || p.y < 0.0 || p.y > rows {
                full_frame(params)
            } else {
                inspect_region(*p, params)
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn params() -> CameraParams {
        CameraParams {
            frame_width: 640.0,
            frame_height: 480.0,
            target_area: 640.0 * 480.0, // scale factor 1
            inspect_width: 100.0,
            inspect_height: 80.0,
        }
    }

    #[test]
    fn centered_region_is_symmetric() {
        let r = inspect_region(Estimate2d::new(320.0, 240.0), &params());
        assert_abs_diff_eq!(r.x, 270.0);
        assert_abs_diff_eq!(r.y, 200.0);
        assert_abs_diff_eq!(r.width, 100.0);
        assert_abs_diff_eq!(r.height, 80.0);
    }

    #[test]
    fn edge_region_is_clamped() {
        let r = inspect_region(Estimate2d::new(10.0, 470.0), &params());
        assert_abs_diff_eq!(r.x, 0.0);
        assert_abs_diff_eq!(r.width, 60.0);
        assert_abs_diff_eq!(r.y, 430.0);
        assert_abs_diff_eq!(r.height, 50.0);
    }

    #[test]
    fn out_of_bounds_prediction_falls_back_to_full_frame() {
        let regions = regions_from_predictions(
            &[Estimate2d::new(-5.0, 100.0), Estimate2d::new(100.0, 100.0)],
            &params(),
        );
        assert_eq!(regions[0], full_frame(&params()));
        assert!(regions[1].width < 640.0);
    }

    #[test]
    fn scale_factor_shrinks_to_target_area() {
        let p = CameraParams {
            frame_width: 1280.0,
            frame_height: 960.0,
            target_area: 640.0 * 480.0,
            ..params()
        };
        let area = p.scaled_width() * p.scaled_height();
        assert_abs_diff_eq!(area, 640.0 * 480.0, epsilon = 1e-6);
    }
}
