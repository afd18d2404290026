//! The vision collaborator seam: what the core consumes each frame.
//!
//! The core never touches pixels. A `DetectionSource` hands it ranked circle
//! candidates; an `AppearanceSampler` answers point queries for the mean
//! color of a patch, which the filters score against their reference color.

use tracker_core::types::{Detection, Rgb, ViewId};

/// Per-frame supplier of ranked circle candidates for one view.
pub trait DetectionSource {
    /// Candidates for the current frame, best first. The caller caps the
    /// list to its configured top-K before scoring.
    fn detections(&mut self, view: ViewId) -> Vec<Detection>;
}

/// Point-query supplier of mean patch colors for appearance scoring.
pub trait AppearanceSampler {
    /// Mean color of the circular patch centered at `(x, y)`.
    fn mean_color(&mut self, view: ViewId, x: f64, y: f64, radius: f64) -> Rgb;
}
