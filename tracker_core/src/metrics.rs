//! Accuracy metrics: fused-position RMSE against ground truth.

use crate::types::{Estimate3d, TargetId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Accumulated statistics over a run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FusionMetrics {
    /// Number of frames evaluated
    pub n_frames: u64,
    /// Total number of (estimate, ground-truth) pairs evaluated
    pub n_matched: u64,
    /// Sum of squared 3D position errors (for RMSE)
    pub sum_sq_pos_err: f64,
    /// Worst single-frame position error seen
    pub max_pos_err: f64,
    /// Frames in which a target had no fused estimate
    pub missed_updates: u64,
}

impl FusionMetrics {
    /// Root-mean-square fused position error (physical units).
    pub fn rmse_position(&self) -> f64 {
        if self.n_matched == 0 {
            return 0.0;
        }
        (self.sum_sq_pos_err / self.n_matched as f64).sqrt()
    }

    /// Accumulate one frame's fused estimates against ground truth.
    pub fn accumulate(&mut self, fused: &[Estimate3d], ground_truth: &[(TargetId, [f64; 3])]) {
        self.n_frames += 1;

        let estimates: HashMap<TargetId, &Estimate3d> =
            fused.iter().map(|e| (e.target, e)).collect();

        for (target, truth) in ground_truth {
            let Some(est) = estimates.get(target) else {
                self.missed_updates += 1;
                continue;
            };
            let dx = est.position[0] - truth[0];
            let dy = est.position[1] - truth[1];
            let dz = est.position[2] - truth[2];
            let sq = dx * dx + dy * dy + dz * dz;
            self.sum_sq_pos_err += sq;
            self.max_pos_err = self.max_pos_err.max(sq.sqrt());
            self.n_matched += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn estimate(target: u32, position: [f64; 3]) -> Estimate3d {
        Estimate3d {
            target: TargetId(target),
            position,
            velocity: None,
        }
    }

    #[test]
    fn rmse_over_two_frames() {
        let mut m = FusionMetrics::default();
        m.accumulate(
            &[estimate(0, [1.0, 0.0, 0.0])],
            &[(TargetId(0), [0.0, 0.0, 0.0])],
        );
        m.accumulate(
            &[estimate(0, [0.0, 3.0, 0.0])],
            &[(TargetId(0), [0.0, 0.0, 0.0])],
        );
        assert_eq!(m.n_matched, 2);
        assert_abs_diff_eq!(m.rmse_position(), (5.0f64 / 2.0).sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(m.max_pos_err, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn missing_estimate_counts_as_missed_update() {
        let mut m = FusionMetrics::default();
        m.accumulate(&[], &[(TargetId(0), [0.0, 0.0, 0.0])]);
        assert_eq!(m.missed_updates, 1);
        assert_eq!(m.n_matched, 0);
        assert_eq!(m.rmse_position(), 0.0);
    }
}
