//! 3D fusion: a linear Kalman filter over the two views' planar estimates.
//!
//! # Measurement model
//! With per-view centroids already scaled to physical units,
//! U = xe1,  V = (ye1 + ye2)/2,  W = depth_scale / |xe2 − xe1|
//! (planar disparity-to-depth). Equal horizontal coordinates are nudged by
//! one horizontal unit so W stays finite.
//!
//! # Filter equations
//! Predict:  x⁻ = A·x,  P⁻ = A·P·Aᵀ + Q
//! Correct:  K = P⁻·Hᵀ·(H·P⁻·Hᵀ + R)⁻¹,
//!           x = x⁻ + K·(z − H·x⁻),  P = (I − K·H)·P⁻
//!
//! Transition and measurement matrices and both noise covariances are fixed
//! external configuration; dimensions are validated at construction and at
//! every correct call.

use crate::config::{AxisScale, FusionConfig};
use crate::error::TrackerError;
use crate::types::{DMat, DVec, Estimate2d};

// ---------------------------------------------------------------------------
// Stereo measurement construction
// ---------------------------------------------------------------------------

/// Build the fused [U, V, W] measurement from the two views' corrected
/// planar centroids. `W` is finite for every input, including zero
/// disparity.
pub fn stereo_measurement(view1: Estimate2d, view2: Estimate2d, scale: &AxisScale) -> DVec {
    let xe1 = view1.x * scale.x;
    let ye1 = view1.y * scale.y;
    let mut xe2 = view2.x * scale.x;
    let ye2 = view2.y * scale.y;

    let u = xe1;
    let v = (ye1 + ye2) / 2.0;
    if xe2 == xe1 {
        xe2 = xe1 + scale.x;
    }
    let w = scale.z / (xe2 - xe1).abs();

    DVec::from_vec(vec![u, v, w])
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Linear Kalman filter fusing the two per-view estimates into a 3D state.
/// One instance per target, persistent across frames.
#[derive(Clone, Debug)]
pub struct FusionFilter {
    state_size: usize,
    measurement_size: usize,
    transition: DMat,
    measurement: DMat,
    process_noise_cov: DMat,
    measurement_noise_cov: DMat,
    state_pre: DVec,
    state_post: DVec,
    error_cov_pre: DMat,
    error_cov_post: DMat,
    gain: DMat,
}

impl FusionFilter {
    /// Build a filter from validated configuration. Malformed matrix shapes
    /// are rejected with `ShapeMismatch`.
    pub fn new(config: &FusionConfig) -> Result<Self, TrackerError> {
        config.validate()?;
        let s = config.state_size;
        let m = config.measurement_size;

        let mut state_post = DVec::zeros(s);
        // Depth prior starts one unit in front of the camera plane
        if s > 2 {
            state_post[2] = 1.0;
        }

        Ok(Self {
            state_size: s,
            measurement_size: m,
            transition: DMat::from_row_slice(s, s, &config.transition),
            measurement: DMat::from_row_slice(m, s, &config.measurement),
            process_noise_cov: DMat::identity(s, s) * config.process_noise,
            measurement_noise_cov: DMat::identity(m, m) * config.measurement_noise,
            state_pre: state_post.clone(),
            state_post,
            error_cov_pre: DMat::identity(s, s),
            error_cov_post: DMat::identity(s, s),
            gain: DMat::zeros(s, m),
        })
    }

    pub fn state_size(&self) -> usize {
        self.state_size
    }

    pub fn measurement_size(&self) -> usize {
        self.measurement_size
    }

    /// Posterior state after the most recent correct (or construction).
    pub fn state(&self) -> &DVec {
        &self.state_post
    }

    pub fn error_cov(&self) -> &DMat {
        &self.error_cov_post
    }

    /// Advance the prior: x⁻ = A·x, P⁻ = A·P·Aᵀ + Q.
    pub fn predict(&mut self) -> DVec {
        self.state_pre = &self.transition * &self.state_post;
        self.error_cov_pre =
            &self.transition * &self.error_cov_post * self.transition.transpose()
                + &self.process_noise_cov;
        self.state_pre.clone()
    }

    /// Fold a measurement into the posterior. A wrong-dimension measurement
    /// is rejected with `ShapeMismatch` and leaves the filter untouched, so
    /// the caller can skip this target's update for the frame.
    pub fn correct(&mut self, measurement: &DVec) -> Result<DVec, TrackerError> {
        if measurement.len() != self.measurement_size {
            return Err(TrackerError::ShapeMismatch {
                expected: self.measurement_size,
                got: measurement.len(),
            });
        }

        let h = &self.measurement;

        // Innovation covariance S = H·P⁻·Hᵀ + R  (LU for numerical stability)
        let s_mat = h * &self.error_cov_pre * h.transpose() + &self.measurement_noise_cov;
        let s_inv = s_mat
            .lu()
            .try_inverse()
            .expect("innovation covariance is singular");

        self.gain = &self.error_cov_pre * h.transpose() * s_inv;

        let innovation = measurement - h * &self.state_pre;
        self.state_post = &self.state_pre + &self.gain * innovation;

        let identity = DMat::identity(self.state_size, self.state_size);
        self.error_cov_post = (identity - &self.gain * h) * &self.error_cov_pre;

        Ok(self.state_post.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Identity A/H, zero noise: the classic fixed-point configuration.
    fn identity_config(n: usize) -> FusionConfig {
        let mut eye = vec![0.0; n * n];
        for i in 0..n {
            eye[i * n + i] = 1.0;
        }
        FusionConfig {
            state_size: n,
            measurement_size: n,
            transition: eye.clone(),
            measurement: eye,
            process_noise: 0.0,
            measurement_noise: 0.0,
            ..FusionConfig::default()
        }
    }

    #[test]
    fn identity_filter_reproduces_measurement() {
        let mut kf = FusionFilter::new(&identity_config(3)).unwrap();
        kf.predict();
        let z = DVec::from_vec(vec![1.5, -2.0, 4.0]);
        let posterior = kf.correct(&z).unwrap();
        for i in 0..3 {
            assert_abs_diff_eq!(posterior[i], z[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn wrong_dimension_measurement_is_rejected_without_mutation() {
        let mut kf = FusionFilter::new(&FusionConfig::default()).unwrap();
        kf.predict();
        let before = kf.state().clone();

        let err = kf.correct(&DVec::from_vec(vec![1.0, 2.0])).unwrap_err();
        assert_eq!(
            err,
            TrackerError::ShapeMismatch {
                expected: 3,
                got: 2
            }
        );
        assert_eq!(kf.state(), &before);
    }

    #[test]
    fn predict_propagates_velocity() {
        // Default config: CV transition with dt = 1/30
        let mut kf = FusionFilter::new(&FusionConfig::default()).unwrap();
        kf.state_post[3] = 3.0; // vx
        let prior = kf.predict();
        assert_abs_diff_eq!(prior[0], 3.0 / 30.0, epsilon = 1e-12);
    }

    #[test]
    fn update_reduces_uncertainty() {
        let mut kf = FusionFilter::new(&FusionConfig::default()).unwrap();
        kf.predict();
        let prior_trace: f64 = (0..6).map(|i| kf.error_cov_pre[(i, i)]).sum();
        kf.correct(&DVec::from_vec(vec![0.5, 0.5, 2.0])).unwrap();
        let post_trace: f64 = (0..6).map(|i| kf.error_cov()[(i, i)]).sum();
        assert!(post_trace < prior_trace, "Update should reduce uncertainty");
    }

    #[test]
    fn posterior_covariance_stays_symmetric() {
        let mut kf = FusionFilter::new(&FusionConfig::default()).unwrap();
        for k in 0..20 {
            kf.predict();
            let z = DVec::from_vec(vec![0.1 * k as f64, 0.2, 1.0]);
            kf.correct(&z).unwrap();
        }
        let p = kf.error_cov();
        for i in 0..6 {
            for j in 0..6 {
                assert_abs_diff_eq!(p[(i, j)], p[(j, i)], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn zero_disparity_depth_is_finite() {
        let scale = AxisScale {
            x: 0.01,
            y: 0.01,
            z: 1.2,
        };
        let e = Estimate2d::new(100.0, 50.0);
        let z = stereo_measurement(e, e, &scale);
        assert!(z[2].is_finite());
        // Disparity collapses to exactly one horizontal unit
        assert_abs_diff_eq!(z[2], 1.2 / 0.01, epsilon = 1e-9);
    }

    #[test]
    fn stereo_measurement_construction() {
        let scale = AxisScale {
            x: 2.0,
            y: 3.0,
            z: 12.0,
        };
        let v1 = Estimate2d::new(10.0, 4.0);
        let v2 = Estimate2d::new(13.0, 6.0);
        let z = stereo_measurement(v1, v2, &scale);
        assert_abs_diff_eq!(z[0], 20.0, epsilon = 1e-12); // U = xe1
        assert_abs_diff_eq!(z[1], 15.0, epsilon = 1e-12); // V = mean of ye
        assert_abs_diff_eq!(z[2], 12.0 / 6.0, epsilon = 1e-12); // W = z / |Δx|
    }
}
