//! Simulated vision front end.
//!
//! Stands in for the real detector chain with:
//! - Gaussian pixel noise on detection positions
//! - Miss probability (1 − P_D)
//! - Poisson clutter (false circles on a dark background)
//! - An appearance sampler that answers with the nearest target's true color
//!   plus channel noise, or the background color away from any target

use crate::stereo_cam::StereoRig;
use crate::target::SimTarget;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Normal, Poisson};
use serde::{Deserialize, Serialize};
use tracker_core::types::{Detection, Estimate2d, Rgb, ViewId, NUM_VIEWS};
use vision_models::{AppearanceSampler, CameraParams, DetectionSource};

/// Noise and clutter characteristics of the simulated detector.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DetectorParams {
    /// Std dev of detection position noise (scaled pixels)
    pub sigma_px: f64,
    /// Probability of detecting a visible target per frame
    pub p_detection: f64,
    /// Mean number of clutter circles per view per frame
    pub lambda_clutter: f64,
    /// Reported circle radius (scaled pixels)
    pub mean_radius: f64,
    /// Std dev of per-channel appearance noise
    pub color_noise_std: f64,
    /// Color sampled away from any target; dark enough to fail the
    /// trackers' dark-color threshold
    pub background: Rgb,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            sigma_px: 1.5,
            p_detection: 0.92,
            lambda_clutter: 1.0,
            mean_radius: 12.0,
            color_noise_std: 6.0,
            background: Rgb::new(22.0, 20.0, 24.0),
        }
    }
}

/// Generates per-view detections and appearance samples from ground truth.
pub struct SimulatedVision {
    rig: StereoRig,
    cameras: [CameraParams; NUM_VIEWS],
    params: DetectorParams,
    rng: ChaCha8Rng,
    /// Projected truth (position, color) per view, refreshed by `observe`
    projected: [Vec<(Estimate2d, Rgb)>; NUM_VIEWS],
    detections: [Vec<Detection>; NUM_VIEWS],
}

impl SimulatedVision {
    pub fn new(
        rig: StereoRig,
        cameras: [CameraParams; NUM_VIEWS],
        params: DetectorParams,
        seed: u64,
    ) -> Self {
        Self {
            rig,
            cameras,
            params,
            rng: ChaCha8Rng::seed_from_u64(seed),
            projected: Default::default(),
            detections: Default::default(),
        }
    }

    pub fn cameras(&self) -> &[CameraParams; NUM_VIEWS] {
        &self.cameras
    }

    /// Refresh both views' candidate lists from the current ground truth.
    /// Target detections come first (the detector ranks real circles above
    /// clutter), clutter after.
    pub fn observe(&mut self, targets: &[SimTarget]) {
        for v in 0..NUM_VIEWS {
            self.projected[v].clear();
            self.detections[v].clear();
        }

        let pos_noise =
            Normal::new(0.0, self.params.sigma_px).expect("sigma_px must be finite and >= 0");

        for target in targets {
            let views = self.rig.project(target.position);
            for (v, &center) in views.iter().enumerate() {
                self.projected[v].push((center, target.color));

                if self.rng.gen::<f64>() > self.params.p_detection {
                    continue; // missed this frame
                }
                let x = center.x + pos_noise.sample(&mut self.rng);
                let y = center.y + pos_noise.sample(&mut self.rng);
                let cam = &self.cameras[v];
                if x < 0.0 || x > cam.scaled_width() || y < 0.0 || y > cam.scaled_height() {
                    continue; // left the frame
                }
                self.detections[v].push(Detection::with_radius(x, y, self.params.mean_radius));
            }
        }

        if self.params.lambda_clutter > 0.0 {
            let poisson =
                Poisson::new(self.params.lambda_clutter).expect("lambda_clutter must be finite");
            for v in 0..NUM_VIEWS {
                let n = (poisson.sample(&mut self.rng) as usize).min(20);
                let cam = self.cameras[v];
                for _ in 0..n {
                    let x = self.rng.gen::<f64>() * cam.scaled_width();
                    let y = self.rng.gen::<f64>() * cam.scaled_height();
                    self.detections[v].push(Detection::with_radius(
                        x,
                        y,
                        self.params.mean_radius,
                    ));
                }
            }
        }
    }

    fn sample_noisy(&mut self, color: Rgb) -> Rgb {
        let noise =
            Normal::new(0.0, self.params.color_noise_std).expect("color noise std must be >= 0");
        let mut channel = |c: f64| (c + noise.sample(&mut self.rng)).clamp(0.0, 255.0);
        Rgb::new(channel(color.r), channel(color.g), channel(color.b))
    }
}

impl DetectionSource for SimulatedVision {
    fn detections(&mut self, view: ViewId) -> Vec<Detection> {
        self.detections[view.0 as usize].clone()
    }
}

impl AppearanceSampler for SimulatedVision {
    fn mean_color(&mut self, view: ViewId, x: f64, y: f64, radius: f64) -> Rgb {
        let reach = radius * 1.5;
        let nearest = self.projected[view.0 as usize]
            .iter()
            .map(|&(center, color)| {
                let dx = center.x - x;
                let dy = center.y - y;
                (dx * dx + dy * dy, color)
            })
            .min_by(|a, b| a.0.total_cmp(&b.0));

        match nearest {
            Some((d2, color)) if d2 <= reach * reach => self.sample_noisy(color),
            _ => self.params.background,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
