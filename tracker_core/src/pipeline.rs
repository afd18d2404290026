//! Pipeline orchestrator: the full tracking cycle for one stereo frame.
//!
//! # Processing steps per frame (single-threaded, strictly in frame order)
//! 1. Per view: predict every particle filter (order-independent, rayon)
//! 2. Per view: derive inspect regions from the predictions (caller-supplied,
//!    the geometry collaborator's job)
//! 3. Per view: age measurement queues, associate detections, push matches
//! 4. Per view: correct every particle filter, retain the view's estimates
//! 5. Fuse: the single join point — both views' corrected estimates feed the
//!    per-target 3D Kalman filter
//!
//! A failed association (region/filter count mismatch) skips the rest of the
//! frame; filter state stays consistent and the next frame proceeds cleanly.

use crate::association::{associate, Assignment};
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::fusion::{stereo_measurement, FusionFilter};
use crate::particle::ParticleFilter;
use crate::types::{Detection, Estimate2d, Estimate3d, Rect, Rgb, TargetId, ViewId, NUM_VIEWS};
use rayon::prelude::*;

// ---------------------------------------------------------------------------
// Per-frame input and output
// ---------------------------------------------------------------------------

/// What the vision collaborator hands the core for one view in one frame.
#[derive(Clone, Debug, Default)]
pub struct ViewObservations {
    /// Ranked detections, best first
    pub detections: Vec<Detection>,
    /// Mean color sampled at each detection's position (same order)
    pub colors: Vec<Rgb>,
}

/// Outputs of one pipeline frame.
#[derive(Clone, Debug)]
pub struct FrameOutput {
    /// Corrected per-view centroids, indexed [view][target]
    pub view_estimates: [Vec<Estimate2d>; NUM_VIEWS],
    /// Association outcome per view
    pub assignments: [Assignment; NUM_VIEWS],
    /// Fused physical-space estimates, one per target with both views ready
    pub fused: Vec<Estimate3d>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

struct ViewBank {
    filters: Vec<ParticleFilter>,
    /// Latest corrected centroid per target, fed to fusion
    latest: Vec<Option<Estimate2d>>,
}

/// Owns the two per-view filter banks and the per-target fusion filters.
pub struct StereoPipeline {
    config: TrackerConfig,
    views: [ViewBank; NUM_VIEWS],
    fusion: Vec<FusionFilter>,
}

impl StereoPipeline {
    /// Create filters for every (target, view) pair and one fusion filter
    /// per target. Fails if the fusion configuration is malformed.
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
        let n = config.n_targets();
        let make_bank = |view: u64| ViewBank {
            filters: config
                .reference_colors
                .iter()
                .enumerate()
                .map(|(t, &color)| {
                    // Distinct deterministic stream per (view, target)
                    let seed = config.seed.wrapping_add(view * 1009 + t as u64);
                    ParticleFilter::new(config.particle.clone(), color, seed)
                })
                .collect(),
            latest: vec![None; n],
        };
        let views = [make_bank(0), make_bank(1)];
        let fusion = (0..n)
            .map(|_| FusionFilter::new(&config.fusion))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            views,
            fusion,
            config,
        })
    }

    pub fn n_targets(&self) -> usize {
        self.fusion.len()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Establish one view's spatial domain once its frame geometry is known.
    pub fn init_view(&mut self, view: ViewId, x_range: f64, y_range: f64) {
        for filter in &mut self.views[view.0 as usize].filters {
            filter.init(x_range, y_range);
        }
    }

    /// External reinitialization trigger for one target in one view,
    /// callable by any event source.
    pub fn reinitialize_target(&mut self, view: ViewId, target: TargetId) {
        self.views[view.0 as usize].filters[target.0 as usize].reinitialize();
    }

    pub fn filters(&self, view: ViewId) -> &[ParticleFilter] {
        &self.views[view.0 as usize].filters
    }

    // -----------------------------------------------------------------------
    // Per-view steps
    // -----------------------------------------------------------------------

    /// Advance every filter of one view and return the predicted centroids
    /// (the geometry collaborator derives inspect regions from these).
    pub fn predict_view(&mut self, view: ViewId) -> Result<Vec<Estimate2d>, TrackerError> {
        self.views[view.0 as usize]
            .filters
            .par_iter_mut()
            .map(|f| f.predict())
            .collect()
    }

    /// Run the association pass for one view.
    pub fn observe_view(
        &mut self,
        view: ViewId,
        observations: &ViewObservations,
        regions: &[Rect],
    ) -> Result<Assignment, TrackerError> {
        let bank = &mut self.views[view.0 as usize];
        let considered = observations
            .detections
            .len()
            .min(self.config.association.max_detections);
        if observations.colors.len() < considered {
            return Err(TrackerError::ShapeMismatch {
                expected: considered,
                got: observations.colors.len(),
            });
        }

        // Appearance score of every considered detection against every
        // filter's reference color.
        let scores: Vec<Vec<f64>> = observations.colors[..considered]
            .iter()
            .map(|&color| bank.filters.iter().map(|f| f.estimate_hit(color)).collect())
            .collect();

        associate(
            &self.config.association,
            &observations.detections,
            &scores,
            &mut bank.filters,
            regions,
        )
    }

    /// Correct every filter of one view against its pending measurements and
    /// retain the centroids as the view's latest estimates.
    pub fn correct_view(&mut self, view: ViewId) -> Result<Vec<Estimate2d>, TrackerError> {
        let bank = &mut self.views[view.0 as usize];
        let estimates: Vec<Estimate2d> = bank
            .filters
            .par_iter_mut()
            .map(|f| f.correct())
            .collect::<Result<_, _>>()?;
        for (slot, &est) in bank.latest.iter_mut().zip(&estimates) {
            *slot = Some(est);
        }
        Ok(estimates)
    }

    // -----------------------------------------------------------------------
    // Fusion join point
    // -----------------------------------------------------------------------

    /// Fuse both views' latest estimates into per-target 3D estimates.
    /// A target missing an estimate from either view is skipped this frame;
    /// a rejected fusion update falls back to the prediction-only state.
    pub fn fuse(&mut self) -> Vec<Estimate3d> {
        let mut fused = Vec::with_capacity(self.fusion.len());
        for (t, kf) in self.fusion.iter_mut().enumerate() {
            let (Some(e1), Some(e2)) = (self.views[0].latest[t], self.views[1].latest[t]) else {
                tracing::debug!("target {t}: missing a view estimate, fusion deferred");
                continue;
            };

            let prior = kf.predict();
            let z = stereo_measurement(e1, e2, &self.config.fusion.axis_scale);
            let state = match kf.correct(&z) {
                Ok(posterior) => posterior,
                Err(err) => {
                    tracing::warn!("target {t}: fusion update skipped: {err}");
                    prior
                }
            };

            let component = |i: usize| state.get(i).copied().unwrap_or(0.0);
            let velocity = if state.len() >= 6 {
                Some([component(3), component(4), component(5)])
            } else {
                None
            };
            fused.push(Estimate3d {
                target: TargetId(t as u32),
                position: [component(0), component(1), component(2)],
                velocity,
            });
        }
        fused
    }

    // -----------------------------------------------------------------------
    // Whole frame
    // -----------------------------------------------------------------------

    /// Run one complete frame: predict, associate and correct both views,
    /// then fuse. `derive_regions` maps a view's predicted centroids to the
    /// inspect region per filter (geometry collaborator).
    pub fn process_frame(
        &mut self,
        observations: &[ViewObservations; NUM_VIEWS],
        mut derive_regions: impl FnMut(ViewId, &[Estimate2d]) -> Vec<Rect>,
    ) -> Result<FrameOutput, TrackerError> {
        let mut view_estimates: [Vec<Estimate2d>; NUM_VIEWS] = Default::default();
        let mut assignments: [Assignment; NUM_VIEWS] = Default::default();

        for v in 0..NUM_VIEWS {
            let view = ViewId(v as u8);
            let predictions = self.predict_view(view)?;
            let regions = derive_regions(view, &predictions);
            assignments[v] = self.observe_view(view, &observations[v], &regions)?;
            view_estimates[v] = self.correct_view(view)?;
        }

        Ok(FrameOutput {
            fused: self.fuse(),
            view_estimates,
            assignments,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rgb;

    fn test_config() -> TrackerConfig {
        TrackerConfig {
            reference_colors: vec![Rgb::new(205.0, 62.0, 54.0)],
            ..TrackerConfig::default()
        }
    }

    fn full_frame(view_count: usize) -> impl FnMut(ViewId, &[Estimate2d]) -> Vec<Rect> {
        move |_, _| vec![Rect::new(0.0, 0.0, 640.0, 480.0); view_count]
    }

    fn observations_at(x: f64, y: f64, color: Rgb) -> ViewObservations {
        ViewObservations {
            detections: vec![Detection::with_radius(x, y, 12.0)],
            colors: vec![color],
        }
    }

    #[test]
    fn frame_cycle_produces_fused_estimate() {
        let mut pipeline = StereoPipeline::new(test_config()).unwrap();
        pipeline.init_view(ViewId(0), 640.0, 480.0);
        pipeline.init_view(ViewId(1), 640.0, 480.0);

        let color = Rgb::new(205.0, 62.0, 54.0);
        let obs = [
            observations_at(320.0, 240.0, color),
            observations_at(300.0, 240.0, color),
        ];
        let out = pipeline.process_frame(&obs, full_frame(1)).unwrap();

        assert_eq!(out.assignments[0].pairs.len(), 1);
        assert_eq!(out.assignments[1].pairs.len(), 1);
        assert_eq!(out.fused.len(), 1);
        assert!(out.fused[0].position.iter().all(|c| c.is_finite()));
        assert!(out.fused[0].velocity.is_some());
    }

    #[test]
    fn uninitialized_view_fails_frame() {
        let mut pipeline = StereoPipeline::new(test_config()).unwrap();
        let obs: [ViewObservations; NUM_VIEWS] = Default::default();
        let err = pipeline.process_frame(&obs, full_frame(1)).unwrap_err();
        assert_eq!(err, TrackerError::NotInitialized);
    }

    #[test]
    fn region_count_mismatch_skips_frame() {
        let mut pipeline = StereoPipeline::new(test_config()).unwrap();
        pipeline.init_view(ViewId(0), 640.0, 480.0);
        pipeline.init_view(ViewId(1), 640.0, 480.0);

        let obs: [ViewObservations; NUM_VIEWS] = Default::default();
        // Two regions for a single-filter bank
        let err = pipeline.process_frame(&obs, full_frame(2)).unwrap_err();
        assert_eq!(
            err,
            TrackerError::RegionMismatch {
                filters: 1,
                regions: 2
            }
        );
    }

    #[test]
    fn fusion_waits_for_both_views() {
        let mut pipeline = StereoPipeline::new(test_config()).unwrap();
        pipeline.init_view(ViewId(0), 640.0, 480.0);
        pipeline.init_view(ViewId(1), 640.0, 480.0);

        pipeline.predict_view(ViewId(0)).unwrap();
        pipeline.correct_view(ViewId(0)).unwrap();
        // View 1 never corrected: nothing to fuse yet
        assert!(pipeline.fuse().is_empty());
    }

    #[test]
    fn mismatched_color_list_rejected() {
        let mut pipeline = StereoPipeline::new(test_config()).unwrap();
        pipeline.init_view(ViewId(0), 640.0, 480.0);

        let obs = ViewObservations {
            detections: vec![Detection::new(10.0, 10.0)],
            colors: vec![],
        };
        let err = pipeline
            .observe_view(ViewId(0), &obs, &[Rect::new(0.0, 0.0, 640.0, 480.0)])
            .unwrap_err();
        assert_eq!(
            err,
            TrackerError::ShapeMismatch {
                expected: 1,
                got: 0
            }
        );
    }
}
