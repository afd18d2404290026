//! Immutable configuration passed into each component's constructor.
//!
//! Values are loaded externally (the CLI reads them from JSON) and handed in
//! as plain structs; nothing in the core reads process-wide state. Defaults
//! are tuned for frame-scaled coordinates of roughly 600×400 and a balloon
//! a few dozen pixels across.

use crate::error::TrackerError;
use crate::types::Rgb;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Particle filter
// ---------------------------------------------------------------------------

/// Motion-model and likelihood parameters for one per-view particle filter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParticleConfig {
    /// Number of particles N
    pub n_particles: usize,
    /// Escape particles injected per correct() call (relocation hedge)
    pub escape_particles: usize,
    /// Std dev of per-axis position noise added each predict (px)
    pub sigma_pos: f64,
    /// Std dev of redrawn velocity (px/s) — escape particles and random hits
    pub sigma_vel: f64,
    /// Std dev of the boundary-repulsion acceleration impulse (px/s²)
    pub sigma_acc: f64,
    /// Fraction of velocity lost per second to drag, in [0, 1)
    pub air_resistance: f64,
    /// Constant downward acceleration on the vertical axis (px/s²)
    pub gravity: f64,
    /// Per-second acceleration decay factor, in (0, 1]
    pub accel_reduction: f64,
    /// Per-axis acceleration magnitude clamp (px/s²)
    pub max_accel: f64,
    /// Probability per particle per predict of a full velocity redraw
    pub random_hit_prob: f64,
    /// Radial spread of the measurement likelihood (single-sigma model)
    pub sigma_meas: f64,
    /// Appearance samples darker than this on every channel score 0
    pub dark_color_threshold: f64,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            n_particles: 500,
            escape_particles: 10,
            sigma_pos: 2.0,
            sigma_vel: 40.0,
            sigma_acc: 30.0,
            air_resistance: 0.3,
            gravity: 90.0, // balloons fall slowly; image y grows downward
            accel_reduction: 0.6,
            max_accel: 150.0,
            random_hit_prob: 0.02,
            sigma_meas: 60.0,
            dark_color_threshold: 40.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Association
// ---------------------------------------------------------------------------

/// Parameters of the per-frame detection→filter assignment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssociationConfig {
    /// Appearance score a candidate pair must exceed to be considered
    pub min_hit: f64,
    /// Weight factor applied when the detection falls outside the filter's ROI
    pub out_region_penalty: f64,
    /// Only the best `max_detections` ranked detections are considered
    pub max_detections: usize,
    /// Frames a matched measurement keeps influencing correction
    pub measurement_max_age: u32,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            min_hit: 0.75,
            out_region_penalty: 0.3,
            max_detections: 6,
            measurement_max_age: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Fusion
// ---------------------------------------------------------------------------

/// Pixel→physical unit scale per axis. The depth scale z is the numerator of
/// the disparity-to-depth model W = z / |disparity|.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AxisScale {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for AxisScale {
    fn default() -> Self {
        Self {
            x: 0.01, // meters per pixel
            y: 0.01,
            z: 1.2, // baseline · focal length, in meter²-equivalent units
        }
    }
}

/// Fixed external configuration of the 3D fusion Kalman filter.
///
/// Matrices are row-major; `validate` checks their lengths against the
/// configured dimensions, and `FusionFilter::new` refuses malformed configs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FusionConfig {
    pub state_size: usize,
    pub measurement_size: usize,
    /// State transition A, `state_size × state_size`, row-major
    pub transition: Vec<f64>,
    /// Measurement matrix H, `measurement_size × state_size`, row-major
    pub measurement: Vec<f64>,
    /// Diagonal process noise value
    pub process_noise: f64,
    /// Diagonal measurement noise value (must be > 0)
    pub measurement_noise: f64,
    pub axis_scale: AxisScale,
}

impl FusionConfig {
    /// Constant-velocity transition for a position+velocity state.
    fn cv_transition(state_size: usize, dt: f64) -> Vec<f64> {
        let half = state_size / 2;
        let mut a = vec![0.0; state_size * state_size];
        for i in 0..state_size {
            a[i * state_size + i] = 1.0;
        }
        for i in 0..half {
            a[i * state_size + half + i] = dt;
        }
        a
    }

    /// Position-only measurement matrix [I | 0].
    fn position_measurement(meas_size: usize, state_size: usize) -> Vec<f64> {
        let mut h = vec![0.0; meas_size * state_size];
        for i in 0..meas_size {
            h[i * state_size + i] = 1.0;
        }
        h
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        let s = self.state_size;
        let m = self.measurement_size;
        if self.transition.len() != s * s {
            return Err(TrackerError::ShapeMismatch {
                expected: s * s,
                got: self.transition.len(),
            });
        }
        if self.measurement.len() != m * s {
            return Err(TrackerError::ShapeMismatch {
                expected: m * s,
                got: self.measurement.len(),
            });
        }
        Ok(())
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        let state_size = 6;
        let measurement_size = 3;
        Self {
            state_size,
            measurement_size,
            transition: Self::cv_transition(state_size, 1.0 / 30.0),
            measurement: Self::position_measurement(measurement_size, state_size),
            process_noise: 1e-4,
            measurement_noise: 1e-2,
            axis_scale: AxisScale::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Whole tracker
// ---------------------------------------------------------------------------

/// Configuration of the full two-view, multi-target tracker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Reference appearance per target; its length fixes the target count
    pub reference_colors: Vec<Rgb>,
    pub particle: ParticleConfig,
    pub association: AssociationConfig,
    pub fusion: FusionConfig,
    /// RNG seed; per-filter streams are derived from it
    pub seed: u64,
}

impl TrackerConfig {
    pub fn n_targets(&self) -> usize {
        self.reference_colors.len()
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            reference_colors: vec![Rgb::new(205.0, 62.0, 54.0)],
            particle: ParticleConfig::default(),
            association: AssociationConfig::default(),
            fusion: FusionConfig::default(),
            seed: 42,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
