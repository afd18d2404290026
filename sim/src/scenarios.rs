//! Scenario definitions.
//!
//! Each scenario is a named configuration of ground-truth targets and
//! detector characteristics. All scenarios are deterministic given the same
//! seed.

use crate::target::{MotionSpec, SimTarget};
use crate::vision_sim::DetectorParams;
use serde::{Deserialize, Serialize};
use tracker_core::config::AxisScale;
use tracker_core::types::Rgb;
use vision_models::CameraParams;

/// Which pre-defined scenario to run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioKind {
    /// One drifting balloon, low clutter
    SingleDrift,
    /// Two balloons crossing paths, moderate clutter
    CrossingPair,
    /// Three balloons, one ballistic, heavier clutter and more misses
    ThreeBallistic,
}

/// A fully configured simulation scenario.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub seed: u64,
    /// Run length in seconds
    pub duration: f64,
    /// Frame interval (s)
    pub frame_dt: f64,
    pub targets: Vec<SimTarget>,
    pub detector: DetectorParams,
    pub axis_scale: AxisScale,
    pub cameras: [CameraParams; 2],
}

impl Scenario {
    /// Build the named scenario. Uses `seed` for repeatability.
    pub fn build(kind: ScenarioKind, seed: u64) -> Self {
        match kind {
            ScenarioKind::SingleDrift => Self::single_drift(seed),
            ScenarioKind::CrossingPair => Self::crossing_pair(seed),
            ScenarioKind::ThreeBallistic => Self::three_ballistic(seed),
        }
    }

    /// True target colors in target-ID order — the trackers' reference
    /// appearance.
    pub fn reference_colors(&self) -> Vec<Rgb> {
        self.targets.iter().map(|t| t.color).collect()
    }

    // -----------------------------------------------------------------------
    // Scenario 1: SingleDrift
    // -----------------------------------------------------------------------
    fn single_drift(seed: u64) -> Self {
        let targets = vec![SimTarget::new(
            0,
            [2.5, 1.8, 3.0],
            [0.0, -0.02, 0.0],
            Rgb::new(205.0, 62.0, 54.0),
            MotionSpec::Drift {
                amplitude: 0.6,
                period: 12.0,
            },
        )];

        Scenario {
            name: "single_drift".into(),
            seed,
            duration: 30.0,
            frame_dt: 1.0 / 30.0,
            targets,
            detector: DetectorParams {
                lambda_clutter: 0.5,
                ..DetectorParams::default()
            },
            axis_scale: AxisScale::default(),
            cameras: [CameraParams::default(), CameraParams::default()],
        }
    }

    // -----------------------------------------------------------------------
    // Scenario 2: CrossingPair
    // -----------------------------------------------------------------------
    fn crossing_pair(seed: u64) -> Self {
        let targets = vec![
            SimTarget::new(
                0,
                [1.0, 1.5, 2.5],
                [0.12, 0.0, 0.02],
                Rgb::new(205.0, 62.0, 54.0),
                MotionSpec::ConstantVelocity,
            ),
            SimTarget::new(
                1,
                [4.5, 1.7, 3.5],
                [-0.12, 0.0, -0.02],
                Rgb::new(58.0, 110.0, 196.0),
                MotionSpec::ConstantVelocity,
            ),
        ];

        Scenario {
            name: "crossing_pair".into(),
            seed,
            duration: 25.0,
            frame_dt: 1.0 / 30.0,
            targets,
            detector: DetectorParams {
                lambda_clutter: 1.0,
                ..DetectorParams::default()
            },
            axis_scale: AxisScale::default(),
            cameras: [CameraParams::default(), CameraParams::default()],
        }
    }

    // -----------------------------------------------------------------------
    // Scenario 3: ThreeBallistic
    // -----------------------------------------------------------------------
    fn three_ballistic(seed: u64) -> Self {
        let targets = vec![
            SimTarget::new(
                0,
                [1.2, 3.5, 2.2],
                [0.3, -1.4, 0.1],
                Rgb::new(205.0, 62.0, 54.0),
                MotionSpec::Ballistic {
                    gravity: 0.8,
                    drag: 0.25,
                },
            ),
            SimTarget::new(
                1,
                [3.0, 1.2, 3.0],
                [0.0, -0.03, 0.0],
                Rgb::new(58.0, 110.0, 196.0),
                MotionSpec::Drift {
                    amplitude: 0.4,
                    period: 9.0,
                },
            ),
            SimTarget::new(
                2,
                [5.0, 2.0, 4.0],
                [-0.08, 0.0, -0.03],
                Rgb::new(240.0, 196.0, 60.0),
                MotionSpec::ConstantVelocity,
            ),
        ];

        Scenario {
            name: "three_ballistic".into(),
            seed,
            duration: 20.0,
            frame_dt: 1.0 / 30.0,
            targets,
            detector: DetectorParams {
                lambda_clutter: 2.0,
                p_detection: 0.85,
                ..DetectorParams::default()
            },
            axis_scale: AxisScale::default(),
            cameras: [CameraParams::default(), CameraParams::default()],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
