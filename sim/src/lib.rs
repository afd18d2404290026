//! `sim` — Synthetic stereo scenarios: ground-truth targets, a two-view
//! projection rig, and a simulated detector/appearance sampler.

pub mod scenarios;
pub mod stereo_cam;
pub mod target;
pub mod vision_sim;

pub use scenarios::{Scenario, ScenarioKind};
pub use stereo_cam::StereoRig;
pub use target::{MotionSpec, SimTarget};
pub use vision_sim::{DetectorParams, SimulatedVision};
