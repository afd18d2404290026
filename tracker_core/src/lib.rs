//! `tracker_core` — Core stereo target-tracking algorithms.
//!
//! # Module layout
//! - [`types`]       — Fundamental types (IDs, detections, regions, estimates)
//! - [`error`]       — Core error enum
//! - [`config`]      — Immutable component configuration
//! - [`particle`]    — Per-view condensation particle filter
//! - [`association`] — Greedy exclusive detection→filter assignment
//! - [`fusion`]      — Disparity-based 3D fusion Kalman filter
//! - [`pipeline`]    — Full per-frame orchestrator
//! - [`metrics`]     — Fused-position accuracy metrics

pub mod association;
pub mod config;
pub mod error;
pub mod fusion;
pub mod metrics;
pub mod particle;
pub mod pipeline;
pub mod types;

pub use config::{AssociationConfig, AxisScale, FusionConfig, ParticleConfig, TrackerConfig};
pub use error::TrackerError;
pub use pipeline::{FrameOutput, StereoPipeline, ViewObservations};
pub use types::{Detection, Estimate2d, Estimate3d, Rect, Rgb, TargetId, ViewId, NUM_VIEWS};
