//! Error type shared by the estimation core.

use thiserror::Error;

/// Errors surfaced by the filters and the per-frame pipeline.
///
/// Track loss (zero total correction weight) is deliberately *not* an error:
/// the particle filter recovers by reinitializing itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    /// Filter operation invoked before `init` established the spatial domain.
    #[error("filter not initialized")]
    NotInitialized,

    /// A vector or matrix does not match the configured dimensions.
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    /// The per-frame region list does not line up with the filter bank.
    /// The whole frame is skipped, never a crash.
    #[error("region count {regions} does not match filter count {filters}")]
    RegionMismatch { filters: usize, regions: usize },
}
