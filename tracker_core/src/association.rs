//! Data association: exclusive detection→filter assignment for one frame.
//!
//! # Algorithm
//! 1. Age every filter's pending measurements, dropping expired ones.
//! 2. For each (detection, filter) pair: weight 1 inside the filter's ROI,
//!    a configured penalty < 1 outside; pairs whose appearance score does
//!    not exceed the threshold are discarded, the rest become candidates
//!    carrying a `PendingMeasurement(pos, weight·score², max_age)`.
//! 3. Sort candidates by score descending and scan greedily: a candidate is
//!    accepted only if neither its detection nor its filter has been claimed
//!    this frame.
//!
//! The greedy scan approximates maximum-weight bipartite matching; ties are
//! broken by sort order. Accepted measurements then age independently inside
//! their filter's queue, so correction can draw on slightly stale detections
//! in frames with no fresh match.

use crate::config::AssociationConfig;
use crate::error::TrackerError;
use crate::particle::{ParticleFilter, PendingMeasurement};
use crate::types::{Detection, Rect};

// ---------------------------------------------------------------------------
// Candidate and result types
// ---------------------------------------------------------------------------

/// One surviving (detection, filter) pairing considered for assignment.
#[derive(Clone, Debug)]
struct Candidate {
    detection: usize,
    filter: usize,
    score: f64,
    measurement: PendingMeasurement,
}

/// Accepted pairing of one detection with one filter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchedPair {
    pub detection: usize,
    pub filter: usize,
    pub score: f64,
}

/// Outcome of one association pass.
#[derive(Clone, Debug, Default)]
pub struct Assignment {
    /// Accepted pairs, in acceptance (score-descending) order
    pub pairs: Vec<MatchedPair>,
    /// Filters that received no new measurement this frame
    pub unmatched_filters: Vec<usize>,
    /// Considered detections that were not assigned
    pub unmatched_detections: Vec<usize>,
}

// ---------------------------------------------------------------------------
// Association pass
// ---------------------------------------------------------------------------

/// Assign detections to filters for one frame and push the accepted
/// measurements onto the winning filters' queues.
///
/// `scores[i][j]` is the appearance score of detection `i` against filter
/// `j`, supplied by the vision collaborator via `estimate_hit`. Only the
/// first `max_detections` ranked detections are considered.
///
/// Fails with [`TrackerError::RegionMismatch`] when the region list does not
/// line up with the filter bank (the caller skips the frame), and with
/// [`TrackerError::ShapeMismatch`] on a malformed score matrix. Both checks
/// run before any filter is mutated.
pub fn associate(
    config: &AssociationConfig,
    detections: &[Detection],
    scores: &[Vec<f64>],
    filters: &mut [ParticleFilter],
    regions: &[Rect],
) -> Result<Assignment, TrackerError> {
    if filters.len() != regions.len() {
        return Err(TrackerError::RegionMismatch {
            filters: filters.len(),
            regions: regions.len(),
        });
    }

    let considered = detections.len().min(config.max_detections);
    if scores.len() < considered {
        return Err(TrackerError::ShapeMismatch {
            expected: considered,
            got: scores.len(),
        });
    }
    for row in &scores[..considered] {
        if row.len() != filters.len() {
            return Err(TrackerError::ShapeMismatch {
                expected: filters.len(),
                got: row.len(),
            });
        }
    }

    for filter in filters.iter_mut() {
        filter.age_measurements();
    }

    let mut candidates = Vec::new();
    for (i, det) in detections[..considered].iter().enumerate() {
        for (j, region) in regions.iter().enumerate() {
            let w = if region.contains(det.x, det.y) {
                1.0
            } else {
                config.out_region_penalty
            };
            let score = scores[i][j];
            if score > config.min_hit {
                candidates.push(Candidate {
                    detection: i,
                    filter: j,
                    score,
                    // Only the appearance score is squared; the region
                    // penalty enters linearly.
                    measurement: PendingMeasurement::new(
                        det.x,
                        det.y,
                        w * score * score,
                        config.measurement_max_age,
                    ),
                });
            }
        }
    }

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut claimed_detection = vec![false; considered];
    let mut claimed_filter = vec![false; filters.len()];
    let mut assignment = Assignment::default();

    for cand in candidates {
        if claimed_detection[cand.detection] || claimed_filter[cand.filter] {
            continue;
        }
        claimed_detection[cand.detection] = true;
        claimed_filter[cand.filter] = true;
        filters[cand.filter].push_measurement(cand.measurement);
        assignment.pairs.push(MatchedPair {
            detection: cand.detection,
            filter: cand.filter,
            score: cand.score,
        });
    }

    assignment.unmatched_filters = (0..filters.len()).filter(|&j| !claimed_filter[j]).collect();
    assignment.unmatched_detections = (0..considered)
        .filter(|&i| !claimed_detection[i])
        .collect();

    Ok(assignment)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
