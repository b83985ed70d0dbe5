use slam2d_scan::PointSet;

use crate::pose::Pose2D;
use crate::spatial_index::SpatialIndex;

/// Number of neighbors that define a target line.
const NUM_NEIGHBORS: usize = 2;

// neighbor pairs closer than this define no line
const MIN_LINE_LENGTH: f64 = 1e-9;

/// A point of the previous scan paired with a line segment of the current scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correspondence {
    /// Index of the point in the previous scan.
    pub source: usize,
    /// Index of the nearest point in the current scan.
    pub first: usize,
    /// Index of the second nearest point in the current scan.
    pub second: usize,
}

/// Bookkeeping of why previous-scan points produced no correspondence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrespondenceStats {
    /// Number of previous-scan points queried.
    pub num_queries: usize,
    /// Points for which the index returned fewer than two neighbors.
    pub num_insufficient: usize,
    /// Points whose nearest neighbor was beyond the distance gate.
    pub num_gated: usize,
    /// Points whose two neighbors coincide.
    pub num_degenerate: usize,
}

/// Pair every point of `source` with the two nearest points of `target`.
///
/// Each source point is first moved by `pose` into the target frame. A
/// correspondence is emitted only when two neighbors are found, the nearest
/// one lies within `max_distance` (if any) and the two neighbors are distinct.
///
/// # Arguments
///
/// * `source` - The previous scan.
/// * `target` - The current scan, indexed by `index`.
/// * `index` - Spatial index built over `target`.
/// * `pose` - Current estimate of the previous-to-current transform.
/// * `max_distance` - Optional gate on the nearest neighbor distance.
///
/// # Returns
///
/// The correspondences in source order and the rejection statistics.
pub fn find_correspondences(
    source: &PointSet,
    target: &PointSet,
    index: &SpatialIndex,
    pose: &Pose2D,
    max_distance: Option<f64>,
) -> (Vec<Correspondence>, CorrespondenceStats) {
    let mut stats = CorrespondenceStats {
        num_queries: source.len(),
        ..Default::default()
    };
    let mut correspondences = Vec::with_capacity(source.len());

    for (i, p) in source.iter().enumerate() {
        let predicted = pose.transform_point(p);
        let nn = index.k_nearest(predicted, NUM_NEIGHBORS);
        if nn.len() != NUM_NEIGHBORS {
            stats.num_insufficient += 1;
            continue;
        }

        if max_distance.is_some_and(|d| nn[0].distance > d) {
            stats.num_gated += 1;
            continue;
        }

        let (Some(a), Some(b)) = (target.point(nn[0].index), target.point(nn[1].index)) else {
            stats.num_insufficient += 1;
            continue;
        };
        if a.distance(b) < MIN_LINE_LENGTH {
            stats.num_degenerate += 1;
            continue;
        }

        correspondences.push(Correspondence {
            source: i,
            first: nn[0].index,
            second: nn[1].index,
        });
    }

    (correspondences, stats)
}
