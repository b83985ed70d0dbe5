use glam::DVec2;

use crate::pointset::PointSet;

/// Per-point surface normals of an ordered scan.
///
/// Index 0 never has a normal since the estimate needs the previous point.
/// Indices whose point coincides with its predecessor are degenerate and
/// carry no normal either.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normals {
    normals: Vec<Option<DVec2>>,
    degenerate: Vec<usize>,
}

impl Normals {
    /// Number of entries, equal to the number of points of the source scan.
    #[inline]
    pub fn len(&self) -> usize {
        self.normals.len()
    }

    /// Check if there are no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.normals.is_empty()
    }

    /// Unit normal at `index`, `None` for the first point, degenerate points or out of range.
    #[inline]
    pub fn get(&self, index: usize) -> Option<DVec2> {
        self.normals.get(index).copied().flatten()
    }

    /// Indices where the normal could not be estimated because two consecutive points coincide.
    pub fn degenerate(&self) -> &[usize] {
        &self.degenerate
    }

    /// Get as reference the per-point normals.
    pub fn as_slice(&self) -> &[Option<DVec2>] {
        &self.normals
    }

    /// Number of points with a valid normal.
    pub fn num_valid(&self) -> usize {
        self.normals.iter().filter(|n| n.is_some()).count()
    }
}

/// Estimate the normal of every point from its predecessor in scan order.
///
/// For each point `i >= 1` the tangent `t = p[i-1] - p[i]` is rotated by 90
/// degrees and normalized: `n = (-t.y, t.x) / |t|`.
///
/// # Arguments
///
/// * `points` - The ordered scan.
///
/// # Returns
///
/// The normals, one entry per point.
pub fn estimate_normals(points: &PointSet) -> Normals {
    let mut normals = Vec::with_capacity(points.len());
    let mut degenerate = Vec::new();

    if !points.is_empty() {
        normals.push(None);
    }

    for (i, w) in points.points().windows(2).enumerate() {
        let tangent = DVec2::from_array(w[0]) - DVec2::from_array(w[1]);
        let normal = tangent.perp().try_normalize();
        if normal.is_none() {
            degenerate.push(i + 1);
        }
        normals.push(normal);
    }

    if !degenerate.is_empty() {
        log::debug!(
            "{} degenerate normals out of {} points",
            degenerate.len(),
            points.len()
        );
    }

    Normals {
        normals,
        degenerate,
    }
}
