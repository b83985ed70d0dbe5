use std::num::NonZeroUsize;

use glam::DVec2;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use slam2d_scan::PointSet;

/// A neighbor returned by a [`SpatialIndex`] query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index of the point in the indexed set.
    pub index: usize,
    /// Euclidean distance to the query.
    pub distance: f64,
}

/// Nearest neighbor index over the points of one scan.
///
/// The index is immutable: it is built once per scan and rebuilt for the next one.
pub struct SpatialIndex {
    // None when built from an empty set
    tree: Option<ImmutableKdTree<f64, u32, 2, 32>>,
    len: usize,
}

impl SpatialIndex {
    /// Build the index over `points`.
    pub fn new(points: &PointSet) -> Self {
        let tree = if points.is_empty() {
            None
        } else {
            Some(ImmutableKdTree::new_from_slice(points.points()))
        };
        Self {
            tree,
            len: points.len(),
        }
    }

    /// Number of indexed points.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the index holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Find up to `k` nearest points to `query`, ordered by ascending distance.
    ///
    /// Fewer than `k` neighbors are returned when the index holds fewer than
    /// `k` points.
    pub fn k_nearest(&self, query: DVec2, k: usize) -> Vec<Neighbor> {
        let (Some(tree), Some(k)) = (&self.tree, NonZeroUsize::new(k)) else {
            return Vec::new();
        };

        tree.nearest_n::<kiddo::SquaredEuclidean>(&query.to_array(), k)
            .into_iter()
            .map(|nn| Neighbor {
                index: nn.item as usize,
                distance: nn.distance.sqrt(),
            })
            .collect()
    }
}
