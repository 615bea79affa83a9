use std::num::NonZero;

use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::SquaredEuclidean;

/// Nearest neighbour index over a set of 3d points.
///
/// Items are the indices of the points in the slice the index was built from.
pub(crate) struct PointIndex {
    kdtree: ImmutableKdTree<f64, u32, 3, 32>,
}

impl PointIndex {
    pub(crate) fn new(points: &[[f64; 3]]) -> Self {
        Self {
            kdtree: ImmutableKdTree::new_from_slice(points),
        }
    }

    /// Indices of the `k` nearest points, closest first. Includes the query point itself.
    pub(crate) fn knn(&self, query: &[f64; 3], k: NonZero<usize>) -> Vec<usize> {
        self.kdtree
            .nearest_n::<SquaredEuclidean>(query, k)
            .into_iter()
            .map(|nn| nn.item as usize)
            .collect()
    }

    /// Indices of the points within `radius`, closest first.
    pub(crate) fn radius(&self, query: &[f64; 3], radius: f64) -> Vec<usize> {
        self.kdtree
            .within::<SquaredEuclidean>(query, radius * radius)
            .into_iter()
            .map(|nn| nn.item as usize)
            .collect()
    }

    /// Indices of at most `max_nn` points within `radius`, closest first.
    pub(crate) fn hybrid(&self, query: &[f64; 3], radius: f64, max_nn: NonZero<usize>) -> Vec<usize> {
        self.kdtree
            .nearest_n_within::<SquaredEuclidean>(query, radius * radius, max_nn, true)
            .into_iter()
            .map(|nn| nn.item as usize)
            .collect()
    }
}
