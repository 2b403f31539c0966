//! Core traits for 3DCrate

use crate::point::*;

/// Trait for nearest neighbor search functionality
///
/// Distances are squared Euclidean distances in single precision. Returned
/// indices refer to the point slice the search structure was built from.
pub trait NearestNeighborSearch {
    /// Find the single nearest neighbor to a query point
    ///
    /// Returns `None` when the structure holds no searchable point or the
    /// query itself is not finite.
    fn find_nearest(&self, query: &Point3f) -> Option<(usize, f32)>;

    /// Find the k nearest neighbors to a query point, closest first
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)>;
}

/// Squared Euclidean distance between two points
#[inline]
pub fn squared_distance(a: &Point3f, b: &Point3f) -> f32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let dz = a.z - b.z;
    dx * dx + dy * dy + dz * dz
}
