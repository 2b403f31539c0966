//! Nearest neighbor search implementations

use crate::cleaning::exact_key;
use rstar::RTree;
use std::collections::HashSet;
use threecrate_core::{is_finite_point, squared_distance, Error, NearestNeighborSearch, Point3f, Result};

/// A reference point together with its index in the input slice
#[derive(Debug, Clone, Copy, PartialEq)]
struct IndexedPoint {
    point: Point3f,
    index: usize,
}

impl IndexedPoint {
    fn query(point: &Point3f) -> Self {
        Self { point: *point, index: usize::MAX }
    }
}

impl rstar::Point for IndexedPoint {
    type Scalar = f32;
    const DIMENSIONS: usize = 3;

    fn generate(mut generator: impl FnMut(usize) -> Self::Scalar) -> Self {
        Self {
            point: Point3f::new(generator(0), generator(1), generator(2)),
            index: usize::MAX,
        }
    }

    fn nth(&self, index: usize) -> Self::Scalar {
        match index {
            0 => self.point.x,
            1 => self.point.y,
            2 => self.point.z,
            _ => unreachable!("point has three dimensions"),
        }
    }

    fn nth_mut(&mut self, index: usize) -> &mut Self::Scalar {
        match index {
            0 => &mut self.point.x,
            1 => &mut self.point.y,
            2 => &mut self.point.z,
            _ => unreachable!("point has three dimensions"),
        }
    }
}

/// R*-tree over a slice of points for nearest neighbor search
///
/// Only finite points are indexed, so clouds that are not dense can be
/// searched directly. When several input points share the exact same position
/// only the lowest index is indexed. Equidistant candidates resolve to the
/// lowest index, which makes the results identical to [`BruteForceSearch`].
/// Grids, planes and other clouds with many equal coordinates are fine.
/// Returned indices refer to the slice passed to [`RTreeIndex::new`].
pub struct RTreeIndex {
    tree: RTree<IndexedPoint>,
}

impl RTreeIndex {
    /// Build an R*-tree over `points`
    ///
    /// Fails with [`Error::InvalidArgument`] when `points` holds no finite
    /// point, since a search index over zero points is undefined.
    pub fn new(points: &[Point3f]) -> Result<Self> {
        let mut seen = HashSet::with_capacity(points.len());
        let mut indexed = Vec::with_capacity(points.len());

        for (index, point) in points.iter().enumerate() {
            if !is_finite_point(point) || !seen.insert(exact_key(point)) {
                continue;
            }
            indexed.push(IndexedPoint { point: *point, index });
        }

        if indexed.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "cannot build a search index: none of the {} input points is finite",
                points.len()
            )));
        }

        log::trace!(
            "built R*-tree over {} of {} points",
            indexed.len(),
            points.len()
        );

        Ok(Self {
            tree: RTree::bulk_load(indexed),
        })
    }

    /// Number of distinct finite points held by the tree
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the tree holds no points
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl NearestNeighborSearch for RTreeIndex {
    fn find_nearest(&self, query: &Point3f) -> Option<(usize, f32)> {
        if !is_finite_point(query) {
            return None;
        }

        // Candidates arrive in increasing distance; distances are recomputed
        // the way BruteForceSearch does
        let target = IndexedPoint::query(query);
        let mut best: Option<(usize, f32)> = None;
        for candidate in self.tree.nearest_neighbor_iter(&target) {
            let (index, dist) = (candidate.index, squared_distance(&candidate.point, query));
            match best {
                Some((_, best_dist)) if dist > best_dist => break,
                Some((best_index, best_dist)) if dist == best_dist && best_index < index => {}
                _ => best = Some((index, dist)),
            }
        }
        best
    }

    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)> {
        if k == 0 || !is_finite_point(query) {
            return Vec::new();
        }

        // Keep pulling past k while candidates tie with the k-th distance
        let target = IndexedPoint::query(query);
        let mut found: Vec<(usize, f32)> = Vec::with_capacity(k.min(self.len()));
        for candidate in self.tree.nearest_neighbor_iter(&target) {
            let (index, dist) = (candidate.index, squared_distance(&candidate.point, query));
            if found.len() >= k && found.last().map_or(true, |last| dist > last.1) {
                break;
            }
            found.push((index, dist));
        }

        found.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        found.truncate(k);
        found
    }
}

/// Simple brute force nearest neighbor search for small datasets
///
/// Ties are broken towards the lowest index.
pub struct BruteForceSearch {
    points: Vec<Point3f>,
}

impl BruteForceSearch {
    pub fn new(points: &[Point3f]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }

    fn distances(&self, query: &Point3f) -> impl Iterator<Item = (usize, f32)> + '_ {
        let query = *query;
        self.points
            .iter()
            .enumerate()
            .filter(|(_, point)| is_finite_point(point))
            .map(move |(idx, point)| (idx, squared_distance(point, &query)))
    }
}

impl NearestNeighborSearch for BruteForceSearch {
    fn find_nearest(&self, query: &Point3f) -> Option<(usize, f32)> {
        if !is_finite_point(query) {
            return None;
        }

        self.distances(query).fold(None, |best, candidate| match best {
            Some((_, best_dist)) if best_dist <= candidate.1 => best,
            _ => Some(candidate),
        })
    }

    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)> {
        if k == 0 || !is_finite_point(query) {
            return Vec::new();
        }

        let mut distances: Vec<(usize, f32)> = self.distances(query).collect();

        // Sort by distance, then index, and take k nearest
        distances.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        distances.truncate(k);
        distances
    }
}
