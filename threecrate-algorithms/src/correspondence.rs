//! Point correspondence between a displayed surface and a reference cloud
//!
//! A displayed surface is usually a cleaned, decimated or otherwise derived
//! copy of one or more original clouds. For every displayed point the nearest
//! original point is looked up, which recovers the subset of the original
//! cloud that is actually on screen.

use crate::nearest_neighbor::RTreeIndex;
use threecrate_core::{Error, NearestNeighborSearch, Point3f, PointCloud, Result};

/// Sorted, duplicate-free indices into a reference point cloud
///
/// The only way to build one is through [`CorrespondenceIndices::from_unsorted`],
/// which keeps the ordering and uniqueness invariants intact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrespondenceIndices(Vec<usize>);

impl CorrespondenceIndices {
    /// Sort ascending and collapse repeated indices
    pub fn from_unsorted(mut indices: Vec<usize>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self(indices)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, usize> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.0
    }
}

impl AsRef<[usize]> for CorrespondenceIndices {
    fn as_ref(&self) -> &[usize] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a CorrespondenceIndices {
    type Item = &'a usize;
    type IntoIter = std::slice::Iter<'a, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Find the reference points that correspond to a displayed surface
///
/// Builds an R*-tree over `reference`, looks up the single nearest reference
/// point (squared Euclidean distance, single precision) for every displayed
/// point and returns the sorted, unique set of matched indices. An empty
/// `displayed` cloud yields an empty set.
///
/// # Errors
/// [`Error::InvalidArgument`] if `reference` is empty or holds no finite point.
///
/// # Example
/// ```rust
/// use threecrate_core::{PointCloud, Point3f};
/// use threecrate_algorithms::find_correspondences;
///
/// let reference = PointCloud::from_points(vec![
///     Point3f::new(0.0, 0.0, 0.0),
///     Point3f::new(1.0, 0.0, 0.0),
///     Point3f::new(2.0, 0.0, 0.0),
/// ]);
/// let displayed = PointCloud::from_points(vec![
///     Point3f::new(2.1, 0.0, 0.0),
///     Point3f::new(0.1, 0.0, 0.0),
///     Point3f::new(1.9, 0.0, 0.0),
/// ]);
///
/// let indices = find_correspondences(&displayed, &reference).unwrap();
/// assert_eq!(indices.as_slice(), &[0, 2]);
/// ```
pub fn find_correspondences(
    displayed: &PointCloud<Point3f>,
    reference: &PointCloud<Point3f>,
) -> Result<CorrespondenceIndices> {
    if reference.is_empty() {
        return Err(Error::InvalidArgument(
            "reference cloud is empty; cannot build a search index".to_string(),
        ));
    }

    let index = RTreeIndex::new(&reference.points)?;
    Ok(find_correspondences_with(displayed, &index))
}

/// Same as [`find_correspondences`] but with a caller-provided search structure
///
/// Displayed points the search cannot answer (non-finite coordinates) are
/// skipped.
pub fn find_correspondences_with<S: NearestNeighborSearch>(
    displayed: &PointCloud<Point3f>,
    search: &S,
) -> CorrespondenceIndices {
    let mut indices = Vec::with_capacity(displayed.len());
    let mut skipped = 0usize;

    // For each displayed point, find its correspondent in the reference
    for point in displayed {
        match search.find_nearest(point) {
            Some((idx, _)) => indices.push(idx),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::debug!("skipped {} displayed points without a valid position", skipped);
    }

    CorrespondenceIndices::from_unsorted(indices)
}
