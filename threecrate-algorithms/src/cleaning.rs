//! Cleaning passes for displayed geometry
//!
//! Display pipelines often hand over geometry with the same vertex repeated
//! once per incident cell. The cleaning pass merges points whose coordinates
//! are exactly equal (zero tolerance) and performs no other simplification.

use nalgebra::{Point3, Scalar};
use std::collections::HashMap;
use threecrate_core::{PointCloud, Result, TriangleMesh};

/// Coordinate types that can be compared for exact coincidence
///
/// `+0.0` and `-0.0` produce the same key. NaN coordinates compare by bit
/// pattern, so identical NaN points still merge.
pub trait ExactCoordinate: Scalar + Copy {
    fn exact_bits(self) -> u64;
}

impl ExactCoordinate for f32 {
    #[inline]
    fn exact_bits(self) -> u64 {
        let value = if self == 0.0 { 0.0f32 } else { self };
        value.to_bits() as u64
    }
}

impl ExactCoordinate for f64 {
    #[inline]
    fn exact_bits(self) -> u64 {
        let value = if self == 0.0 { 0.0f64 } else { self };
        value.to_bits()
    }
}

/// Hashable key identifying the exact position of a point
#[inline]
pub fn exact_key<T: ExactCoordinate>(point: &Point3<T>) -> [u64; 3] {
    [point.x.exact_bits(), point.y.exact_bits(), point.z.exact_bits()]
}

/// Result of a point merging pass
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedPoints<T: Scalar> {
    /// Unique points in order of first occurrence
    pub points: Vec<Point3<T>>,
    /// For each input point, the index of its representative in `points`
    pub point_map: Vec<usize>,
    /// Number of input points that were merged away
    pub pruned: usize,
}

/// Merge exactly coincident points
///
/// The first occurrence of every position is kept and the output preserves the
/// order in which positions first appear.
///
/// # Example
/// ```rust
/// use threecrate_core::Point3d;
/// use threecrate_algorithms::merge_coincident_points;
///
/// let cleaned = merge_coincident_points(&[
///     Point3d::new(0.0, 0.0, 0.0),
///     Point3d::new(1.0, 0.0, 0.0),
///     Point3d::new(0.0, 0.0, 0.0),
/// ]);
/// assert_eq!(cleaned.points.len(), 2);
/// assert_eq!(cleaned.pruned, 1);
/// assert_eq!(cleaned.point_map, vec![0, 1, 0]);
/// ```
pub fn merge_coincident_points<T: ExactCoordinate>(points: &[Point3<T>]) -> CleanedPoints<T> {
    let mut first_seen: HashMap<[u64; 3], usize> = HashMap::with_capacity(points.len());
    let mut unique = Vec::with_capacity(points.len());
    let mut point_map = Vec::with_capacity(points.len());

    for point in points {
        let next = unique.len();
        let index = *first_seen.entry(exact_key(point)).or_insert(next);
        if index == next {
            unique.push(*point);
        }
        point_map.push(index);
    }

    CleanedPoints {
        pruned: points.len() - unique.len(),
        points: unique,
        point_map,
    }
}

/// Merge coincident points of a cloud, returning the cleaned cloud and the
/// number of pruned points. The density flag is carried over.
pub fn clean_point_cloud<T: ExactCoordinate>(cloud: &PointCloud<Point3<T>>) -> (PointCloud<Point3<T>>, usize) {
    let cleaned = merge_coincident_points(&cloud.points);
    let out = PointCloud::from_points(cleaned.points).with_dense(cloud.is_dense);
    (out, cleaned.pruned)
}

/// Merge coincident mesh vertices and remap the faces onto the merged set
///
/// Faces are kept as they are, including any that become degenerate. Normals
/// and colors of the first occurrence of each vertex are retained.
///
/// # Errors
/// [`threecrate_core::Error::InvalidData`] if a face references a missing
/// vertex or an attribute list does not have one entry per vertex.
pub fn clean_mesh(mesh: &TriangleMesh) -> Result<(TriangleMesh, usize)> {
    mesh.validate()?;
    let cleaned = merge_coincident_points(&mesh.vertices);
    let unique = cleaned.points.len();

    let faces = mesh
        .faces
        .iter()
        .map(|face| face.map(|v| cleaned.point_map[v]))
        .collect();
    let normals = mesh
        .normals
        .as_ref()
        .map(|normals| first_occurrences(normals, &cleaned.point_map, unique));
    let colors = mesh
        .colors
        .as_ref()
        .map(|colors| first_occurrences(colors, &cleaned.point_map, unique));

    let out = TriangleMesh {
        vertices: cleaned.points,
        faces,
        normals,
        colors,
    };
    Ok((out, cleaned.pruned))
}

/// Per-vertex attributes of the first occurrence of every merged vertex
fn first_occurrences<A: Copy>(attributes: &[A], point_map: &[usize], unique: usize) -> Vec<A> {
    let mut kept = Vec::with_capacity(unique);
    for (input, &output) in point_map.iter().enumerate() {
        if output == kept.len() {
            kept.push(attributes[input]);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use threecrate_core::{Error, Point3d, Point3f, Vector3f};

    #[test]
    fn test_merge_keeps_first_occurrence_order() {
        let points = vec![
            Point3d::new(2.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(2.0, 0.0, 0.0),
            Point3d::new(3.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
        ];

        let cleaned = merge_coincident_points(&points);
        assert_eq!(
            cleaned.points,
            vec![
                Point3d::new(2.0, 0.0, 0.0),
                Point3d::new(1.0, 0.0, 0.0),
                Point3d::new(3.0, 0.0, 0.0),
            ]
        );
        assert_eq!(cleaned.point_map, vec![0, 1, 0, 2, 1]);
        assert_eq!(cleaned.pruned, 2);
    }

    #[test]
    fn test_zero_tolerance() {
        // Points that differ in the last bit are not merged.
        let a = Point3d::new(1.0, 1.0, 1.0);
        let b = Point3d::new(1.0 + f64::EPSILON, 1.0, 1.0);
        let cleaned = merge_coincident_points(&[a, b]);
        assert_eq!(cleaned.pruned, 0);
        assert_eq!(cleaned.points.len(), 2);
    }

    #[test]
    fn test_signed_zero_is_coincident() {
        let cleaned = merge_coincident_points(&[
            Point3f::new(0.0, 1.0, 2.0),
            Point3f::new(-0.0, 1.0, 2.0),
        ]);
        assert_eq!(cleaned.pruned, 1);
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let points: Vec<Point3d> = (0..50)
            .map(|i| Point3d::new((i % 7) as f64, (i % 5) as f64, 0.5))
            .collect();

        let first = merge_coincident_points(&points);
        assert!(first.pruned > 0);

        let second = merge_coincident_points(&first.points);
        assert_eq!(second.pruned, 0);
        assert_eq!(second.points, first.points);
        assert_eq!(second.point_map, (0..first.points.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_input() {
        let cleaned = merge_coincident_points::<f64>(&[]);
        assert!(cleaned.points.is_empty());
        assert!(cleaned.point_map.is_empty());
        assert_eq!(cleaned.pruned, 0);
    }

    #[test]
    fn test_clean_point_cloud_preserves_density() {
        let cloud = PointCloud::from_points(vec![
            Point3f::new(1.0, 2.0, 3.0),
            Point3f::new(1.0, 2.0, 3.0),
        ])
        .with_dense(false);

        let (cleaned, pruned) = clean_point_cloud(&cloud);
        assert_eq!(pruned, 1);
        assert_eq!(cleaned.len(), 1);
        assert!(!cleaned.is_dense);
    }

    #[test]
    fn test_clean_mesh_remaps_faces() {
        // Two triangles sharing an edge, with the shared vertices duplicated.
        let vertices = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(1.0, 1.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
        ];
        let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, vec![[0, 1, 2], [3, 4, 5]]);
        mesh.set_normals(vec![Vector3f::z(); 6]);

        let (cleaned, pruned) = clean_mesh(&mesh).unwrap();
        assert_eq!(pruned, 2);
        assert_eq!(cleaned.vertex_count(), 4);
        assert_eq!(cleaned.faces, vec![[0, 1, 2], [1, 3, 2]]);
        assert_eq!(cleaned.normals.as_ref().map(|n| n.len()), Some(4));
        assert!(cleaned.colors.is_none());
    }

    #[test]
    fn test_clean_mesh_rejects_malformed_meshes() {
        let vertices = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
        ];

        let dangling = TriangleMesh::from_vertices_and_faces(vertices.clone(), vec![[0, 1, 7]]);
        assert!(matches!(clean_mesh(&dangling), Err(Error::InvalidData(_))));

        let mut short_normals = TriangleMesh::from_vertices_and_faces(vertices, vec![[0, 1, 2]]);
        short_normals.normals = Some(vec![Vector3f::z()]);
        assert!(matches!(clean_mesh(&short_normals), Err(Error::InvalidData(_))));
    }
}
