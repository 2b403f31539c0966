//! Geometry currently shown on screen

use threecrate_algorithms::merge_coincident_points;
use threecrate_core::{to_point3f, Point3d, Point3f, PointCloud, TriangleMesh};

/// Raw point set of a displayed surface
///
/// Renderers typically repeat shared vertices once per cell, so the points are
/// kept as handed over and deduplicated by [`DisplaySurface::clean`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplaySurface {
    points: Vec<Point3d>,
}

impl DisplaySurface {
    pub fn new(points: Vec<Point3d>) -> Self {
        Self { points }
    }

    /// Vertices of a mesh, in vertex order
    pub fn from_mesh(mesh: &TriangleMesh) -> Self {
        Self::from(&mesh.vertices[..])
    }

    pub fn points(&self) -> &[Point3d] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Merge exactly coincident points and downcast to single precision
    ///
    /// Returns the cleaned cloud and the number of pruned points. The cloud is
    /// marked dense only when every point is finite.
    pub fn clean(&self) -> (PointCloud<Point3f>, usize) {
        let cleaned = merge_coincident_points(&self.points);
        let points: Vec<Point3f> = cleaned.points.iter().map(to_point3f).collect();
        let cloud = PointCloud::from_points(points);
        let dense = cloud.all_finite();
        (cloud.with_dense(dense), cleaned.pruned)
    }
}

impl From<Vec<Point3d>> for DisplaySurface {
    fn from(points: Vec<Point3d>) -> Self {
        Self::new(points)
    }
}

impl From<&[Point3f]> for DisplaySurface {
    fn from(points: &[Point3f]) -> Self {
        Self::new(points.iter().map(|p| p.cast::<f64>()).collect())
    }
}

impl From<&PointCloud<Point3f>> for DisplaySurface {
    fn from(cloud: &PointCloud<Point3f>) -> Self {
        Self::from(&cloud.points[..])
    }
}

impl From<&PointCloud<Point3d>> for DisplaySurface {
    fn from(cloud: &PointCloud<Point3d>) -> Self {
        Self::new(cloud.points.clone())
    }
}

impl From<&TriangleMesh> for DisplaySurface {
    fn from(mesh: &TriangleMesh) -> Self {
        Self::from_mesh(mesh)
    }
}
