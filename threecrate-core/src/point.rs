//! Point types and related functionality

use nalgebra::{Point3, Vector3};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// Downcast a double precision point to single precision
#[inline]
pub fn to_point3f(point: &Point3d) -> Point3f {
    Point3f::new(point.x as f32, point.y as f32, point.z as f32)
}

/// Check whether every coordinate of a point is finite
#[inline]
pub fn is_finite_point(point: &Point3f) -> bool {
    point.x.is_finite() && point.y.is_finite() && point.z.is_finite()
}
