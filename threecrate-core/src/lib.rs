//! Core data structures and traits for threecrate
//! 
//! This crate provides the fundamental types shared by the correspondence and
//! export crates: points, point clouds, triangle meshes, the common error type
//! and the nearest neighbor search trait.

pub mod point;
pub mod point_cloud;
pub mod mesh;
pub mod traits;
pub mod error;

pub use point::*;
pub use point_cloud::*;
pub use mesh::*;
pub use traits::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, UnitQuaternion};

// Type aliases for easier imports
pub type Point = Point3f;
pub type Mesh = TriangleMesh;
