//! Mesh data structures and functionality

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};

/// A triangle mesh with vertices and faces
///
/// Display hosts hand the rendered geometry over as a mesh; only its vertices
/// take part in point correspondence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
    pub colors: Option<Vec<[u8; 3]>>,
}

impl TriangleMesh {
    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
            colors: None,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Check that every face references an existing vertex and that per-vertex
    /// attributes have one entry per vertex
    pub fn validate(&self) -> Result<()> {
        let count = self.vertex_count();
        if let Some((face, vertex)) = self
            .faces
            .iter()
            .enumerate()
            .find_map(|(i, face)| face.iter().find(|&&v| v >= count).map(|&v| (i, v)))
        {
            return Err(Error::InvalidData(format!(
                "face {} references vertex {} but the mesh has {} vertices",
                face, vertex, count
            )));
        }

        let attributes = [
            ("normals", self.normals.as_ref().map(Vec::len)),
            ("colors", self.colors.as_ref().map(Vec::len)),
        ];
        for (name, len) in attributes {
            match len {
                Some(len) if len != count => {
                    return Err(Error::InvalidData(format!(
                        "mesh has {} {} for {} vertices",
                        len, name, count
                    )))
                }
                _ => {}
            }
        }
        Ok(())
    }
}
