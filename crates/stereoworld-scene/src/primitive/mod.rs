//! Leaf geometry.
//!
//! A [`Primitive`] owns authored vertices in its own local frame, a fixed
//! triangle list indexing them from zero, one material and an optional
//! normal map. Constructors for the canonical shapes live in the submodules:
//! - [`cylinder`]: parametric cylinder/disc over angle samples
//! - [`plane`]: unit square in the z=0 plane
//! - [`cube`]: 24-vertex cube with per-face normals

pub mod cube;
pub mod cylinder;
pub mod plane;

use glam::Mat4;

use crate::error::SceneError;
use crate::texture::TextureId;
use crate::vertex::{normal_matrix, Vertex};

pub use cylinder::{unit_circle, CylinderSpec};

#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    name: String,
    material: TextureId,
    normal_map: Option<TextureId>,
    vertices: Vec<Vertex>,
    triangles: Vec<u32>,
}

impl Primitive {
    /// Validates and wraps authored geometry.
    ///
    /// Fails with [`SceneError::InvalidGeometryParameters`] when there are no
    /// vertices, the index count is not a multiple of three, or an index is
    /// out of range.
    pub fn new(
        name: impl Into<String>,
        material: TextureId,
        normal_map: Option<TextureId>,
        vertices: Vec<Vertex>,
        triangles: Vec<u32>,
    ) -> Result<Self, SceneError> {
        if vertices.is_empty() {
            return Err(SceneError::geometry("primitive", "no vertices"));
        }
        if triangles.len() % 3 != 0 {
            return Err(SceneError::geometry(
                "primitive",
                format!("{} indices is not a whole triangle list", triangles.len()),
            ));
        }
        if let Some(bad) = triangles.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(SceneError::geometry(
                "primitive",
                format!("index {bad} out of range for {} vertices", vertices.len()),
            ));
        }

        Ok(Self {
            name: name.into(),
            material,
            normal_map,
            vertices,
            triangles,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn material(&self) -> TextureId {
        self.material
    }

    #[inline]
    pub fn normal_map(&self) -> Option<TextureId> {
        self.normal_map
    }

    /// Authored vertex count; known without generating a batch.
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Local triangle list, always based at zero.
    pub fn triangles(&self) -> &[u32] {
        &self.triangles
    }

    /// Copies the authored vertices with `xform` and `tex_xform` applied.
    pub fn vertex_batch(&self, xform: &Mat4, tex_xform: &Mat4) -> Vec<Vertex> {
        let normal_xform = normal_matrix(xform);
        self.vertices
            .iter()
            .map(|v| v.transformed(xform, &normal_xform, tex_xform))
            .collect()
    }
}
