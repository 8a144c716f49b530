use thiserror::Error;

use crate::texture::TextureId;

/// Errors raised while building or flattening a scene.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    /// A primitive was constructed from malformed parameters.
    #[error("invalid {shape} parameters: {reason}")]
    InvalidGeometryParameters { shape: &'static str, reason: String },

    /// A builder received arguments it cannot turn into a scene.
    #[error("invalid {builder} arguments: {reason}")]
    InvalidBuilderParameters { builder: &'static str, reason: String },

    /// Aggregation produced a different number of vertex batches and
    /// triangle sets for one material.
    #[error(
        "material {material}: {vertex_batches} vertex batches but {triangle_sets} triangle sets"
    )]
    GeometryIntegrity {
        material: TextureId,
        vertex_batches: usize,
        triangle_sets: usize,
    },

    /// A flattened index points past the material's vertex array.
    #[error("material {material}: index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        material: TextureId,
        index: u32,
        vertex_count: usize,
    },

    /// A flattened index list does not describe whole triangles.
    #[error("material {material}: {index_count} indices is not a whole triangle list")]
    PartialTriangle { material: TextureId, index_count: usize },
}

impl SceneError {
    pub(crate) fn geometry(shape: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidGeometryParameters { shape, reason: reason.into() }
    }

    pub(crate) fn builder(builder: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidBuilderParameters { builder, reason: reason.into() }
    }
}
