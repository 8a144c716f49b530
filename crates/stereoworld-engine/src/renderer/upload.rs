//! Upload step of buffer assembly: one texture set, vertex buffer, index
//! buffer and vertex array per material.

use std::collections::HashMap;

use stereoworld_scene::{AssembledScene, TextureId, TextureRegistry};

use crate::error::RenderError;
use crate::gpu::{GpuBackend, TextureHandle, VertexArrayHandle};
use crate::texture::ImageSource;

/// Textures a material draws with.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MaterialTextures {
    pub material: TextureId,
    pub diffuse: TextureHandle,
    pub normal_map: Option<TextureHandle>,
}

/// GPU-resident scene, zipped 1:1 by material position.
#[derive(Debug, Clone, Default)]
pub struct GpuScene {
    materials: Vec<MaterialTextures>,
    vertex_arrays: Vec<VertexArrayHandle>,
    index_counts: Vec<u32>,
}

impl GpuScene {
    /// Fails when materials, vertex arrays and index buffers disagree in count.
    pub fn check(&self) -> Result<(), RenderError> {
        let (materials, vertex_arrays, index_buffers) =
            (self.materials.len(), self.vertex_arrays.len(), self.index_counts.len());
        if materials != vertex_arrays || materials != index_buffers {
            return Err(RenderError::MaterialMismatch { materials, vertex_arrays, index_buffers });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// `(textures, vertex array, index count)` per material. Call
    /// [`GpuScene::check`] first; extra entries of a longer list are skipped.
    pub fn iter(&self) -> impl Iterator<Item = (&MaterialTextures, VertexArrayHandle, u32)> {
        self.materials
            .iter()
            .zip(self.vertex_arrays.iter().copied())
            .zip(self.index_counts.iter().copied())
            .map(|((m, vao), count)| (m, vao, count))
    }

    pub fn vertex_arrays(&self) -> impl Iterator<Item = (VertexArrayHandle, u32)> + '_ {
        self.vertex_arrays.iter().copied().zip(self.index_counts.iter().copied())
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        materials: Vec<MaterialTextures>,
        vertex_arrays: Vec<VertexArrayHandle>,
        index_counts: Vec<u32>,
    ) -> Self {
        Self { materials, vertex_arrays, index_counts }
    }
}

/// Decodes and uploads every texture, then the buffers of every material.
///
/// Textures shared between materials are uploaded once. Any failure aborts
/// the load.
pub fn upload_scene(
    backend: &mut dyn GpuBackend,
    scene: &AssembledScene,
    registry: &TextureRegistry,
    images: &mut dyn ImageSource,
) -> Result<GpuScene, RenderError> {
    let mut uploaded: HashMap<TextureId, TextureHandle> = HashMap::new();
    let mut texture = |backend: &mut dyn GpuBackend, id: TextureId| -> Result<TextureHandle, RenderError> {
        if let Some(handle) = uploaded.get(&id) {
            return Ok(*handle);
        }
        let entry = registry
            .get(id)
            .ok_or_else(|| RenderError::resource(format!("{id} is not registered")))?;
        let image = images.load(entry)?;
        let handle = backend.create_texture(&image, entry.role)?;
        uploaded.insert(id, handle);
        Ok(handle)
    };

    let mut gpu = GpuScene::default();
    for mesh in scene.meshes() {
        let diffuse = texture(backend, mesh.material)?;
        let normal_map = match mesh.normal_map {
            Some(id) => Some(texture(backend, id)?),
            None => None,
        };

        let vbo = backend.create_vertex_buffer(&mesh.raw_vertices())?;
        let ibo = backend.create_index_buffer(&mesh.indices)?;
        let vao = backend.create_vertex_array(vbo, ibo)?;

        log::debug!(
            "uploaded {}: {} vertices, {} indices, normal map: {}",
            mesh.material,
            mesh.vertices.len(),
            mesh.indices.len(),
            mesh.normal_map.is_some()
        );

        gpu.materials.push(MaterialTextures { material: mesh.material, diffuse, normal_map });
        gpu.vertex_arrays.push(vao);
        gpu.index_counts.push(mesh.index_count());
    }

    gpu.check()?;
    Ok(gpu)
}
