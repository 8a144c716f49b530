//! Buffer assembly (CPU side).
//!
//! Flattens a scene graph into one vertex array and one index array per
//! material, ready for upload:
//! 1. collect vertex batches, triangle sets and normal-map bindings
//! 2. require one triangle set per vertex batch for every material
//! 3. concatenate batches and sets in matching order (indices already carry
//!    their aggregation offsets)
//! 4. run the tangent pass
//!
//! Materials come out in first-appearance order of a depth-first walk.

use glam::Mat4;

use crate::error::SceneError;
use crate::node::{Node, NormalMapBindings, TriangleSets, VertexBatches};
use crate::tangent::compute_tangents;
use crate::texture::TextureId;
use crate::vertex::{RawVertex, Vertex};

/// Flattened geometry for one material.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialMesh {
    pub material: TextureId,
    pub normal_map: Option<TextureId>,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Triangles whose tangent basis came from the degenerate-UV fallback.
    pub degenerate_uv_triangles: usize,
}

impl MaterialMesh {
    #[inline]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn raw_vertices(&self) -> Vec<RawVertex> {
        self.vertices.iter().map(Vertex::to_raw).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssembledScene {
    meshes: Vec<MaterialMesh>,
}

impl AssembledScene {
    pub fn meshes(&self) -> &[MaterialMesh] {
        &self.meshes
    }

    pub fn mesh(&self, material: TextureId) -> Option<&MaterialMesh> {
        self.meshes.iter().find(|m| m.material == material)
    }

    pub fn total_vertices(&self) -> usize {
        self.meshes.iter().map(|m| m.vertices.len()).sum()
    }

    pub fn total_indices(&self) -> usize {
        self.meshes.iter().map(|m| m.indices.len()).sum()
    }
}

/// Flattens `root` placed by `xform`, with `tex_xform` as the root texture
/// transform.
pub fn assemble(root: &Node, xform: Mat4, tex_xform: Mat4) -> Result<AssembledScene, SceneError> {
    let scene = flatten(
        root.vertex_batches(&xform, &tex_xform),
        root.triangle_sets(),
        &root.normal_map_bindings(),
    )?;

    log::info!(
        "assembled '{}': {} materials, {} vertices, {} indices",
        root.name(),
        scene.meshes.len(),
        scene.total_vertices(),
        scene.total_indices()
    );
    Ok(scene)
}

/// Steps 2–4 over already-aggregated data.
pub fn flatten(
    batches: VertexBatches,
    sets: TriangleSets,
    normal_maps: &NormalMapBindings,
) -> Result<AssembledScene, SceneError> {
    // A material with triangle sets but no vertices never shows up in `batches`.
    if let Some((material, orphan)) = sets.iter().find(|(m, _)| !batches.contains(*m)) {
        return Err(SceneError::GeometryIntegrity {
            material,
            vertex_batches: 0,
            triangle_sets: orphan.len(),
        });
    }

    let mut meshes = Vec::with_capacity(batches.len());

    for (material, vertex_batches) in batches {
        let triangle_sets = sets.get(material).map(Vec::as_slice).unwrap_or(&[]);
        if vertex_batches.len() != triangle_sets.len() {
            return Err(SceneError::GeometryIntegrity {
                material,
                vertex_batches: vertex_batches.len(),
                triangle_sets: triangle_sets.len(),
            });
        }

        let vertices: Vec<Vertex> = vertex_batches.into_iter().flatten().collect();
        let indices: Vec<u32> = triangle_sets
            .iter()
            .flat_map(|s| s.indices.iter().copied())
            .collect();

        if indices.len() % 3 != 0 {
            return Err(SceneError::PartialTriangle { material, index_count: indices.len() });
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(SceneError::IndexOutOfRange {
                material,
                index,
                vertex_count: vertices.len(),
            });
        }

        let mut mesh = MaterialMesh {
            material,
            normal_map: normal_maps.get(material).copied().flatten(),
            vertices,
            indices,
            degenerate_uv_triangles: 0,
        };
        mesh.degenerate_uv_triangles = compute_tangents(&mut mesh.vertices, &mesh.indices);

        log::debug!(
            "material {material}: {} vertices, {} indices, {} degenerate-uv triangles",
            mesh.vertices.len(),
            mesh.indices.len(),
            mesh.degenerate_uv_triangles
        );
        meshes.push(mesh);
    }

    Ok(AssembledScene { meshes })
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::node::{Composite, TriangleSet};
    use crate::primitive::Primitive;
    use crate::texture::TextureRegistry;

    fn two_material_scene(reg: &mut TextureRegistry) -> std::sync::Arc<Node> {
        let (a, b) = (reg.color("a.png"), reg.color("b.png"));
        let n = reg.normal("a_N.png");
        Composite::new("root")
            .with_child(Mat4::IDENTITY, Mat4::IDENTITY, Primitive::plane("p", a, Some(n)).unwrap().into_node())
            .with_child(Mat4::IDENTITY, Mat4::IDENTITY, Primitive::cube("c", b, None).unwrap().into_node())
            .with_child(
                Mat4::from_translation(Vec3::Y),
                Mat4::IDENTITY,
                Primitive::plane("p2", a, Some(n)).unwrap().into_node(),
            )
            .into_node()
    }

    // ── flattening ────────────────────────────────────────────────────────

    #[test]
    fn one_mesh_per_material_in_first_seen_order() {
        let mut reg = TextureRegistry::new("");
        let root = two_material_scene(&mut reg);
        let scene = assemble(&root, Mat4::IDENTITY, Mat4::IDENTITY).unwrap();

        let mats: Vec<_> = scene.meshes().iter().map(|m| m.material).collect();
        assert_eq!(mats, vec![reg.color("a.png"), reg.color("b.png")]);
        assert_eq!(scene.meshes()[0].vertices.len(), 8);
        assert_eq!(scene.meshes()[0].index_count(), 12);
        assert_eq!(scene.meshes()[0].normal_map, Some(reg.normal("a_N.png")));
        assert_eq!(scene.meshes()[1].normal_map, None);
    }

    #[test]
    fn every_index_is_in_range() {
        let mut reg = TextureRegistry::new("");
        let root = two_material_scene(&mut reg);
        let scene = assemble(&root, Mat4::IDENTITY, Mat4::IDENTITY).unwrap();
        for mesh in scene.meshes() {
            assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        }
    }

    #[test]
    fn tangents_are_written_and_finite() {
        let mut reg = TextureRegistry::new("");
        let root = two_material_scene(&mut reg);
        let scene = assemble(&root, Mat4::IDENTITY, Mat4::IDENTITY).unwrap();
        for v in scene.meshes().iter().flat_map(|m| m.vertices.iter()) {
            assert!(v.tangent.is_finite() && v.tangent != Vec3::ZERO);
        }
    }

    // ── integrity ─────────────────────────────────────────────────────────

    #[test]
    fn batch_without_triangle_set_is_rejected() {
        let mut reg = TextureRegistry::new("");
        let root = two_material_scene(&mut reg);
        let a = reg.color("a.png");

        let mut batches = root.vertex_batches(&Mat4::IDENTITY, &Mat4::IDENTITY);
        let extra = batches.get(a).unwrap()[0].clone();
        batches.entry(a).push(extra);

        let err = flatten(batches, root.triangle_sets(), &root.normal_map_bindings()).unwrap_err();
        assert_eq!(
            err,
            SceneError::GeometryIntegrity { material: a, vertex_batches: 3, triangle_sets: 2 }
        );
    }

    #[test]
    fn triangle_set_without_vertices_is_rejected() {
        let mut reg = TextureRegistry::new("");
        let root = two_material_scene(&mut reg);
        let stray = reg.color("stray.png");

        let mut sets = root.triangle_sets();
        sets.entry(stray).push(TriangleSet { source: "ghost".into(), indices: vec![0, 1, 2] });

        let err = flatten(
            root.vertex_batches(&Mat4::IDENTITY, &Mat4::IDENTITY),
            sets,
            &root.normal_map_bindings(),
        )
        .unwrap_err();
        assert!(matches!(err, SceneError::GeometryIntegrity { vertex_batches: 0, .. }));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut reg = TextureRegistry::new("");
        let root = two_material_scene(&mut reg);
        let b = reg.color("b.png");

        let mut sets = root.triangle_sets();
        sets.entry(b)[0].indices[0] = 99;

        let err = flatten(
            root.vertex_batches(&Mat4::IDENTITY, &Mat4::IDENTITY),
            sets,
            &root.normal_map_bindings(),
        )
        .unwrap_err();
        assert!(matches!(err, SceneError::IndexOutOfRange { index: 99, .. }));
    }
}
