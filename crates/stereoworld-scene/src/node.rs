//! Scene graph.
//!
//! A scene is a tree of [`Node`]s. Leaves are [`Primitive`]s; inner nodes are
//! [`Composite`]s holding an ordered list of children, each with a transform
//! and a texture transform. Children are shared through `Arc`, so one
//! sub-tree (e.g. a table) can appear under several composites. Nodes are
//! immutable once built.
//!
//! Aggregation is keyed by material and follows child order:
//! - vertex batches are concatenated in depth-first order
//! - triangle sets are offset by the running per-material vertex count of
//!   the preceding siblings, excluding the current child
//! - vertex counts are summed
//! - normal-map bindings are last-write-wins

use std::sync::Arc;

use glam::Mat4;

use crate::material::MaterialMap;
use crate::primitive::Primitive;
use crate::texture::TextureId;
use crate::vertex::Vertex;

/// Vertex indices forming a triangle list for one material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriangleSet {
    /// Name of the primitive that authored the set.
    pub source: String,
    pub indices: Vec<u32>,
}

pub type VertexBatches = MaterialMap<Vec<Vec<Vertex>>>;
pub type TriangleSets = MaterialMap<Vec<TriangleSet>>;
pub type VertexCounts = MaterialMap<u32>;
pub type NormalMapBindings = MaterialMap<Option<TextureId>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Primitive(Primitive),
    Composite(Composite),
}

/// One placed child of a [`Composite`].
#[derive(Debug, Clone, PartialEq)]
pub struct Child {
    pub transform: Mat4,
    pub tex_transform: Mat4,
    pub node: Arc<Node>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Composite {
    name: String,
    children: Vec<Child>,
}

impl Composite {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), children: Vec::new() }
    }

    /// Appends a child; children are aggregated in insertion order.
    pub fn with_child(mut self, transform: Mat4, tex_transform: Mat4, node: Arc<Node>) -> Self {
        self.push(transform, tex_transform, node);
        self
    }

    pub fn push(&mut self, transform: Mat4, tex_transform: Mat4, node: Arc<Node>) {
        self.children.push(Child { transform, tex_transform, node });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    pub fn into_node(self) -> Arc<Node> {
        Arc::new(Node::Composite(self))
    }
}

impl From<Primitive> for Node {
    fn from(p: Primitive) -> Self {
        Node::Primitive(p)
    }
}

impl Primitive {
    pub fn into_node(self) -> Arc<Node> {
        Arc::new(Node::Primitive(self))
    }
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Primitive(p) => p.name(),
            Node::Composite(c) => c.name(),
        }
    }

    /// Transformed vertex batches per material.
    ///
    /// Each child sees `xform · child.transform` and
    /// `tex_xform · child.tex_transform`.
    pub fn vertex_batches(&self, xform: &Mat4, tex_xform: &Mat4) -> VertexBatches {
        let mut out = VertexBatches::new();
        self.collect_vertex_batches(xform, tex_xform, &mut out);
        out
    }

    fn collect_vertex_batches(&self, xform: &Mat4, tex_xform: &Mat4, out: &mut VertexBatches) {
        match self {
            Node::Primitive(p) => out.entry(p.material()).push(p.vertex_batch(xform, tex_xform)),
            Node::Composite(c) => {
                for child in &c.children {
                    child.node.collect_vertex_batches(
                        &(*xform * child.transform),
                        &(*tex_xform * child.tex_transform),
                        out,
                    );
                }
            }
        }
    }

    /// Triangle sets per material with indices relative to this node's
    /// per-material vertex array.
    pub fn triangle_sets(&self) -> TriangleSets {
        match self {
            Node::Primitive(p) => {
                let mut out = TriangleSets::new();
                out.entry(p.material()).push(TriangleSet {
                    source: p.name().to_string(),
                    indices: p.triangles().to_vec(),
                });
                out
            }
            Node::Composite(c) => {
                let mut out = TriangleSets::new();
                let mut base = VertexCounts::new();

                for child in &c.children {
                    let counts = child.node.vertex_counts();
                    for (material, sets) in child.node.triangle_sets() {
                        let offset = base.get(material).copied().unwrap_or(0);
                        let merged = out.entry(material);
                        merged.extend(sets.into_iter().map(|mut set| {
                            set.indices.iter_mut().for_each(|i| *i += offset);
                            set
                        }));
                    }
                    // Advance only after this child's sets were offset.
                    for (material, count) in counts.iter() {
                        *base.entry(material) += count;
                    }
                }
                out
            }
        }
    }

    /// Vertex count per material.
    pub fn vertex_counts(&self) -> VertexCounts {
        match self {
            Node::Primitive(p) => std::iter::once((p.material(), p.vertex_count())).collect(),
            Node::Composite(c) => {
                let mut out = VertexCounts::new();
                for child in &c.children {
                    for (material, count) in child.node.vertex_counts() {
                        *out.entry(material) += count;
                    }
                }
                out
            }
        }
    }

    /// Normal map per material. A later child overwrites an earlier one.
    pub fn normal_map_bindings(&self) -> NormalMapBindings {
        match self {
            Node::Primitive(p) => std::iter::once((p.material(), p.normal_map())).collect(),
            Node::Composite(c) => {
                let mut out = NormalMapBindings::new();
                for child in &c.children {
                    for (material, binding) in child.node.normal_map_bindings() {
                        if let Some(previous) = out.insert(material, binding) {
                            if previous != binding {
                                log::warn!(
                                    "{}: material {material} rebound from normal map {:?} to {:?}",
                                    c.name,
                                    previous,
                                    binding
                                );
                            }
                        }
                    }
                }
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::texture::TextureRegistry;

    fn flat_indices(sets: &[TriangleSet]) -> Vec<u32> {
        sets.iter().flat_map(|s| s.indices.iter().copied()).collect()
    }

    // ── index offsets ─────────────────────────────────────────────────────

    #[test]
    fn offsets_follow_same_material_siblings_only() {
        let mut reg = TextureRegistry::new("");
        let (a, b) = (reg.color("a.png"), reg.color("b.png"));

        let root = Composite::new("root")
            .with_child(Mat4::IDENTITY, Mat4::IDENTITY, Primitive::plane("p0", a, None).unwrap().into_node())
            .with_child(Mat4::IDENTITY, Mat4::IDENTITY, Primitive::cube("c", b, None).unwrap().into_node())
            .with_child(Mat4::IDENTITY, Mat4::IDENTITY, Primitive::plane("p1", a, None).unwrap().into_node())
            .into_node();

        let sets = root.triangle_sets();
        let a_sets = sets.get(a).unwrap();
        assert_eq!(a_sets[0].indices, vec![0, 1, 2, 1, 2, 3]);
        // The cube in between uses material b and must not shift material a.
        assert_eq!(a_sets[1].indices, vec![4, 5, 6, 5, 6, 7]);
        assert_eq!(sets.get(b).unwrap()[0].indices[..3], [0, 1, 2]);
    }

    #[test]
    fn nested_composites_offset_cumulatively() {
        let mut reg = TextureRegistry::new("");
        let a = reg.color("a.png");
        let plane = Primitive::plane("p", a, None).unwrap().into_node();

        let inner = Composite::new("inner")
            .with_child(Mat4::IDENTITY, Mat4::IDENTITY, plane.clone())
            .with_child(Mat4::IDENTITY, Mat4::IDENTITY, plane.clone())
            .into_node();
        let root = Composite::new("root")
            .with_child(Mat4::IDENTITY, Mat4::IDENTITY, plane.clone())
            .with_child(Mat4::IDENTITY, Mat4::IDENTITY, inner)
            .into_node();

        let counts = root.vertex_counts();
        assert_eq!(counts.get(a), Some(&12));

        let indices = flat_indices(root.triangle_sets().get(a).unwrap());
        assert_eq!(indices.len(), 18);
        assert_eq!(*indices.iter().max().unwrap(), 11);
        assert_eq!(indices[12..], [8, 9, 10, 9, 10, 11]);
    }

    #[test]
    fn batches_and_sets_align_per_material() {
        let mut reg = TextureRegistry::new("");
        let (a, b) = (reg.color("a.png"), reg.color("b.png"));
        let root = Composite::new("root")
            .with_child(Mat4::IDENTITY, Mat4::IDENTITY, Primitive::plane("p", a, None).unwrap().into_node())
            .with_child(Mat4::IDENTITY, Mat4::IDENTITY, Primitive::cube("c", b, None).unwrap().into_node())
            .with_child(Mat4::IDENTITY, Mat4::IDENTITY, Primitive::cube("c2", a, None).unwrap().into_node())
            .into_node();

        let batches = root.vertex_batches(&Mat4::IDENTITY, &Mat4::IDENTITY);
        let sets = root.triangle_sets();
        assert_eq!(batches.keys().collect::<Vec<_>>(), sets.keys().collect::<Vec<_>>());
        for (material, list) in batches.iter() {
            assert_eq!(list.len(), sets.get(material).unwrap().len());
        }
    }

    // ── transforms ────────────────────────────────────────────────────────

    #[test]
    fn child_transforms_compose_parent_first() {
        let a = TextureRegistry::new("").color("a.png");
        let leaf = Primitive::plane("p", a, None).unwrap().into_node();
        let inner = Composite::new("inner")
            .with_child(Mat4::from_scale(Vec3::splat(2.0)), Mat4::IDENTITY, leaf)
            .into_node();
        let root = Composite::new("root")
            .with_child(Mat4::from_translation(Vec3::X * 10.0), Mat4::IDENTITY, inner)
            .into_node();

        let batches = root.vertex_batches(&Mat4::IDENTITY, &Mat4::IDENTITY);
        let first = batches.get(a).unwrap()[0][0].position;
        // (0.5, 0.5) scaled by 2 then moved by +10 on x.
        assert_eq!(first.truncate(), Vec3::new(11.0, 1.0, 0.0));
    }

    // ── normal maps ───────────────────────────────────────────────────────

    #[test]
    fn conflicting_normal_maps_resolve_last_write_wins() {
        let mut reg = TextureRegistry::new("");
        let a = reg.color("a.png");
        let (n1, n2) = (reg.normal("a_N.png"), reg.normal("a_N2.png"));
        let root = Composite::new("root")
            .with_child(Mat4::IDENTITY, Mat4::IDENTITY, Primitive::plane("p1", a, Some(n1)).unwrap().into_node())
            .with_child(Mat4::IDENTITY, Mat4::IDENTITY, Primitive::plane("p2", a, Some(n2)).unwrap().into_node())
            .into_node();

        assert_eq!(root.normal_map_bindings().get(a), Some(&Some(n2)));
    }

    #[test]
    fn later_child_without_normal_map_clears_binding() {
        let mut reg = TextureRegistry::new("");
        let a = reg.color("a.png");
        let n = reg.normal("a_N.png");
        let root = Composite::new("root")
            .with_child(Mat4::IDENTITY, Mat4::IDENTITY, Primitive::plane("p1", a, Some(n)).unwrap().into_node())
            .with_child(Mat4::IDENTITY, Mat4::IDENTITY, Primitive::plane("p2", a, None).unwrap().into_node())
            .into_node();

        assert_eq!(root.normal_map_bindings().get(a), Some(&None));
    }
}
