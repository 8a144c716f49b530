//! Procedural scene geometry for the **stereoworld** renderer.
//!
//! This crate is intentionally GPU-free so scene construction, per-material
//! aggregation, and the tangent pass can be exercised without a device.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`vertex`] | `Vertex`, `RawVertex` (upload layout) |
//! | [`texture`] | `TextureId`, `TextureRegistry`, `TextureRole` |
//! | [`material`] | `MaterialMap` (insertion-ordered per-material storage) |
//! | [`primitive`] | `Primitive` and its cylinder/plane/cube constructors |
//! | [`node`] | `Node`, `Composite`, `Child` (the scene graph) |
//! | [`builder`] | cube, multi-cube, table and room builders |
//! | [`assembly`] | `assemble` → `AssembledScene` (flattened per-material buffers) |
//! | [`tangent`] | tangent/bitangent pass |
//! | [`error`] | `SceneError` |
//!
//! # Quick start
//!
//! ```rust
//! use glam::Mat4;
//! use stereoworld_scene::builder::{SceneKind, build_scene};
//! use stereoworld_scene::texture::TextureRegistry;
//! use stereoworld_scene::assemble;
//!
//! let mut textures = TextureRegistry::new("Resource");
//! let root = build_scene(SceneKind::Table { width: 0.5, length: 0.5, height: 0.4 }, &mut textures).unwrap();
//! let scene = assemble(&root, Mat4::IDENTITY, Mat4::IDENTITY).unwrap();
//! assert_eq!(scene.meshes().len(), 2);
//! ```

pub mod assembly;
pub mod builder;
pub mod error;
pub mod material;
pub mod node;
pub mod primitive;
pub mod tangent;
pub mod texture;
pub mod vertex;

pub use assembly::{assemble, AssembledScene, MaterialMesh};
pub use error::SceneError;
pub use node::{Child, Composite, Node};
pub use primitive::Primitive;
pub use texture::{TextureId, TextureRegistry, TextureRole};
pub use vertex::{RawVertex, Vertex};
