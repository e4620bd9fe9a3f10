// src/scene/mod.rs
//! Scene model: node arena, triangle meshes and spatial queries.

pub mod arena;
pub mod mesh;
pub mod query;

pub use arena::{NodeId, NodeKind, PropNode, SceneArena, SceneNode, TerrainNode};
pub use mesh::TriMesh;
pub use query::{OverlapQuery, ProbeHit, QueryFilter, SurfaceKind, SurfaceProbe};
