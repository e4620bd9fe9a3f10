// src/scene/mesh.rs
//! CPU-side triangle mesh used for terrain templates, probing and spliced fragments.

use bevy::math::bounding::Aabb3d;
use bevy::prelude::*;
use bevy::render::mesh::Indices;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::PrimitiveTopology;

/// Indexed triangle list with per-vertex uv/normal and cached bounds.
#[derive(Clone, Debug)]
pub struct TriMesh {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub uvs: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    bounds: Option<Aabb3d>,
}

impl TriMesh {
    /// Build a mesh and recompute normals + bounds. Missing uvs are padded with zero.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, mut uvs: Vec<Vec2>) -> Self {
        uvs.resize(positions.len(), Vec2::ZERO);
        let mut mesh = Self { positions, indices, uvs, normals: Vec::new(), bounds: None };
        mesh.recompute_normals();
        mesh.recompute_bounds();
        mesh
    }

    /// Regular grid in XZ centred on the origin; `height` gives Y per (x, z).
    pub fn grid(size: Vec2, res: UVec2, height: impl Fn(f32, f32) -> f32) -> Self {
        let (res_x, res_z) = (res.x.max(1), res.y.max(1));
        let verts_x = res_x + 1;
        let verts_z = res_z + 1;
        let dx = size.x / res_x as f32;
        let dz = size.y / res_z as f32;

        let mut positions = Vec::with_capacity((verts_x * verts_z) as usize);
        let mut uvs = Vec::with_capacity((verts_x * verts_z) as usize);
        for j in 0..=res_z {
            let v = j as f32 / res_z as f32;
            for i in 0..=res_x {
                let u = i as f32 / res_x as f32;
                let x = i as f32 * dx - size.x * 0.5;
                let z = j as f32 * dz - size.y * 0.5;
                positions.push(Vec3::new(x, height(x, z), z));
                uvs.push(Vec2::new(u, v));
            }
        }

        // Two tris per quad, wound so the face normal points +Y.
        let mut indices = Vec::with_capacity((res_x * res_z * 6) as usize);
        for j in 0..res_z {
            for i in 0..res_x {
                let a = j * verts_x + i;
                let c = a + verts_x;
                indices.extend_from_slice(&[a, c, a + 1, a + 1, c, c + 1]);
            }
        }

        Self::new(positions, indices, uvs)
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Index triples; a trailing partial triple is ignored.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    pub fn triangle_positions(&self, tri: [u32; 3]) -> Option<[Vec3; 3]> {
        Some([
            *self.positions.get(tri[0] as usize)?,
            *self.positions.get(tri[1] as usize)?,
            *self.positions.get(tri[2] as usize)?,
        ])
    }

    pub fn bounds(&self) -> Option<Aabb3d> {
        self.bounds
    }

    /// Area-weighted smooth normals; degenerate vertices fall back to +Y.
    pub fn recompute_normals(&mut self) {
        let mut acc = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let (ia, ib, ic) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let (Some(&a), Some(&b), Some(&c)) =
                (self.positions.get(ia), self.positions.get(ib), self.positions.get(ic))
            else {
                continue;
            };
            let n = (b - a).cross(c - a);
            acc[ia] += n;
            acc[ib] += n;
            acc[ic] += n;
        }
        self.normals = acc
            .into_iter()
            .map(|n| {
                let n = n.normalize_or_zero();
                if n == Vec3::ZERO { Vec3::Y } else { n }
            })
            .collect();
    }

    pub fn recompute_bounds(&mut self) {
        let mut it = self.positions.iter().copied();
        self.bounds = it.next().map(|first| {
            let (min, max) = it.fold((first, first), |(mn, mx), p| (mn.min(p), mx.max(p)));
            Aabb3d { min: min.into(), max: max.into() }
        });
    }

    /// Planar uvs from the ground-plane (XZ) bounding box.
    pub fn recompute_planar_uvs(&mut self) {
        let Some(bounds) = self.bounds else { return };
        let min = Vec3::from(bounds.min);
        let size = Vec3::from(bounds.max) - min;
        let inv = |s: f32| if s > f32::EPSILON { 1.0 / s } else { 0.0 };
        let (ix, iz) = (inv(size.x), inv(size.z));
        self.uvs = self
            .positions
            .iter()
            .map(|p| Vec2::new((p.x - min.x) * ix, (p.z - min.z) * iz))
            .collect();
    }

    /// Render mesh for Bevy.
    pub fn to_mesh(&self) -> Mesh {
        let positions: Vec<[f32; 3]> = self.positions.iter().map(|p| p.to_array()).collect();
        let normals: Vec<[f32; 3]> = self.normals.iter().map(|n| n.to_array()).collect();
        let uvs: Vec<[f32; 2]> = self.uvs.iter().map(|uv| uv.to_array()).collect();

        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
        mesh.insert_indices(Indices::U32(self.indices.clone()));
        mesh
    }
}
