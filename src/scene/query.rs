// src/scene/query.rs
//! Ray probe and sphere broad-phase over the arena.
//! Hidden nodes are invisible to both queries.

use bevy::math::bounding::{BoundingSphere, IntersectsVolume, RayCast3d};
use bevy::prelude::*;

use super::arena::{NodeId, NodeKind, SceneArena};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceKind {
    Terrain,
    Prop,
}

#[derive(Clone, Copy, Debug)]
pub struct ProbeHit {
    pub point: Vec3,
    pub distance: f32,
    pub node: NodeId,
    pub surface: SurfaceKind,
}

/// Which node kinds a broad-phase query reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryFilter {
    pub terrain: bool,
    pub props: bool,
    pub capturable_only: bool,
}

impl QueryFilter {
    pub const PROPS: Self = Self { terrain: false, props: true, capturable_only: false };
    pub const CAPTURABLE: Self = Self { terrain: false, props: true, capturable_only: true };
    pub const TERRAIN: Self = Self { terrain: true, props: false, capturable_only: false };
}

/// Single downward ray probe against ground and prop geometry.
pub trait SurfaceProbe {
    fn probe_down(&self, origin: Vec3, max_distance: f32) -> Option<ProbeHit>;
}

/// Broad-phase "what is near this point".
pub trait OverlapQuery {
    /// Matching nodes, sorted by handle.
    fn overlap_sphere(&self, center: Vec3, radius: f32, filter: QueryFilter) -> Vec<NodeId>;
}

impl SurfaceProbe for SceneArena {
    fn probe_down(&self, origin: Vec3, max_distance: f32) -> Option<ProbeHit> {
        let ray = RayCast3d::new(origin, Dir3::NEG_Y, max_distance);
        let mut best: Option<ProbeHit> = None;

        let mut consider = |hit: ProbeHit| {
            let closer = match &best {
                None => true,
                Some(b) => hit.distance < b.distance || (hit.distance == b.distance && hit.node < b.node),
            };
            if closer {
                best = Some(hit);
            }
        };

        for (id, node) in self.iter() {
            if !self.is_visible(id) {
                continue;
            }
            match &node.kind {
                NodeKind::Prop(_) => {
                    let Some(bounds) = self.prop_bounds(id) else { continue };
                    if let Some(t) = ray.aabb_intersection_at(&bounds) {
                        consider(ProbeHit {
                            point: origin - Vec3::Y * t,
                            distance: t,
                            node: id,
                            surface: SurfaceKind::Prop,
                        });
                    }
                }
                NodeKind::Terrain(terrain) => {
                    // Cheap XZ reject before walking triangles.
                    let Some(bounds) = self.terrain_bounds(id) else { continue };
                    let (mn, mx) = (Vec3::from(bounds.min), Vec3::from(bounds.max));
                    if origin.x < mn.x || origin.x > mx.x || origin.z < mn.z || origin.z > mx.z {
                        continue;
                    }
                    let Some(world) = self.world_transform(id) else { continue };
                    for tri in terrain.mesh.triangles() {
                        let Some([a, b, c]) = terrain.mesh.triangle_positions(tri) else { continue };
                        let (a, b, c) = (world.transform_point(a), world.transform_point(b), world.transform_point(c));
                        if let Some(t) = ray_triangle(origin, Vec3::NEG_Y, a, b, c) {
                            if t <= max_distance {
                                consider(ProbeHit {
                                    point: origin - Vec3::Y * t,
                                    distance: t,
                                    node: id,
                                    surface: SurfaceKind::Terrain,
                                });
                            }
                        }
                    }
                }
                NodeKind::Group => {}
            }
        }
        best
    }
}

impl OverlapQuery for SceneArena {
    fn overlap_sphere(&self, center: Vec3, radius: f32, filter: QueryFilter) -> Vec<NodeId> {
        let sphere = BoundingSphere::new(center, radius.max(0.0));
        let mut out: Vec<NodeId> = self
            .iter()
            .filter(|(id, _)| self.is_visible(*id))
            .filter_map(|(id, node)| {
                let bounds = match &node.kind {
                    NodeKind::Prop(p) if filter.props && (!filter.capturable_only || p.capturable) => {
                        self.prop_bounds(id)
                    }
                    NodeKind::Terrain(_) if filter.terrain => self.terrain_bounds(id),
                    _ => None,
                }?;
                bounds.intersects(&sphere).then_some(id)
            })
            .collect();
        out.sort();
        out
    }
}

/// Two-sided Möller–Trumbore; returns the ray parameter of the hit.
pub fn ray_triangle(origin: Vec3, dir: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    const EPS: f32 = 1e-6;
    let e1 = b - a;
    let e2 = c - a;
    let p = dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < 1e-9 {
        return None;
    }
    let inv = 1.0 / det;
    let s = origin - a;
    let u = s.dot(p) * inv;
    if u < -EPS || u > 1.0 + EPS {
        return None;
    }
    let q = s.cross(e1);
    let v = dir.dot(q) * inv;
    if v < -EPS || u + v > 1.0 + EPS {
        return None;
    }
    let t = e2.dot(q) * inv;
    (t >= 0.0).then_some(t)
}
