// src/scene/arena.rs
//! Explicit node arena: stable handles, parent/child adjacency, recursive despawn.
//! Handles are never reused, so a despawned `NodeId` simply stops resolving.

use bevy::math::bounding::Aabb3d;
use bevy::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{MaterialRef, PropCategory, PropTemplate};
use super::mesh::TriMesh;

/// Stable handle into a `SceneArena`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

#[derive(Clone, Debug)]
pub struct TerrainNode {
    pub mesh: Arc<TriMesh>,
    pub material: Option<MaterialRef>,
}

#[derive(Clone, Debug)]
pub struct PropNode {
    pub template: Arc<PropTemplate>,
    pub category: PropCategory,
    pub capturable: bool,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Level roots and containers.
    Group,
    Terrain(TerrainNode),
    Prop(PropNode),
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    /// Relative to the parent (or world for roots).
    pub local: Transform,
    pub kind: NodeKind,
    pub visible: bool,
    parent: Option<NodeId>,
}

impl SceneNode {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn as_prop(&self) -> Option<&PropNode> {
        match &self.kind {
            NodeKind::Prop(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_terrain(&self) -> Option<&TerrainNode> {
        match &self.kind {
            NodeKind::Terrain(t) => Some(t),
            _ => None,
        }
    }
}

#[derive(Default)]
pub struct SceneArena {
    nodes: HashMap<NodeId, SceneNode>,
    children: HashMap<NodeId, Vec<NodeId>>,
    next_id: u64,
}

impl SceneArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert a node. A parent that no longer exists makes the node a root.
    pub fn spawn(
        &mut self,
        name: impl Into<String>,
        kind: NodeKind,
        local: Transform,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        let parent = parent.filter(|p| self.nodes.contains_key(p));
        if let Some(p) = parent {
            self.children.entry(p).or_default().push(id);
        }
        self.nodes.insert(id, SceneNode { name: name.into(), local, kind, visible: true, parent });
        id
    }

    /// Insert a node whose pose is given in world space.
    pub fn spawn_at_world(
        &mut self,
        name: impl Into<String>,
        kind: NodeKind,
        world: Transform,
        parent: Option<NodeId>,
    ) -> NodeId {
        let local = match parent.and_then(|p| self.world_transform(p)) {
            Some(parent_world) => relative_to(&parent_world, &world),
            None => world,
        };
        self.spawn(name, kind, local, parent)
    }

    /// Remove a node and its whole subtree. Returns every invalidated handle.
    pub fn despawn(&mut self, id: NodeId) -> Vec<NodeId> {
        if !self.nodes.contains_key(&id) {
            return Vec::new();
        }
        if let Some(p) = self.nodes.get(&id).and_then(|n| n.parent) {
            if let Some(siblings) = self.children.get_mut(&p) {
                siblings.retain(|&c| c != id);
            }
        }

        let removed = self.subtree(id);
        for n in &removed {
            self.nodes.remove(n);
            self.children.remove(n);
        }
        removed
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(&id)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().map(|(&id, n)| (id, n))
    }

    /// `id` followed by all of its descendants (depth first).
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cur = self.get(id).and_then(|n| n.parent);
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.get(p).and_then(|n| n.parent);
        }
        false
    }

    /// Compose local transforms from the root down.
    pub fn world_transform(&self, id: NodeId) -> Option<Transform> {
        let mut chain = Vec::new();
        let mut cur = Some(id);
        while let Some(n) = cur {
            let node = self.get(n)?;
            chain.push(node.local);
            cur = node.parent;
        }
        Some(chain.into_iter().rev().fold(Transform::IDENTITY, |acc, t| acc.mul_transform(t)))
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> bool {
        match self.get_mut(id) {
            Some(n) => {
                n.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Visible itself and through every ancestor.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(n) = cur {
            match self.get(n) {
                Some(node) if node.visible => cur = node.parent,
                _ => return false,
            }
        }
        true
    }

    pub fn props_under(&self, root: NodeId) -> Vec<NodeId> {
        self.subtree(root)
            .into_iter()
            .filter(|&n| self.get(n).is_some_and(|node| node.as_prop().is_some()))
            .collect()
    }

    pub fn terrain_under(&self, root: NodeId) -> Vec<NodeId> {
        self.subtree(root)
            .into_iter()
            .filter(|&n| self.get(n).is_some_and(|node| node.as_terrain().is_some()))
            .collect()
    }

    /// World AABB of a prop's visual bounds.
    pub fn prop_bounds(&self, id: NodeId) -> Option<Aabb3d> {
        let prop = self.get(id)?.as_prop()?;
        let world = self.world_transform(id)?;
        let center = world.translation + world.rotation * prop.template.local_center(world.scale);
        let half = prop.template.world_half_extents(world.rotation, world.scale);
        Some(Aabb3d::new(center, half))
    }

    /// Footprint radius (ground-plane half-extent) of a placed prop.
    pub fn footprint_radius(&self, id: NodeId) -> Option<f32> {
        let b = self.prop_bounds(id)?;
        let half = (Vec3::from(b.max) - Vec3::from(b.min)) * 0.5;
        Some(half.x.max(half.z))
    }

    /// World AABB of a terrain node's mesh.
    pub fn terrain_bounds(&self, id: NodeId) -> Option<Aabb3d> {
        let terrain = self.get(id)?.as_terrain()?;
        let local = terrain.mesh.bounds()?;
        let world = self.world_transform(id)?;
        Some(transform_aabb(&world, &local))
    }
}

/// `world` expressed relative to `parent`.
pub fn relative_to(parent: &Transform, world: &Transform) -> Transform {
    let local = parent.compute_affine().inverse() * world.compute_affine();
    Transform::from_matrix(Mat4::from(local))
}

/// AABB enclosing the 8 transformed corners of `aabb`.
pub fn transform_aabb(t: &Transform, aabb: &Aabb3d) -> Aabb3d {
    let (mn, mx) = (Vec3::from(aabb.min), Vec3::from(aabb.max));
    let mut lo = Vec3::splat(f32::INFINITY);
    let mut hi = Vec3::splat(f32::NEG_INFINITY);
    for i in 0..8 {
        let corner = Vec3::new(
            if i & 1 == 0 { mn.x } else { mx.x },
            if i & 2 == 0 { mn.y } else { mx.y },
            if i & 4 == 0 { mn.z } else { mx.z },
        );
        let p = t.transform_point(corner);
        lo = lo.min(p);
        hi = hi.max(p);
    }
    Aabb3d { min: lo.into(), max: hi.into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(name: &str, half: Vec3) -> NodeKind {
        NodeKind::Prop(PropNode {
            template: Arc::new(PropTemplate::new(name, half)),
            category: PropCategory::Small,
            capturable: true,
        })
    }

    #[test]
    fn world_transform_composes_parents() {
        let mut arena = SceneArena::new();
        let root = arena.spawn("root", NodeKind::Group, Transform::from_xyz(10.0, 0.0, 0.0), None);
        let child = arena.spawn("child", NodeKind::Group, Transform::from_xyz(0.0, 2.0, 0.0), Some(root));
        let w = arena.world_transform(child).unwrap();
        assert_eq!(w.translation, Vec3::new(10.0, 2.0, 0.0));
    }

    #[test]
    fn spawn_at_world_lands_at_requested_pose() {
        let mut arena = SceneArena::new();
        let root = arena.spawn(
            "root",
            NodeKind::Group,
            Transform::from_xyz(5.0, 0.0, 5.0).with_rotation(Quat::from_rotation_y(1.0)),
            None,
        );
        let target = Transform::from_xyz(1.0, 2.0, 3.0);
        let n = arena.spawn_at_world("n", NodeKind::Group, target, Some(root));
        let w = arena.world_transform(n).unwrap();
        assert!((w.translation - target.translation).length() < 1e-4);
    }

    #[test]
    fn despawn_invalidates_whole_subtree() {
        let mut arena = SceneArena::new();
        let root = arena.spawn("root", NodeKind::Group, Transform::IDENTITY, None);
        let a = arena.spawn("a", NodeKind::Group, Transform::IDENTITY, Some(root));
        let b = arena.spawn("b", prop("b", Vec3::ONE), Transform::IDENTITY, Some(a));
        let other = arena.spawn("other", NodeKind::Group, Transform::IDENTITY, Some(root));

        let removed = arena.despawn(a);
        assert_eq!(removed.len(), 2);
        assert!(!arena.contains(a) && !arena.contains(b));
        assert_eq!(arena.children(root), &[other]);

        // handles are never reused
        let c = arena.spawn("c", NodeKind::Group, Transform::IDENTITY, None);
        assert_ne!(c, a);
        assert_ne!(c, b);
    }

    #[test]
    fn hidden_parent_hides_children() {
        let mut arena = SceneArena::new();
        let root = arena.spawn("root", NodeKind::Group, Transform::IDENTITY, None);
        let child = arena.spawn("child", NodeKind::Group, Transform::IDENTITY, Some(root));
        assert!(arena.is_visible(child));
        arena.set_visible(root, false);
        assert!(!arena.is_visible(child));
    }

    #[test]
    fn prop_bounds_sit_on_the_pivot() {
        let mut arena = SceneArena::new();
        let p = arena.spawn("p", prop("p", Vec3::new(1.0, 2.0, 0.5)), Transform::from_xyz(3.0, 1.0, 0.0), None);
        let b = arena.prop_bounds(p).unwrap();
        assert_eq!(Vec3::from(b.min), Vec3::new(2.0, 1.0, -0.5));
        assert_eq!(Vec3::from(b.max), Vec3::new(4.0, 5.0, 0.5));
        assert_eq!(arena.footprint_radius(p), Some(1.0));
    }
}
