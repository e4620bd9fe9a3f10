// src/placement/spatial.rs
//! Per-level record of placed props (position + footprint) for overlap tests.

use bevy::prelude::*;

use crate::scene::{NodeId, SceneArena};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedObjectRecord {
    pub position: Vec3,
    /// Ground-plane half-extent of the owner's bounds.
    pub footprint_radius: f32,
    pub owner: NodeId,
}

/// One per level; never shared between levels.
#[derive(Clone, Debug, Default)]
pub struct SpatialIndex {
    records: Vec<PlacedObjectRecord>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, position: Vec3, footprint_radius: f32, owner: NodeId) {
        self.records.push(PlacedObjectRecord { position, footprint_radius: footprint_radius.max(0.0), owner });
    }

    /// Record a prop already in the arena, measuring its footprint from its bounds.
    pub fn insert_node(&mut self, arena: &SceneArena, owner: NodeId) -> bool {
        let (Some(world), Some(radius)) = (arena.world_transform(owner), arena.footprint_radius(owner)) else {
            return false;
        };
        self.insert(world.translation, radius, owner);
        true
    }

    pub fn remove_owner(&mut self, owner: NodeId) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.owner != owner);
        self.records.len() != before
    }

    /// Drop records for every handle in `removed` (output of `SceneArena::despawn`).
    pub fn remove_owners(&mut self, removed: &[NodeId]) {
        self.records.retain(|r| !removed.contains(&r.owner));
    }

    /// Drop records whose owner no longer exists in the arena.
    pub fn retain_live(&mut self, arena: &SceneArena) {
        self.records.retain(|r| arena.contains(r.owner));
    }

    pub fn contains_owner(&self, owner: NodeId) -> bool {
        self.records.iter().any(|r| r.owner == owner)
    }

    pub fn records(&self) -> &[PlacedObjectRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True if a footprint at `position` would come closer to any record than
    /// `radius + record.radius + clearance + margin`.
    pub fn overlaps(&self, position: Vec3, radius: f32, clearance: f32, margin: f32) -> bool {
        self.records.iter().any(|r| {
            let required = radius + r.footprint_radius + clearance + margin;
            position.distance(r.position) < required
        })
    }
}
