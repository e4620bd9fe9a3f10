// src/paint/apply.rs
//! Turns placement requests into props in a level and remembers which line made what.

use bevy::prelude::*;
use rand::Rng;
use std::sync::Arc;

use crate::config::{PaintSettings, PlacementSettings};
use crate::level::{spawn_prop, Level};
use crate::placement::verify_position;
use crate::scene::{NodeId, SceneArena};
use super::canvas::PaintLine;
use super::convert::{convert_line, max_placeable_count, polyline_length, saturated_count, PlacementRequest};

/// Everything one paint line spawned, so it can be undone or regenerated alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LineToPlacementMapping {
    pub line_index: usize,
    pub spawned: Vec<NodeId>,
    pub max_placeable: usize,
}

/// Map normalized requests onto the level's terrain and keep the ones that verify.
/// The paint stroke picks the spot, so positions are checked, not searched.
pub fn generate_props_from_placements<R: Rng + ?Sized>(
    arena: &mut SceneArena,
    level: &mut Level,
    requests: &[PlacementRequest],
    settings: &PlacementSettings,
    rng: &mut R,
) -> Vec<NodeId> {
    let bp = level.blueprint.clone();
    let mut spawned = Vec::new();

    for req in requests {
        let Some(spec) = bp.category(req.category) else { continue };
        if !spec.has_templates() {
            debug!("Paint: no {:?} templates in '{}'", req.category, bp.name);
            continue;
        }
        let template = &spec.templates[rng.random_range(0..spec.templates.len())];
        let yaw = Quat::from_rotation_y(rng.random_range(0.0..std::f32::consts::TAU));
        let footprint = template.footprint_radius(yaw, Vec3::ONE);

        let offset = (req.position - Vec2::splat(0.5)) * 2.0 * level.terrain_radius;
        let target = level.terrain_center + Vec3::new(offset.x, 0.0, offset.y);

        let Some(pos) = verify_position(arena, &level.index, target, footprint, spec.clearance, settings) else {
            continue;
        };
        let world = Transform::from_translation(pos).with_rotation(yaw);
        let id = spawn_prop(arena, Arc::new(template.clone()), req.category, world, level.root);
        level.index.insert(pos, footprint, id);
        spawned.push(id);
    }
    spawned
}

/// Per-line bookkeeping for a painted level.
#[derive(Clone, Debug, Default)]
pub struct LinePlacements {
    mappings: Vec<LineToPlacementMapping>,
}

impl LinePlacements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mapping(&self, line_index: usize) -> Option<&LineToPlacementMapping> {
        self.mappings.iter().find(|m| m.line_index == line_index)
    }

    pub fn mappings(&self) -> &[LineToPlacementMapping] {
        &self.mappings
    }

    pub fn total_spawned(&self) -> usize {
        self.mappings.iter().map(|m| m.spawned.len()).sum()
    }

    /// Spawn a freshly finished line's props.
    pub fn apply_line<R: Rng + ?Sized>(
        &mut self,
        arena: &mut SceneArena,
        level: &mut Level,
        line_index: usize,
        line: &PaintLine,
        paint: &PaintSettings,
        placement: &PlacementSettings,
        rng: &mut R,
    ) -> usize {
        let max_placeable = max_placeable_count(polyline_length(&line.points), paint.density_per_unit);
        let target = saturated_count(max_placeable, line.saturation);
        let requests = convert_line(line, Some(target), paint, level.blueprint.allow_randomness, rng);
        let spawned = generate_props_from_placements(arena, level, &requests, placement, rng);
        let placed = spawned.len();
        debug!(
            "Paint: line {} → {}/{} {:?} props (max {})",
            line_index, placed, target, line.category, max_placeable
        );

        self.remove_mapping(line_index);
        self.mappings.push(LineToPlacementMapping { line_index, spawned, max_placeable });
        placed
    }

    /// Destroy exactly the objects this line spawned and forget the mapping.
    pub fn remove_line(&mut self, arena: &mut SceneArena, level: &mut Level, line_index: usize) -> usize {
        let Some(mapping) = self.remove_mapping(line_index) else { return 0 };
        despawn_all(arena, level, &mapping.spawned)
    }

    /// Rebuild one line's props at the count its new saturation implies.
    pub fn regenerate_line<R: Rng + ?Sized>(
        &mut self,
        arena: &mut SceneArena,
        level: &mut Level,
        line_index: usize,
        line: &PaintLine,
        paint: &PaintSettings,
        placement: &PlacementSettings,
        rng: &mut R,
    ) -> usize {
        self.remove_line(arena, level, line_index);
        self.apply_line(arena, level, line_index, line, paint, placement, rng)
    }

    fn remove_mapping(&mut self, line_index: usize) -> Option<LineToPlacementMapping> {
        let pos = self.mappings.iter().position(|m| m.line_index == line_index)?;
        Some(self.mappings.remove(pos))
    }
}

fn despawn_all(arena: &mut SceneArena, level: &mut Level, ids: &[NodeId]) -> usize {
    let mut removed = Vec::new();
    for &id in ids {
        removed.extend(arena.despawn(id));
    }
    level.index.remove_owners(&removed);
    ids.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PropCategory, PropTemplate};
    use crate::level::{Blueprint, GenerationMode, LevelGenerator, LevelLayout, TerrainTemplate};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn painted_level(arena: &mut SceneArena) -> Level {
        let mut bp = Blueprint::new("canvas", LevelLayout::Park, TerrainTemplate::flat(200.0));
        bp.small.templates = vec![PropTemplate::new("pebble", Vec3::splat(0.2))];
        bp.large.templates = vec![PropTemplate::new("rock", Vec3::splat(1.0))];
        bp.allow_randomness = false;
        LevelGenerator::new(PlacementSettings::default(), 0)
            .generate_level(arena, Arc::new(bp), Vec3::new(0.0, 0.0, 500.0), GenerationMode::Painted)
            .unwrap()
    }

    fn line(category: PropCategory, saturation: f32) -> PaintLine {
        PaintLine {
            points: vec![Vec2::new(20.0, 256.0), Vec2::new(492.0, 256.0)],
            category,
            saturation,
            paint_consumed: 0,
        }
    }

    #[test]
    fn requests_map_onto_the_terrain_square() {
        let mut arena = SceneArena::new();
        let mut level = painted_level(&mut arena);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let reqs = [
            PlacementRequest { category: PropCategory::Small, position: Vec2::splat(0.5), density: 1.0 },
            PlacementRequest { category: PropCategory::Small, position: Vec2::new(0.9, 0.1), density: 1.0 },
        ];
        let ids = generate_props_from_placements(&mut arena, &mut level, &reqs, &PlacementSettings::default(), &mut rng);
        assert_eq!(ids.len(), 2);
        let a = arena.world_transform(ids[0]).unwrap().translation;
        let b = arena.world_transform(ids[1]).unwrap().translation;
        assert!((a - Vec3::new(0.0, 0.0, 500.0)).length() < 1e-3);
        assert!((b - Vec3::new(80.0, 0.0, 420.0)).length() < 1e-3);
        assert_eq!(level.index.len(), 2);
    }

    #[test]
    fn overlapping_requests_are_dropped_not_moved() {
        let mut arena = SceneArena::new();
        let mut level = painted_level(&mut arena);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let req = PlacementRequest { category: PropCategory::Large, position: Vec2::splat(0.3), density: 1.0 };
        let ids = generate_props_from_placements(&mut arena, &mut level, &[req, req], &PlacementSettings::default(), &mut rng);
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn missing_templates_place_nothing() {
        let mut arena = SceneArena::new();
        let mut level = painted_level(&mut arena);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let req = PlacementRequest { category: PropCategory::Landmark, position: Vec2::splat(0.5), density: 1.0 };
        assert!(generate_props_from_placements(&mut arena, &mut level, &[req], &PlacementSettings::default(), &mut rng).is_empty());
    }

    #[test]
    fn removing_a_line_only_touches_its_own_objects() {
        let mut arena = SceneArena::new();
        let mut level = painted_level(&mut arena);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let (paint, place) = (PaintSettings::default(), PlacementSettings::default());
        let mut lines = LinePlacements::new();

        let mut upper = line(PropCategory::Small, 1.0);
        upper.points.iter_mut().for_each(|p| p.y = 100.0);
        let n0 = lines.apply_line(&mut arena, &mut level, 0, &upper, &paint, &place, &mut rng);
        let n1 = lines.apply_line(&mut arena, &mut level, 1, &line(PropCategory::Small, 1.0), &paint, &place, &mut rng);
        assert!(n0 > 0 && n1 > 0);
        let kept = lines.mapping(0).unwrap().spawned.clone();
        let dropped = lines.mapping(1).unwrap().spawned.clone();

        assert_eq!(lines.remove_line(&mut arena, &mut level, 1), n1);
        assert!(dropped.iter().all(|id| !arena.contains(*id) && !level.index.contains_owner(*id)));
        assert!(kept.iter().all(|id| arena.contains(*id) && level.index.contains_owner(*id)));
        assert!(lines.mapping(1).is_none());
        assert_eq!(lines.total_spawned(), n0);
    }

    #[test]
    fn regenerating_at_lower_saturation_shrinks_the_line() {
        let mut arena = SceneArena::new();
        let mut level = painted_level(&mut arena);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (paint, place) = (PaintSettings::default(), PlacementSettings::default());
        let mut lines = LinePlacements::new();

        let mut l = line(PropCategory::Small, 1.0);
        let full = lines.apply_line(&mut arena, &mut level, 0, &l, &paint, &place, &mut rng);
        assert_eq!(lines.mapping(0).unwrap().max_placeable, 47); // round(0.1 * 472)
        assert_eq!(full, 47);

        l.saturation = 0.5;
        let half = lines.regenerate_line(&mut arena, &mut level, 0, &l, &paint, &place, &mut rng);
        assert_eq!(half, 24);
        assert_eq!(level.props(&arena).len(), 24);
        assert_eq!(lines.mappings().len(), 1);
    }
}
