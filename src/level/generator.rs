// src/level/generator.rs
//! Level generation: terrain instancing, layout population, exits and resets.
//!
//! A `Level` is plain data pointing into a `SceneArena`; the generator owns the
//! RNG and the entry counters that make later levels busier than earlier ones.

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f32::consts::TAU;
use std::sync::Arc;

use crate::config::{PlacementSettings, ProgressSettings};
use crate::core::{PropCategory, PropTemplate};
use crate::placement::{find_safe_position, SearchRequest, SpatialIndex};
use crate::scene::{NodeId, NodeKind, PropNode, SceneArena, SurfaceProbe, TerrainNode, TriMesh};
use super::blueprint::{Blueprint, BlueprintLibrary, CategorySpec, LevelLayout};
use super::progress::LevelProgress;

pub const PLAYER_CONTENT: &str = "player_content";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GenerationMode {
    /// Populate straight from the blueprint counts.
    #[default]
    BlueprintOnly,
    /// Terrain only; the player paints the population and earns the frame.
    Painted,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LevelError {
    #[error("exit could not be placed after {attempts} attempts (final radius {radius:.1})")]
    ExitPlacementFailed { attempts: u32, radius: f32 },
    #[error("no blueprints configured")]
    NoBlueprints,
    #[error("scene node {0:?} is not part of a live level")]
    UnknownLevel(NodeId),
    #[error("blueprint '{0}' has neither a frame nor a door template")]
    MissingExitTemplate(String),
}

/// One generated level. Everything it references lives under `root`.
#[derive(Debug)]
pub struct Level {
    pub root: NodeId,
    pub terrain: NodeId,
    /// Spliced fragments and photo props; wiped by `reset_level`.
    pub player_content: NodeId,
    pub blueprint: Arc<Blueprint>,
    pub mode: GenerationMode,
    pub origin: Vec3,
    pub terrain_center: Vec3,
    pub terrain_radius: f32,
    pub index: SpatialIndex,
    pub exit: Option<NodeId>,
    /// Props hidden by photo placement, restored on reset.
    pub hidden: Vec<NodeId>,
    pub progress: LevelProgress,
    pristine_terrain: Arc<TriMesh>,
}

impl Level {
    pub fn pristine_terrain(&self) -> &Arc<TriMesh> {
        &self.pristine_terrain
    }

    /// Hide (not destroy) a node; remembered so a reset can bring it back.
    pub fn hide(&mut self, arena: &mut SceneArena, id: NodeId) {
        if arena.set_visible(id, false) && !self.hidden.contains(&id) {
            self.hidden.push(id);
        }
    }

    pub fn restore_hidden(&mut self, arena: &mut SceneArena) {
        for id in self.hidden.drain(..) {
            arena.set_visible(id, true);
        }
    }

    pub fn props(&self, arena: &SceneArena) -> Vec<NodeId> {
        arena.props_under(self.root)
    }

    pub fn count_props(&self, arena: &SceneArena, category: PropCategory) -> usize {
        self.props(arena)
            .into_iter()
            .filter(|&id| arena.get(id).and_then(|n| n.as_prop()).is_some_and(|p| p.category == category))
            .count()
    }

    /// Despawn the whole level. Returns every invalidated handle.
    pub fn teardown(self, arena: &mut SceneArena) -> Vec<NodeId> {
        arena.despawn(self.root)
    }
}

pub struct LevelGenerator {
    pub settings: PlacementSettings,
    rng: ChaCha8Rng,
    entry_count: u32,
    park_entries: u32,
    forest_entries: u32,
}

impl LevelGenerator {
    pub fn new(settings: PlacementSettings, seed: u64) -> Self {
        Self {
            settings,
            rng: ChaCha8Rng::seed_from_u64(seed),
            entry_count: 0,
            park_entries: 0,
            forest_entries: 0,
        }
    }

    /// Settings and RNG borrowed together, for callers that place on the generator's behalf.
    pub fn parts(&mut self) -> (&PlacementSettings, &mut ChaCha8Rng) {
        (&self.settings, &mut self.rng)
    }

    pub fn entry_count(&self) -> u32 {
        self.entry_count
    }

    /// Generate the next level, cycling blueprints by entry count.
    pub fn spawn_level(
        &mut self,
        arena: &mut SceneArena,
        library: &BlueprintLibrary,
        origin: Vec3,
        mode: GenerationMode,
    ) -> Result<Level, LevelError> {
        let blueprint = library.cycle(self.entry_count).cloned().ok_or(LevelError::NoBlueprints)?;
        self.entry_count += 1;
        self.generate_level(arena, blueprint, origin, mode)
    }

    /// Instantiate terrain at `origin` and, in blueprint-only mode, populate it.
    /// Fails (leaving nothing behind) only when the door cannot be placed.
    pub fn generate_level(
        &mut self,
        arena: &mut SceneArena,
        blueprint: Arc<Blueprint>,
        origin: Vec3,
        mode: GenerationMode,
    ) -> Result<Level, LevelError> {
        let root = arena.spawn(
            format!("level_root_{}", blueprint.name),
            NodeKind::Group,
            Transform::from_translation(origin),
            None,
        );
        let player_content = arena.spawn(PLAYER_CONTENT, NodeKind::Group, Transform::IDENTITY, Some(root));

        let pristine = Arc::new(blueprint.terrain.build_mesh());
        let terrain = spawn_terrain(arena, root, &pristine, &blueprint);

        let (terrain_center, terrain_radius) = match arena.terrain_bounds(terrain) {
            Some(b) if b.max.x > b.min.x => {
                let (mn, mx) = (Vec3::from(b.min), Vec3::from(b.max));
                ((mn + mx) * 0.5, (mx.x - mn.x) * 0.5)
            }
            _ => (origin, self.settings.fallback_radius),
        };

        let mut level = Level {
            root,
            terrain,
            player_content,
            blueprint: blueprint.clone(),
            mode,
            origin,
            terrain_center,
            terrain_radius,
            index: SpatialIndex::new(),
            exit: None,
            hidden: Vec::new(),
            progress: LevelProgress::default(),
            pristine_terrain: pristine,
        };

        if mode == GenerationMode::BlueprintOnly {
            match blueprint.layout {
                LevelLayout::Park => {
                    self.park_entries += 1;
                    self.populate_park(arena, &mut level);
                }
                LevelLayout::Forest => {
                    self.forest_entries += 1;
                    self.populate_forest(arena, &mut level);
                }
            }

            match &blueprint.exit {
                Some(exit) => {
                    if let Err(e) = self.place_exit(arena, &mut level, exit) {
                        arena.despawn(root);
                        return Err(e);
                    }
                }
                None => warn!("Level '{}': blueprint has no door template; level has no exit", blueprint.name),
            }
        }

        info!(
            "Level '{}' ({:?}, {:?}) at {:?}: radius={:.1}, landmark={}, large={}, small={}, exit={}",
            blueprint.name,
            blueprint.layout,
            mode,
            origin,
            terrain_radius,
            level.count_props(arena, PropCategory::Landmark),
            level.count_props(arena, PropCategory::Large),
            level.count_props(arena, PropCategory::Small),
            level.exit.is_some(),
        );
        Ok(level)
    }

    fn populate_park(&mut self, arena: &mut SceneArena, level: &mut Level) {
        let bp = level.blueprint.clone();
        let radius = level.terrain_radius;

        // Landmark sits at the centre, unconditionally.
        match bp.landmark.templates.first() {
            Some(t) => {
                let id = spawn_prop(arena, Arc::new(t.clone()), PropCategory::Landmark, Transform::from_translation(level.origin), level.root);
                level.index.insert_node(arena, id);
            }
            None => warn!("Level '{}': no landmark templates", bp.name),
        }

        // Rock lines: one more spoke per park visit, three rocks each.
        if let Some(rock) = bp.large.templates.first() {
            let lines = 2 + self.park_entries;
            for i in 1..=lines {
                let dir = Quat::from_rotation_y(TAU / lines as f32 * i as f32) * Vec3::Z;
                for j in 1..4 {
                    let jitter = self.settings.radial_jitter;
                    let offset = if bp.allow_randomness && jitter > 0.0 {
                        self.rng.random_range(-jitter..jitter)
                    } else {
                        0.0
                    };
                    let mut pos = level.origin + dir * (radius * j as f32 / 4.0 + offset);
                    pos.y = self.ground_height(arena, pos).unwrap_or(level.origin.y);
                    let world = Transform::from_translation(pos).with_rotation(self.random_yaw());
                    let id = spawn_prop(arena, Arc::new(rock.clone()), PropCategory::Large, world, level.root);
                    level.index.insert_node(arena, id);
                }
            }
        }

        let large_radius = radius * self.settings.large_spawn_fraction;
        self.populate_category(arena, level, &bp.large, PropCategory::Large, large_radius);
        self.populate_category(arena, level, &bp.small, PropCategory::Small, radius);
    }

    fn populate_forest(&mut self, arena: &mut SceneArena, level: &mut Level) {
        let bp = level.blueprint.clone();
        let large_radius = level.terrain_radius * self.settings.large_spawn_fraction;
        self.populate_category(arena, level, &bp.landmark, PropCategory::Landmark, large_radius);
        self.populate_category(arena, level, &bp.large, PropCategory::Large, large_radius);
        self.populate_category(arena, level, &bp.small, PropCategory::Small, level.terrain_radius);
    }

    /// Scatter `spec.count` props inside `spawn_radius`. Returns how many found room.
    pub fn populate_category(
        &mut self,
        arena: &mut SceneArena,
        level: &mut Level,
        spec: &CategorySpec,
        category: PropCategory,
        spawn_radius: f32,
    ) -> u32 {
        if spec.count == 0 {
            return 0;
        }
        if !spec.has_templates() {
            warn!("Level '{}': {:?} has count {} but no templates", level.blueprint.name, category, spec.count);
            return 0;
        }

        let mut placed = 0;
        for _ in 0..spec.count {
            let template = &spec.templates[self.rng.random_range(0..spec.templates.len())];
            let yaw = self.random_yaw();
            let footprint = template.footprint_radius(yaw, Vec3::ONE);
            let req = SearchRequest::new(level.origin, spawn_radius, spec.clearance, footprint, self.settings.max_attempts);
            let Some(pos) = find_safe_position(arena, &level.index, &req, &self.settings, &mut self.rng) else {
                continue;
            };
            let world = Transform::from_translation(pos).with_rotation(yaw);
            let id = spawn_prop(arena, Arc::new(template.clone()), category, world, level.root);
            level.index.insert(pos, footprint, id);
            placed += 1;
        }

        if placed < spec.count {
            debug!("Level '{}': placed {}/{} {:?} props", level.blueprint.name, placed, spec.count, category);
        }
        placed
    }

    /// Door near the rim, facing away from the centre. Retries wider and looser before failing.
    pub fn place_exit(
        &mut self,
        arena: &mut SceneArena,
        level: &mut Level,
        template: &PropTemplate,
    ) -> Result<NodeId, LevelError> {
        let radius = level.terrain_radius * self.settings.exit_spawn_fraction;
        // Yaw is only known once the spot is, so search with the footprint of any yaw.
        let search_footprint = template.half_extents.xz().length();
        let pos = self.search_with_retries(
            arena,
            &level.index,
            level.origin,
            radius,
            level.blueprint.exit_clearance,
            search_footprint,
            None,
        )?;

        let world = facing_away(pos, level.origin);
        let footprint = template.footprint_radius(world.rotation, Vec3::ONE);
        let id = spawn_prop(arena, Arc::new(template.clone()), PropCategory::Exit, world, level.root);
        level.index.insert(pos, footprint, id);
        level.exit = Some(id);
        debug!("Level '{}': exit '{}' at {:?}", level.blueprint.name, template.name, pos);
        Ok(id)
    }

    /// Frame placed on one specific spliced terrain fragment.
    pub fn place_frame(
        &mut self,
        arena: &mut SceneArena,
        level: &mut Level,
        fragment: NodeId,
    ) -> Result<NodeId, LevelError> {
        let template = level
            .blueprint
            .frame_template()
            .cloned()
            .ok_or_else(|| LevelError::MissingExitTemplate(level.blueprint.name.clone()))?;
        if !arena.is_descendant_of(fragment, level.root) {
            return Err(LevelError::UnknownLevel(fragment));
        }
        let bounds = arena.terrain_bounds(fragment).ok_or(LevelError::UnknownLevel(fragment))?;
        let (mn, mx) = (Vec3::from(bounds.min), Vec3::from(bounds.max));
        let center = (mn + mx) * 0.5;
        let radius = ((mx.x - mn.x).max(mx.z - mn.z)) * 0.5;
        let footprint = template.footprint_radius(Quat::IDENTITY, Vec3::ONE);

        let pos = self.search_with_retries(
            arena,
            &level.index,
            center,
            radius,
            level.blueprint.exit_clearance,
            footprint,
            Some(fragment),
        )?;

        let id = spawn_prop(arena, Arc::new(template.clone()), PropCategory::Exit, facing_away(pos, level.origin), level.player_content);
        level.index.insert(pos, footprint, id);
        level.exit = Some(id);
        level.progress.frame_generated = true;
        info!("Level '{}': frame '{}' appeared at {:?}", level.blueprint.name, template.name, pos);
        Ok(id)
    }

    /// Record a placed photo; once the level counts as solved, put the frame on the new fragment.
    pub fn on_photo_placed(
        &mut self,
        arena: &mut SceneArena,
        level: &mut Level,
        categories: &[PropCategory],
        fragment: Option<NodeId>,
        progress: &ProgressSettings,
    ) -> Result<Option<NodeId>, LevelError> {
        level.progress.record_placement(categories);
        if !level.progress.should_open_exit(progress) {
            return Ok(None);
        }
        let Some(fragment) = fragment else {
            debug!("Level '{}': solved, waiting for a photo with ground to hold the frame", level.blueprint.name);
            return Ok(None);
        };
        self.place_frame(arena, level, fragment).map(Some)
    }

    /// Teleport-safe point inside the level; falls back to the origin.
    pub fn random_position_in_level(&mut self, arena: &SceneArena, level: &Level) -> Vec3 {
        let mut live = SpatialIndex::new();
        for id in level.props(arena) {
            if arena.is_visible(id) {
                live.insert_node(arena, id);
            }
        }
        let req = SearchRequest::new(
            level.origin,
            level.terrain_radius * self.settings.large_spawn_fraction,
            self.settings.teleport_clearance,
            self.settings.player_radius,
            self.settings.max_attempts,
        );
        find_safe_position(arena, &live, &req, &self.settings, &mut self.rng).unwrap_or(level.origin)
    }

    /// Replace the level's terrain with a fresh copy of the pristine template mesh.
    pub fn regenerate_terrain(&self, arena: &mut SceneArena, level: &mut Level) -> NodeId {
        arena.despawn(level.terrain);
        level.terrain = spawn_terrain(arena, level.root, &level.pristine_terrain, &level.blueprint);
        level.terrain
    }

    /// Undo everything the player did: photo content, hidden props, terrain and progress.
    pub fn reset_level(&self, arena: &mut SceneArena, level: &mut Level) {
        let removed = arena.despawn(level.player_content);
        // Sweeps player content plus anything despawned behind the index's back.
        level.index.retain_live(arena);
        if level.exit.is_some_and(|e| removed.contains(&e)) {
            level.exit = None;
        }
        level.player_content = arena.spawn(PLAYER_CONTENT, NodeKind::Group, Transform::IDENTITY, Some(level.root));
        level.restore_hidden(arena);
        self.regenerate_terrain(arena, level);
        level.progress.reset();
        info!("Level '{}': reset ({} player nodes removed)", level.blueprint.name, removed.len());
    }

    fn search_with_retries(
        &mut self,
        arena: &SceneArena,
        index: &SpatialIndex,
        center: Vec3,
        radius: f32,
        clearance: f32,
        footprint: f32,
        surface: Option<NodeId>,
    ) -> Result<Vec3, LevelError> {
        let (mut radius, mut clearance) = (radius, clearance);
        let mut attempts = 0;
        let mut last_radius = radius;

        for round in 0..=self.settings.exit_retry_rounds {
            let mut req = SearchRequest::new(center, radius, clearance, footprint, self.settings.exit_max_attempts);
            req.surface_filter = surface;
            attempts += if radius <= 0.0 { 1 } else { self.settings.exit_max_attempts.max(1) };
            last_radius = radius;

            if let Some(pos) = find_safe_position(arena, index, &req, &self.settings, &mut self.rng) {
                return Ok(pos);
            }
            warn!(
                "Exit search round {} failed (radius={:.1}, clearance={:.1}); widening",
                round + 1,
                radius,
                clearance
            );
            radius *= self.settings.exit_radius_growth;
            clearance = 0.0;
        }

        error!("Exit placement failed after {} attempts around {:?}", attempts, center);
        Err(LevelError::ExitPlacementFailed { attempts, radius: last_radius })
    }

    fn ground_height(&self, arena: &SceneArena, at: Vec3) -> Option<f32> {
        arena
            .probe_down(at + Vec3::Y * self.settings.probe_height, self.settings.probe_distance)
            .map(|hit| hit.point.y)
    }

    fn random_yaw(&mut self) -> Quat {
        Quat::from_rotation_y(self.rng.random_range(0.0..TAU))
    }
}

/// Spawn a prop node at a world pose under `parent`.
pub fn spawn_prop(
    arena: &mut SceneArena,
    template: Arc<PropTemplate>,
    category: PropCategory,
    world: Transform,
    parent: NodeId,
) -> NodeId {
    let capturable = template.capturable && category != PropCategory::Exit;
    let name = template.name.clone();
    let kind = NodeKind::Prop(PropNode { template, category, capturable });
    arena.spawn_at_world(name, kind, world, Some(parent))
}

fn spawn_terrain(arena: &mut SceneArena, root: NodeId, mesh: &Arc<TriMesh>, blueprint: &Blueprint) -> NodeId {
    let kind = NodeKind::Terrain(TerrainNode { mesh: mesh.clone(), material: blueprint.terrain.material.clone() });
    arena.spawn("terrain", kind, Transform::IDENTITY, Some(root))
}

/// Pose at `position` whose forward (-Z) points away from `center` on the ground plane.
pub fn facing_away(position: Vec3, center: Vec3) -> Transform {
    let dir = (position - center).with_y(0.0);
    let t = Transform::from_translation(position);
    if dir.length_squared() < 1e-8 {
        return t;
    }
    t.with_rotation(Quat::from_rotation_y(f32::atan2(-dir.x, -dir.z)))
}
