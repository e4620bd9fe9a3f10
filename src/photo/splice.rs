// src/photo/splice.rs
//! Splice engine: rebuild a held capture in front of another camera.

use bevy::prelude::*;
use std::sync::Arc;

use crate::core::PropCategory;
use crate::level::{spawn_prop, Level};
use crate::scene::{NodeId, NodeKind, SceneArena, TerrainNode, TriMesh};
use super::capture::Capture;
use super::frustum::VirtualCamera;

/// What a placement put into (and took out of) the level.
#[derive(Clone, Debug, Default)]
pub struct SpliceResult {
    pub props: Vec<NodeId>,
    pub fragment: Option<NodeId>,
    pub hidden: Vec<NodeId>,
    pub categories: Vec<PropCategory>,
}

/// Ratio applied to every captured local coordinate.
pub fn splice_factor(placement_distance: f32, reference_distance: f32) -> f32 {
    if reference_distance <= f32::EPSILON {
        return 1.0;
    }
    placement_distance / reference_distance
}

/// World pose of a captured object re-projected through `target`.
/// Scale follows depth: new depth over captured depth.
pub fn respliced_transform(
    local_position: Vec3,
    local_rotation: Quat,
    scale: Vec3,
    target: &VirtualCamera,
    factor: f32,
) -> Transform {
    let adjusted = local_position * factor;
    let depth_ratio = if local_position.z.abs() > f32::EPSILON { adjusted.z / local_position.z } else { factor };
    Transform {
        translation: target.to_world(adjusted),
        rotation: target.rotation_to_world(local_rotation),
        scale: scale * depth_ratio,
    }
}

/// Hide the level's props that sit where the photo is about to land.
///
/// The cone is the one frozen at capture time, posed at `target`. Its height and base are
/// multiplied by the same `factor` the placed content is, so the hidden region always
/// matches where the content lands. At `factor == 1.0` this is the frozen cone unchanged.
pub fn hide_covered(arena: &mut SceneArena, level: &mut Level, capture: &Capture, target: &VirtualCamera, factor: f32) -> Vec<NodeId> {
    let cone = capture.frustum.scaled(factor);
    let covered: Vec<NodeId> = level
        .props(arena)
        .into_iter()
        .filter(|&id| arena.is_visible(id))
        .filter(|&id| {
            arena.get(id).and_then(|n| n.as_prop()).is_some_and(|p| p.category != PropCategory::Exit)
        })
        .filter(|&id| arena.world_transform(id).is_some_and(|w| cone.contains(target, w.translation)))
        .collect();

    for &id in &covered {
        level.hide(arena, id);
    }
    covered
}

/// Consume a capture into the level's player content.
pub fn place_capture(
    arena: &mut SceneArena,
    level: &mut Level,
    capture: &Capture,
    target: &VirtualCamera,
    placement_distance: f32,
    reference_distance: f32,
) -> SpliceResult {
    let factor = splice_factor(placement_distance, reference_distance);
    let hidden = hide_covered(arena, level, capture, target, factor);

    let mut result = SpliceResult { hidden, ..Default::default() };
    for obj in &capture.objects {
        let world = respliced_transform(obj.local_position, obj.local_rotation, obj.scale, target, factor);
        let id = spawn_prop(arena, obj.template.clone(), obj.category, world, level.player_content);
        if let Some(r) = arena.footprint_radius(id) {
            level.index.insert(world.translation, r, id);
        }
        result.props.push(id);
        result.categories.push(obj.category);
    }

    if let Some(terrain) = &capture.terrain {
        let positions = terrain.vertices.iter().map(|&v| target.to_world(v * factor)).collect();
        let mut mesh = TriMesh::new(positions, terrain.indices.clone(), Vec::new());
        mesh.recompute_planar_uvs();
        let kind = NodeKind::Terrain(TerrainNode { mesh: Arc::new(mesh), material: terrain.material.clone() });
        // Vertices are already in world space.
        result.fragment = Some(arena.spawn_at_world("terrain_fragment", kind, Transform::IDENTITY, Some(level.player_content)));
    }

    info!(
        "Photo: placed {} props{} at distance {:.1} (×{:.2}), hid {}",
        result.props.len(),
        if result.fragment.is_some() { " and a ground fragment" } else { "" },
        placement_distance,
        factor,
        result.hidden.len()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlacementSettings;
    use crate::core::PropTemplate;
    use crate::level::{Blueprint, GenerationMode, LevelGenerator, LevelLayout, TerrainTemplate};
    use crate::photo::capture::{CapturedObjectRecord, TerrainIntersectionRecord};
    use crate::photo::frustum::CaptureFrustum;
    use image::RgbImage;

    fn level(arena: &mut SceneArena) -> Level {
        let bp = Blueprint::new("target", LevelLayout::Park, TerrainTemplate::flat(200.0));
        LevelGenerator::new(PlacementSettings::default(), 5)
            .generate_level(arena, Arc::new(bp), Vec3::ZERO, GenerationMode::Painted)
            .unwrap()
    }

    fn one_object_capture(local: Vec3) -> Capture {
        Capture {
            image: RgbImage::new(1, 1),
            objects: vec![CapturedObjectRecord {
                template: Arc::new(PropTemplate::new("statue", Vec3::splat(0.5))),
                category: PropCategory::Landmark,
                local_position: local,
                local_rotation: Quat::IDENTITY,
                scale: Vec3::ONE,
            }],
            terrain: None,
            frustum: CaptureFrustum::new(50.0, 16.0, 9.0),
            camera: VirtualCamera::new(Transform::IDENTITY, 60.0),
        }
    }

    fn target() -> VirtualCamera {
        VirtualCamera::looking_at(Vec3::new(3.0, 2.0, -4.0), Vec3::new(3.0, 2.0, 10.0), 60.0)
    }

    #[test]
    fn reference_distance_reproduces_the_capture_exactly() {
        let mut arena = SceneArena::new();
        let mut lvl = level(&mut arena);
        let cap = one_object_capture(Vec3::new(0.0, 0.0, 20.0));
        let out = place_capture(&mut arena, &mut lvl, &cap, &target(), 10.0, 10.0);

        let world = arena.world_transform(out.props[0]).unwrap();
        assert!((world.translation - target().to_world(Vec3::new(0.0, 0.0, 20.0))).length() < 1e-3);
        assert!((world.scale - Vec3::ONE).length() < 1e-4);
        assert_eq!(out.categories, vec![PropCategory::Landmark]);
        assert!(arena.is_descendant_of(out.props[0], lvl.player_content));
        assert!(lvl.index.contains_owner(out.props[0]));
        assert!(out.fragment.is_none());
    }

    #[test]
    fn doubling_the_distance_doubles_offset_and_scale() {
        let local = Vec3::new(1.0, -0.5, 20.0);
        let cam = target();
        let near = respliced_transform(local, Quat::IDENTITY, Vec3::ONE, &cam, splice_factor(10.0, 10.0));
        let far = respliced_transform(local, Quat::IDENTITY, Vec3::ONE, &cam, splice_factor(20.0, 10.0));
        let (dn, df) = (near.translation - cam.position(), far.translation - cam.position());
        assert!((df.length() - 2.0 * dn.length()).abs() < 1e-3);
        assert!((far.scale - 2.0 * near.scale).length() < 1e-4);
    }

    #[test]
    fn zero_depth_object_still_scales_by_the_factor() {
        let t = respliced_transform(Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY, Vec3::splat(2.0), &target(), 3.0);
        assert!((t.scale - Vec3::splat(6.0)).length() < 1e-5);
    }

    #[test]
    fn fragment_is_rebuilt_with_planar_uvs() {
        let mut arena = SceneArena::new();
        let mut lvl = level(&mut arena);
        let mut cap = one_object_capture(Vec3::new(0.0, 0.0, 20.0));
        cap.objects.clear();
        cap.terrain = Some(TerrainIntersectionRecord {
            vertices: vec![Vec3::new(-2.0, -2.0, 10.0), Vec3::new(2.0, -2.0, 10.0), Vec3::new(0.0, -2.0, 14.0)],
            indices: vec![0, 1, 2],
            uvs: vec![Vec2::splat(0.3); 3],
            material: None,
        });
        let out = place_capture(&mut arena, &mut lvl, &cap, &target(), 20.0, 10.0);
        let frag = out.fragment.unwrap();
        let node = arena.get(frag).unwrap();
        let mesh = &node.as_terrain().unwrap().mesh;

        assert_eq!(mesh.indices, vec![0, 1, 2]);
        // Doubled: the apex is 28m down the view axis.
        assert!((mesh.positions[2] - target().to_world(Vec3::new(0.0, -4.0, 28.0))).length() < 1e-3);
        for uv in &mesh.uvs {
            assert!(uv.x >= -1e-5 && uv.x <= 1.0 + 1e-5 && uv.y >= -1e-5 && uv.y <= 1.0 + 1e-5);
        }
        assert!(mesh.uvs.iter().any(|uv| uv.x.abs() < 1e-5));
        assert!(mesh.bounds().is_some());
        assert!(arena.is_descendant_of(frag, lvl.player_content));
    }

    #[test]
    fn props_under_the_landing_cone_are_hidden_not_destroyed() {
        let mut arena = SceneArena::new();
        let mut lvl = level(&mut arena);
        let tpl = Arc::new(PropTemplate::new("bush", Vec3::splat(0.5)));
        let cam = target();
        let covered = spawn_prop(&mut arena, tpl.clone(), PropCategory::Small, Transform::from_translation(cam.to_world(Vec3::new(0.0, 0.0, 15.0))), lvl.root);
        let aside = spawn_prop(&mut arena, tpl.clone(), PropCategory::Small, Transform::from_translation(cam.to_world(Vec3::new(30.0, 0.0, 15.0))), lvl.root);
        let door = spawn_prop(&mut arena, tpl, PropCategory::Exit, Transform::from_translation(cam.to_world(Vec3::new(0.0, 0.0, 12.0))), lvl.root);

        let out = place_capture(&mut arena, &mut lvl, &one_object_capture(Vec3::new(0.0, 0.0, 20.0)), &cam, 10.0, 10.0);
        assert_eq!(out.hidden, vec![covered]);
        assert!(arena.contains(covered) && !arena.is_visible(covered));
        assert!(arena.is_visible(aside) && arena.is_visible(door));
        assert!(arena.is_visible(out.props[0]));
        assert_eq!(lvl.hidden, vec![covered]);
    }

    #[test]
    fn hidden_region_grows_with_the_placement_factor() {
        let mut arena = SceneArena::new();
        let mut lvl = level(&mut arena);
        let cam = target();
        let tpl = Arc::new(PropTemplate::new("bush", Vec3::splat(0.5)));
        // Past the frozen cone's 50 m depth, inside it once doubled.
        let far = spawn_prop(&mut arena, tpl, PropCategory::Small, Transform::from_translation(cam.to_world(Vec3::new(0.0, 0.0, 80.0))), lvl.root);
        let capture = one_object_capture(Vec3::new(0.0, 0.0, 40.0));

        assert!(hide_covered(&mut arena, &mut lvl, &capture, &cam, 1.0).is_empty());
        assert!(arena.is_visible(far));

        assert_eq!(hide_covered(&mut arena, &mut lvl, &capture, &cam, 2.0), vec![far]);
        assert!(!arena.is_visible(far));
    }
}
