// src/photo/capture.rs
//! Capture engine: what a photo takes with it.

use bevy::prelude::*;
use image::{Rgb, RgbImage};
use std::sync::Arc;

use crate::core::{MaterialRef, PropCategory, PropTemplate};
use crate::scene::{NodeId, OverlapQuery, QueryFilter, SceneArena};
use super::frustum::{CaptureFrustum, VirtualCamera};

/// Uvs for a triangle whose source mesh has none.
const DEFAULT_TRIANGLE_UVS: [Vec2; 3] = [Vec2::ZERO, Vec2::X, Vec2::Y];
const SKY: Rgb<u8> = Rgb([196, 214, 230]);

/// A prop as seen from the capturing camera.
#[derive(Clone, Debug)]
pub struct CapturedObjectRecord {
    pub template: Arc<PropTemplate>,
    pub category: PropCategory,
    pub local_position: Vec3,
    pub local_rotation: Quat,
    pub scale: Vec3,
}

/// Ground triangles inside the cone, in view-frame coordinates.
#[derive(Clone, Debug, Default)]
pub struct TerrainIntersectionRecord {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub uvs: Vec<Vec2>,
    pub material: Option<MaterialRef>,
}

impl TerrainIntersectionRecord {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// One held photo. The frustum is frozen at capture time.
#[derive(Clone, Debug)]
pub struct Capture {
    pub image: RgbImage,
    pub objects: Vec<CapturedObjectRecord>,
    pub terrain: Option<TerrainIntersectionRecord>,
    pub frustum: CaptureFrustum,
    pub camera: VirtualCamera,
}

impl Capture {
    pub fn categories(&self) -> Vec<PropCategory> {
        self.objects.iter().map(|o| o.category).collect()
    }
}

/// Offscreen render of what the camera sees.
pub trait PhotoRenderer {
    fn render(&mut self, arena: &SceneArena, camera: &VirtualCamera, frustum: &CaptureFrustum, size: UVec2) -> RgbImage;
}

/// Flat sky with a coloured block per capturable prop, projected through the camera's fov.
#[derive(Clone, Copy, Debug, Default)]
pub struct SketchRenderer;

impl PhotoRenderer for SketchRenderer {
    fn render(&mut self, arena: &SceneArena, camera: &VirtualCamera, frustum: &CaptureFrustum, size: UVec2) -> RgbImage {
        let (w, h) = (size.x.max(1), size.y.max(1));
        let mut img = RgbImage::from_pixel(w, h, SKY);
        let focal = (h as f32 * 0.5) / (camera.fov_degrees.to_radians() * 0.5).tan().max(1e-3);

        for id in arena.overlap_sphere(camera.position(), frustum.height, QueryFilter::CAPTURABLE) {
            let (Some(node), Some(world)) = (arena.get(id), arena.world_transform(id)) else { continue };
            let Some(prop) = node.as_prop() else { continue };
            let local = camera.to_local(world.translation);
            if local.z <= f32::EPSILON {
                continue;
            }
            // View frame x runs to the camera's left.
            let cx = w as f32 * 0.5 - local.x / local.z * focal;
            let cy = h as f32 * 0.5 - local.y / local.z * focal;
            let half = (prop.template.half_extents.max_element() / local.z * focal).clamp(1.0, h as f32 * 0.25);

            let rgb = Color::hsv(prop.category.hue(), 0.8, 0.9).to_srgba();
            let color = Rgb([(rgb.red * 255.0) as u8, (rgb.green * 255.0) as u8, (rgb.blue * 255.0) as u8]);
            let x0 = (cx - half).max(0.0) as u32;
            let y0 = (cy - half).max(0.0) as u32;
            let x1 = ((cx + half).max(0.0) as u32).min(w);
            let y1 = ((cy + half).max(0.0) as u32).min(h);
            for y in y0..y1 {
                for x in x0..x1 {
                    img.put_pixel(x, y, color);
                }
            }
        }
        img
    }
}

/// Capturable props whose origin lies in the cone, with their handles.
/// Props at an identical view-frame position are kept once.
pub fn capture_objects(
    arena: &SceneArena,
    camera: &VirtualCamera,
    frustum: &CaptureFrustum,
) -> Vec<(NodeId, CapturedObjectRecord)> {
    let mut out: Vec<(NodeId, CapturedObjectRecord)> = Vec::new();
    for id in arena.overlap_sphere(camera.position(), frustum.height, QueryFilter::CAPTURABLE) {
        let (Some(node), Some(world)) = (arena.get(id), arena.world_transform(id)) else { continue };
        let Some(prop) = node.as_prop() else { continue };

        let local_position = camera.to_local(world.translation);
        if !frustum.contains_local(local_position) {
            continue;
        }
        if out.iter().any(|(_, r)| r.local_position == local_position) {
            continue;
        }
        out.push((
            id,
            CapturedObjectRecord {
                template: prop.template.clone(),
                category: prop.category,
                local_position,
                local_rotation: camera.rotation_to_local(world.rotation),
                scale: world.scale,
            },
        ));
    }
    out
}

/// Ground triangles touching the cone, flattened into one list (three fresh vertices each).
/// `None` when nothing touches.
pub fn capture_terrain(
    arena: &SceneArena,
    camera: &VirtualCamera,
    frustum: &CaptureFrustum,
) -> Option<TerrainIntersectionRecord> {
    let mut record = TerrainIntersectionRecord::default();

    for id in arena.overlap_sphere(camera.position(), frustum.height, QueryFilter::TERRAIN) {
        let (Some(node), Some(world)) = (arena.get(id), arena.world_transform(id)) else { continue };
        let Some(terrain) = node.as_terrain() else { continue };
        let mesh = &terrain.mesh;
        let has_uvs = mesh.uvs.len() == mesh.positions.len();
        if record.material.is_none() {
            record.material = terrain.material.clone();
        }

        for tri in mesh.triangles() {
            let Some(corners) = mesh.triangle_positions(tri) else { continue };
            let local = corners.map(|p| camera.to_local(world.transform_point(p)));
            if !frustum.touches_triangle_local(local) {
                continue;
            }
            let base = record.vertices.len() as u32;
            record.vertices.extend_from_slice(&local);
            record.indices.extend_from_slice(&[base, base + 1, base + 2]);
            if has_uvs {
                record.uvs.extend(tri.iter().map(|&i| mesh.uvs[i as usize]));
            } else {
                record.uvs.extend_from_slice(&DEFAULT_TRIANGLE_UVS);
            }
        }
    }

    (!record.indices.is_empty()).then_some(record)
}

/// Take a photo: render, then collect props and ground inside the cone.
pub fn capture_scene(
    arena: &SceneArena,
    camera: &VirtualCamera,
    frustum: CaptureFrustum,
    renderer: &mut dyn PhotoRenderer,
    size: UVec2,
) -> Capture {
    let image = renderer.render(arena, camera, &frustum, size);
    let objects: Vec<CapturedObjectRecord> =
        capture_objects(arena, camera, &frustum).into_iter().map(|(_, r)| r).collect();
    let terrain = capture_terrain(arena, camera, &frustum);

    info!(
        "Photo: captured {} props and {} ground triangles (frustum h={:.1})",
        objects.len(),
        terrain.as_ref().map_or(0, |t| t.triangle_count()),
        frustum.height
    );
    Capture { image, objects, terrain, frustum, camera: *camera }
}
