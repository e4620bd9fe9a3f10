// src/render.rs
//! Mirrors the scene arena into Bevy entities.
//! Bundle-free: we add components explicitly (Transform, Visibility, Mesh3d, ...).

use bevy::pbr::MeshMaterial3d;
use bevy::prelude::*;
use std::collections::HashMap;

use crate::core::{MaterialRef, PropTemplate};
use crate::plugin::VistaWorld;
use crate::scene::{NodeId, NodeKind};

/// Tag on every entity that stands in for an arena node.
#[derive(Component, Debug, Clone, Copy)]
pub struct MirroredNode(pub NodeId);

#[derive(Resource, Default)]
pub struct RenderMirror {
    entities: HashMap<NodeId, Entity>,
}

impl RenderMirror {
    pub fn entity(&self, id: NodeId) -> Option<Entity> {
        self.entities.get(&id).copied()
    }
}

pub struct RenderMirrorPlugin;
impl Plugin for RenderMirrorPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RenderMirror>().add_systems(PostUpdate, sync_render_mirror);
    }
}

/// PostUpdate: spawn new nodes, drop dead ones, copy pose + visibility.
pub fn sync_render_mirror(
    mut commands: Commands,
    world: Res<VistaWorld>,
    mut mirror: ResMut<RenderMirror>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut nodes_q: Query<(&mut Transform, &mut Visibility), With<MirroredNode>>,
) {
    if !world.is_changed() {
        return;
    }
    let arena = &world.arena;

    let dead: Vec<NodeId> = mirror.entities.keys().filter(|id| !arena.contains(**id)).copied().collect();
    for id in dead {
        if let Some(e) = mirror.entities.remove(&id) {
            // Children go with their parent; tolerate them already being gone.
            commands.entity(e).try_despawn();
        }
    }

    // Parents are always older than their children, so id order spawns them first.
    let mut ids: Vec<NodeId> = arena.iter().map(|(id, _)| id).collect();
    ids.sort();

    for id in ids {
        let Some(node) = arena.get(id) else { continue };
        let visibility = if node.visible { Visibility::Inherited } else { Visibility::Hidden };

        if let Some(e) = mirror.entity(id) {
            if let Ok((mut tf, mut vis)) = nodes_q.get_mut(e) {
                tf.set_if_neq(node.local);
                vis.set_if_neq(visibility);
            }
            continue;
        }

        let mut e = commands.spawn((node.local, visibility, MirroredNode(id), Name::new(node.name.clone())));
        match &node.kind {
            NodeKind::Group => {}
            NodeKind::Terrain(t) => {
                e.insert((
                    Mesh3d(meshes.add(t.mesh.to_mesh())),
                    MeshMaterial3d(materials.add(terrain_material(t.material.as_ref()))),
                ));
            }
            NodeKind::Prop(p) => {
                e.insert((
                    Mesh3d(meshes.add(prop_mesh(&p.template))),
                    MeshMaterial3d(materials.add(StandardMaterial {
                        base_color: Color::hsv(p.category.hue(), 0.55, 0.8),
                        perceptual_roughness: 0.9,
                        ..default()
                    })),
                ));
            }
        }
        if let Some(parent) = node.parent().and_then(|p| mirror.entity(p)) {
            e.insert(ChildOf(parent));
        }
        let entity = e.id();
        mirror.entities.insert(id, entity);
    }
}

/// Box of the template's bounds, sitting on the pivot.
fn prop_mesh(template: &PropTemplate) -> Mesh {
    Mesh::from(Cuboid::from_size(template.half_extents * 2.0)).translated_by(template.local_center(Vec3::ONE))
}

fn terrain_material(material: Option<&MaterialRef>) -> StandardMaterial {
    let base_color = match material.map(|m| m.0.as_str()) {
        Some("grass") => Color::srgb(0.36, 0.55, 0.28),
        Some("moss") => Color::srgb(0.25, 0.40, 0.22),
        Some("sand") => Color::srgb(0.76, 0.70, 0.50),
        _ => Color::srgb(0.5, 0.5, 0.5),
    };
    StandardMaterial { base_color, perceptual_roughness: 1.0, ..default() }
}
