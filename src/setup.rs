use bevy::prelude::*;
use vistaforge::plugin::PlayerCamera;

use crate::input::{CameraLook, DEFAULT_FOV_DEGREES};

pub fn setup(mut commands: Commands) {
    // 1) Light
    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            illuminance: 9_000.0,
            ..default()
        },
        Transform::from_xyz(30.0, 60.0, 20.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    // 2) Camera; the level generator drops it on a safe spot on entry
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection { fov: DEFAULT_FOV_DEGREES.to_radians(), ..default() }),
        Transform::from_xyz(0.0, 1.7, 0.0),
        PlayerCamera,
        CameraLook { yaw: 0.0, pitch: 0.0 },
    ));
}
