use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use vistaforge::config::GameSettings;
use vistaforge::core::PropCategory;
use vistaforge::photo::CameraMode;
use vistaforge::plugin::{GameState, LevelCommand, PaintCommand, Painting, PhotoCommand, PhotoState, PlayerCamera, VistaWorld};

use crate::actions::{ActionState, PlayerAction};
use crate::ui::CANVAS_OFFSET;

const EYE_HEIGHT: f32 = 1.7;

pub const MOVE_SPEED: f32 = 6.0;
pub const ROTATE_SPEED: f32 = 0.2;
pub const MAX_CAMERA_DT: f32 = 0.05; // never use a dt larger than 50ms
pub const SATURATION_STEP: f32 = 0.1;
pub const DEFAULT_FOV_DEGREES: f32 = 60.0;

#[derive(Component)]
pub struct CameraLook {
    pub yaw: f32,
    pub pitch: f32,
}

pub fn input_mapping_system(
    keys: Res<ButtonInput<KeyCode>>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mut action_state: ResMut<ActionState>,
) {
    action_state.set(PlayerAction::MoveForward, keys.pressed(KeyCode::KeyW));
    action_state.set(PlayerAction::MoveBackward, keys.pressed(KeyCode::KeyS));
    action_state.set(PlayerAction::MoveLeft, keys.pressed(KeyCode::KeyA));
    action_state.set(PlayerAction::MoveRight, keys.pressed(KeyCode::KeyD));
    action_state.set(PlayerAction::RaiseCamera, mouse_buttons.pressed(MouseButton::Right));
    action_state.set(PlayerAction::Primary, mouse_buttons.pressed(MouseButton::Left));
}

pub fn pause_toggle_system(
    keys: Res<ButtonInput<KeyCode>>,
    mut next_state: ResMut<NextState<GameState>>,
    current_state: Res<State<GameState>>,
    mut before_pause: Local<Option<GameState>>,
) {
    if !keys.just_pressed(KeyCode::Escape) {
        return;
    }
    match current_state.get() {
        GameState::Paused => {
            next_state.set(before_pause.take().unwrap_or(GameState::Exploring));
            info!("Resumed game");
        }
        other => {
            *before_pause = Some(*other);
            next_state.set(GameState::Paused);
            info!("Paused game");
        }
    }
}

/// Walk on the ground plane, look with the middle mouse button.
pub fn camera_controller(
    time: Res<Time>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mut motion_evr: EventReader<MouseMotion>,
    action_state: Res<ActionState>,
    world: Res<VistaWorld>,
    settings: Res<GameSettings>,
    mut query: Query<(&mut Transform, &mut CameraLook), With<PlayerCamera>>,
) {
    use vistaforge::scene::SurfaceProbe;

    let dt = time.delta_secs().min(MAX_CAMERA_DT);
    let Ok((mut tf, mut look)) = query.single_mut() else { return; };

    if mouse_buttons.pressed(MouseButton::Middle) {
        for ev in motion_evr.read() {
            look.yaw -= ev.delta.x * ROTATE_SPEED * dt;
            look.pitch -= ev.delta.y * ROTATE_SPEED * dt;
        }
    } else {
        motion_evr.clear();
    }
    look.pitch = look.pitch.clamp(
        -std::f32::consts::FRAC_PI_2 + 0.01,
        std::f32::consts::FRAC_PI_2 - 0.01,
    );
    tf.rotation = Quat::from_euler(EulerRot::YXZ, look.yaw, look.pitch, 0.0);

    let forward = tf.forward().with_y(0.0).normalize_or_zero();
    let right = tf.right().with_y(0.0).normalize_or_zero();
    let mut dir = Vec3::ZERO;
    if action_state.pressed(PlayerAction::MoveForward) { dir += forward; }
    if action_state.pressed(PlayerAction::MoveBackward) { dir -= forward; }
    if action_state.pressed(PlayerAction::MoveLeft) { dir -= right; }
    if action_state.pressed(PlayerAction::MoveRight) { dir += right; }
    if dir != Vec3::ZERO {
        tf.translation += dir.normalize() * MOVE_SPEED * dt;
    }

    // Keep the eye above whatever is underfoot (terrain or spliced fragments).
    let probe_from = tf.translation + Vec3::Y * settings.placement.probe_height;
    if let Some(hit) = world.arena.probe_down(probe_from, settings.placement.probe_distance) {
        tf.translation.y = hit.point.y + EYE_HEIGHT;
    }
}

pub fn level_input_system(keys: Res<ButtonInput<KeyCode>>, mut commands: EventWriter<LevelCommand>) {
    if keys.just_pressed(KeyCode::KeyE) {
        commands.write(LevelCommand::UseExit);
    }
    if keys.just_pressed(KeyCode::KeyR) {
        commands.write(LevelCommand::Reset);
    }
    if keys.just_pressed(KeyCode::KeyT) {
        commands.write(LevelCommand::Teleport);
    }
}

pub fn photo_input_system(
    action_state: Res<ActionState>,
    photo: Res<PhotoState>,
    mut scroll_evr: EventReader<MouseWheel>,
    mut commands: EventWriter<PhotoCommand>,
) {
    if action_state.just_pressed(PlayerAction::RaiseCamera) {
        commands.write(PhotoCommand::Raise);
    }
    if action_state.just_released(PlayerAction::RaiseCamera) {
        commands.write(PhotoCommand::Lower);
    }

    for ev in scroll_evr.read() {
        let amount = match ev.unit {
            MouseScrollUnit::Line => ev.y,
            MouseScrollUnit::Pixel => ev.y * 0.02,
        };
        commands.write(PhotoCommand::Zoom(amount));
    }

    if action_state.just_pressed(PlayerAction::Primary) {
        match photo.0.mode() {
            CameraMode::Aiming => {
                commands.write(PhotoCommand::Shoot);
            }
            CameraMode::Placing => {
                commands.write(PhotoCommand::Place);
            }
            CameraMode::Idle => {}
        }
    }
}

pub fn paint_input_system(
    keys: Res<ButtonInput<KeyCode>>,
    action_state: Res<ActionState>,
    painting: Res<Painting>,
    window_q: Query<&Window, With<PrimaryWindow>>,
    mut commands: EventWriter<PaintCommand>,
) {
    let Some(session) = painting.0.as_ref() else { return; };
    let canvas = &session.canvas;

    for (key, category) in [
        (KeyCode::Digit1, PropCategory::Landmark),
        (KeyCode::Digit2, PropCategory::Large),
        (KeyCode::Digit3, PropCategory::Small),
    ] {
        if keys.just_pressed(key) {
            commands.write(PaintCommand::Category(category));
        }
    }
    if keys.just_pressed(KeyCode::KeyZ) {
        commands.write(PaintCommand::Undo);
    }
    if keys.just_pressed(KeyCode::Tab) {
        commands.write(PaintCommand::ToggleEdit);
    }
    if keys.just_pressed(KeyCode::ArrowUp) {
        commands.write(PaintCommand::Saturation(canvas.saturation() + SATURATION_STEP));
    }
    if keys.just_pressed(KeyCode::ArrowDown) {
        commands.write(PaintCommand::Saturation(canvas.saturation() - SATURATION_STEP));
    }
    if keys.just_pressed(KeyCode::Enter) {
        commands.write(PaintCommand::Confirm);
    }

    let cursor = window_q
        .single()
        .ok()
        .and_then(|w| w.cursor_position())
        .map(|p| p - CANVAS_OFFSET);

    if action_state.just_released(PlayerAction::Primary) && canvas.is_drawing() {
        commands.write(PaintCommand::Finish);
    }
    let Some(point) = cursor else {
        // Cursor left the window mid-stroke.
        if canvas.is_drawing() {
            commands.write(PaintCommand::Finish);
        }
        return;
    };
    if action_state.just_pressed(PlayerAction::Primary) {
        if canvas.is_edit_mode() {
            commands.write(PaintCommand::Select(point));
        } else {
            commands.write(PaintCommand::Begin(point));
        }
    } else if action_state.pressed(PlayerAction::Primary) && canvas.is_drawing() {
        commands.write(PaintCommand::Extend(point));
    }
}

/// Narrow the real camera to the photo fov while aiming.
pub fn sync_camera_fov(photo: Res<PhotoState>, mut query: Query<&mut Projection, With<PlayerCamera>>) {
    if !photo.is_changed() {
        return;
    }
    let fov = match photo.0.mode() {
        CameraMode::Aiming => photo.0.fov(),
        _ => DEFAULT_FOV_DEGREES,
    };
    for mut projection in &mut query {
        if let Projection::Perspective(p) = projection.as_mut() {
            p.fov = fov.to_radians();
        }
    }
}
