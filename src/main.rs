use bevy::input::InputSystem;
use bevy::prelude::*;

mod actions;
mod input;
mod setup;
mod ui;

use actions::ActionState;
use input::{
    camera_controller, input_mapping_system, level_input_system, paint_input_system, pause_toggle_system,
    photo_input_system, sync_camera_fov,
};
use ui::{
    despawn_paint_canvas, despawn_pause_overlay, spawn_hud, spawn_paint_canvas, spawn_pause_overlay,
    update_fade_overlay, update_held_photo, update_hud, update_paint_canvas,
};
use vistaforge::config::GameSettings;
use vistaforge::plugin::{GameState, VistaSettings};
use vistaforge::VistaforgePlugin;

const SETTINGS_PATH: &str = "assets/settings.ron";

fn main() {
    // Logging only starts with the app, so report a bad settings file from a startup system.
    let (settings, settings_error) = match GameSettings::load(SETTINGS_PATH) {
        Ok(s) => (s, None),
        Err(e) => (GameSettings::default(), Some(e.to_string())),
    };

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window { title: "Vistaforge".into(), ..default() }),
            ..default()
        }))
        .insert_resource(settings)
        .insert_resource(VistaSettings::default())
        .add_plugins(VistaforgePlugin)
        .init_resource::<ActionState>()
        .add_systems(Startup, (setup::setup, spawn_hud))
        .add_systems(Startup, move || {
            if let Some(e) = &settings_error {
                warn!("Settings: using defaults, could not read {SETTINGS_PATH}: {e}");
            }
        })
        // pause menu
        .add_systems(OnEnter(GameState::Paused), spawn_pause_overlay)
        .add_systems(OnExit(GameState::Paused), despawn_pause_overlay)
        // paint canvas
        .add_systems(OnEnter(GameState::Painting), spawn_paint_canvas)
        .add_systems(OnExit(GameState::Painting), despawn_paint_canvas)
        // input each frame; the plugin reads the commands later in Update
        .add_systems(PreUpdate, input_mapping_system.after(InputSystem))
        .add_systems(Update, pause_toggle_system)
        .add_systems(
            Update,
            (camera_controller, level_input_system, photo_input_system).run_if(in_state(GameState::Exploring)),
        )
        .add_systems(Update, paint_input_system.run_if(in_state(GameState::Painting)))
        .add_systems(
            Update,
            (update_hud, update_fade_overlay, update_held_photo, update_paint_canvas, sync_camera_fov),
        )
        .run();
}
