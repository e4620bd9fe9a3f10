//! Vistaforge plugin wiring (glue).
//! - Blueprint library asset/loader
//! - Scene arena + current level as resources
//! - Command events in, outcome events out
//! - Paint, photo and level systems

use bevy::prelude::*;

use crate::config::GameSettings;
use crate::level::{BlueprintAssetPlugin, BlueprintLibrary, GenerationMode, Level, LevelGenerator};
use crate::paint::{PaintSession, PaintSummary};
use crate::core::PropCategory;
use crate::photo::{PhotoSession, SketchRenderer, VirtualCamera};
use crate::render::RenderMirrorPlugin;
use crate::scene::{NodeId, SceneArena};

/// Levels are laid out along +X so a new one never overlaps the last.
const LEVEL_SPACING: f32 = 400.0;
/// Eye height above a teleport point.
const EYE_HEIGHT: f32 = 1.7;
/// How close the player must be to use an exit.
const INTERACTION_DISTANCE: f32 = 3.0;

#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameState {
    #[default]
    Exploring,
    Painting,
    Paused,
}

/// Where the blueprint manifest lives and how the generator is seeded.
#[derive(Resource, Clone)]
pub struct VistaSettings {
    pub library_path: String,
    pub seed: u64,
}
impl Default for VistaSettings {
    fn default() -> Self {
        Self { library_path: "levels/default.blueprints.ron".to_string(), seed: 1337 }
    }
}

#[derive(Resource, Default)]
pub struct BlueprintLibraryHandle(pub Handle<BlueprintLibrary>);

/// The authoritative scene and the level the player is in.
#[derive(Resource)]
pub struct VistaWorld {
    pub arena: SceneArena,
    pub level: Option<Level>,
    pub generator: LevelGenerator,
}

#[derive(Resource, Default)]
pub struct Painting(pub Option<PaintSession>);

#[derive(Resource)]
pub struct PhotoState(pub PhotoSession);

/// The camera photos are taken from and placed in front of.
#[derive(Component)]
pub struct PlayerCamera;

#[derive(Event, Clone, Copy, Debug, PartialEq)]
pub enum LevelCommand {
    Enter(GenerationMode),
    UseExit,
    Reset,
    Teleport,
}

#[derive(Event, Clone, Copy, Debug, PartialEq)]
pub enum PaintCommand {
    Category(PropCategory),
    Begin(Vec2),
    Extend(Vec2),
    Finish,
    Undo,
    ToggleEdit,
    Select(Vec2),
    Saturation(f32),
    Confirm,
}

#[derive(Event, Clone, Copy, Debug, PartialEq)]
pub enum PhotoCommand {
    Raise,
    Lower,
    Zoom(f32),
    Shoot,
    Place,
}

#[derive(Event, Clone, Debug)]
pub struct PaintingCompleted(pub PaintSummary);

#[derive(Event, Clone, Debug)]
pub struct PhotoPlaced {
    pub objects: usize,
    pub fragment: Option<NodeId>,
}

#[derive(Event, Clone, Copy, Debug)]
pub struct ExitOpened(pub NodeId);

pub struct VistaforgePlugin;
impl Plugin for VistaforgePlugin {
    fn build(&self, app: &mut App) {
        let settings = app.world().get_resource::<GameSettings>().cloned().unwrap_or_default();
        let seed = app.world().get_resource::<VistaSettings>().map_or(VistaSettings::default().seed, |s| s.seed);

        app.add_plugins((BlueprintAssetPlugin, RenderMirrorPlugin))
            .insert_resource(VistaWorld {
                arena: SceneArena::new(),
                level: None,
                generator: LevelGenerator::new(settings.placement.clone(), seed),
            })
            .insert_resource(PhotoState(PhotoSession::new(settings.capture.clone())))
            .insert_resource(settings)
            .init_resource::<VistaSettings>()
            .init_resource::<BlueprintLibraryHandle>()
            .init_resource::<Painting>()
            .init_state::<GameState>()
            .add_event::<LevelCommand>()
            .add_event::<PaintCommand>()
            .add_event::<PhotoCommand>()
            .add_event::<PaintingCompleted>()
            .add_event::<PhotoPlaced>()
            .add_event::<ExitOpened>()
            .add_systems(Startup, load_library)
            .add_systems(Update, (enter_first_level, handle_level_commands).chain())
            .add_systems(Update, handle_paint_commands.run_if(in_state(GameState::Painting)))
            .add_systems(
                Update,
                (handle_photo_commands, tick_photo_sequence).chain().run_if(in_state(GameState::Exploring)),
            );
    }
}

/// Startup: request the blueprint manifest.
fn load_library(mut handle: ResMut<BlueprintLibraryHandle>, settings: Res<VistaSettings>, assets: Res<AssetServer>) {
    if handle.0.is_strong() {
        return;
    }
    handle.0 = assets.load(settings.library_path.as_str());
    info!("Vistaforge: loading blueprints from '{}', seed={}", settings.library_path, settings.seed);
}

/// Update: once the library is in, generate the first level.
fn enter_first_level(
    handle: Res<BlueprintLibraryHandle>,
    libraries: Res<Assets<BlueprintLibrary>>,
    mut commands: EventWriter<LevelCommand>,
    mut requested: Local<bool>,
) {
    if *requested {
        return;
    }
    if let Some(library) = libraries.get(&handle.0) {
        *requested = true;
        info!("Vistaforge: {} blueprints ready", library.len());
        commands.write(LevelCommand::Enter(GenerationMode::BlueprintOnly));
    }
}

fn handle_level_commands(
    mut events: EventReader<LevelCommand>,
    mut world: ResMut<VistaWorld>,
    handle: Res<BlueprintLibraryHandle>,
    libraries: Res<Assets<BlueprintLibrary>>,
    settings: Res<GameSettings>,
    mut painting: ResMut<Painting>,
    mut next_state: ResMut<NextState<GameState>>,
    mut camera_q: Query<&mut Transform, With<PlayerCamera>>,
) {
    for cmd in events.read() {
        let mut camera = camera_q.single_mut().ok();
        let library = libraries.get(&handle.0);

        match *cmd {
            LevelCommand::Enter(mode) => {
                let Some(library) = library else {
                    warn!("Level: blueprint library not loaded yet");
                    continue;
                };
                enter_level(&mut world, library, mode, &settings, &mut painting, &mut next_state, camera.as_deref_mut());
            }
            LevelCommand::UseExit => {
                let (Some(library), Some(tf)) = (library, camera.as_deref_mut()) else { continue };
                if !near_exit(&world, tf.translation) {
                    continue;
                }
                // Doors lead to a level the player paints first.
                enter_level(&mut world, library, GenerationMode::Painted, &settings, &mut painting, &mut next_state, Some(tf));
            }
            LevelCommand::Reset => {
                let VistaWorld { arena, level, generator } = &mut *world;
                if let Some(lvl) = level.as_mut() {
                    generator.reset_level(arena, lvl);
                }
            }
            LevelCommand::Teleport => {
                let VistaWorld { arena, level, generator } = &mut *world;
                let (Some(lvl), Some(tf)) = (level.as_ref(), camera.as_deref_mut()) else { continue };
                tf.translation = generator.random_position_in_level(arena, lvl) + Vec3::Y * EYE_HEIGHT;
            }
        }
    }
}

/// Tear down the current level and generate the next one from the library.
fn enter_level(
    world: &mut VistaWorld,
    library: &BlueprintLibrary,
    mode: GenerationMode,
    settings: &GameSettings,
    painting: &mut Painting,
    next_state: &mut NextState<GameState>,
    camera: Option<&mut Transform>,
) {
    let VistaWorld { arena, level, generator } = world;
    let origin = Vec3::X * LEVEL_SPACING * generator.entry_count() as f32;
    // The old level stays until the new one exists, so a failure never strands the player.
    let new_level = match generator.spawn_level(arena, library, origin, mode) {
        Ok(l) => l,
        Err(e) => {
            error!("Level: generation failed, staying put: {e}");
            return;
        }
    };
    if let Some(old) = level.take() {
        old.teardown(arena);
    }
    painting.0 = None;
    if let Some(tf) = camera {
        tf.translation = generator.random_position_in_level(arena, &new_level) + Vec3::Y * EYE_HEIGHT;
    }
    if mode == GenerationMode::Painted {
        painting.0 = Some(PaintSession::start(settings.paint.clone(), &new_level));
        next_state.set(GameState::Painting);
    } else {
        next_state.set(GameState::Exploring);
    }
    *level = Some(new_level);
}

fn near_exit(world: &VistaWorld, eye: Vec3) -> bool {
    let Some(level) = world.level.as_ref() else { return false };
    level
        .exit
        .and_then(|e| world.arena.world_transform(e))
        .is_some_and(|t| t.translation.with_y(0.0).distance(eye.with_y(0.0)) <= INTERACTION_DISTANCE)
}

fn handle_paint_commands(
    mut events: EventReader<PaintCommand>,
    mut world: ResMut<VistaWorld>,
    mut painting: ResMut<Painting>,
    mut next_state: ResMut<NextState<GameState>>,
    mut completed: EventWriter<PaintingCompleted>,
    mut camera_q: Query<&mut Transform, With<PlayerCamera>>,
) {
    for cmd in events.read() {
        let VistaWorld { arena, level, generator } = &mut *world;
        let Some(level) = level.as_mut() else { return };

        if *cmd == PaintCommand::Confirm {
            let Some(session) = painting.0.take() else { continue };
            completed.write(PaintingCompleted(session.confirm(arena, level, generator)));
            if let Ok(mut tf) = camera_q.single_mut() {
                tf.translation = generator.random_position_in_level(arena, level) + Vec3::Y * EYE_HEIGHT;
            }
            next_state.set(GameState::Exploring);
            continue;
        }

        let Some(session) = painting.0.as_mut() else { continue };
        match *cmd {
            PaintCommand::Category(c) => {
                session.canvas.set_category(c);
            }
            PaintCommand::Begin(p) => {
                session.canvas.begin_stroke(p);
            }
            PaintCommand::Extend(p) => {
                session.on_stroke_moved(p, arena, level, generator);
            }
            PaintCommand::Finish => {
                session.on_line_finished(arena, level, generator);
            }
            PaintCommand::Undo => {
                session.undo_last_line(arena, level);
            }
            PaintCommand::ToggleEdit => {
                session.canvas.toggle_edit_mode();
            }
            PaintCommand::Select(p) => {
                session.canvas.select_line_at(p);
            }
            PaintCommand::Saturation(s) => {
                session.edit_selected_saturation(s, arena, level, generator);
            }
            PaintCommand::Confirm => {}
        }
    }
}

fn handle_photo_commands(
    mut events: EventReader<PhotoCommand>,
    mut world: ResMut<VistaWorld>,
    mut photo: ResMut<PhotoState>,
    settings: Res<GameSettings>,
    camera_q: Query<&Transform, With<PlayerCamera>>,
    mut placed: EventWriter<PhotoPlaced>,
    mut opened: EventWriter<ExitOpened>,
) {
    for cmd in events.read() {
        match *cmd {
            PhotoCommand::Raise => {
                photo.0.raise();
            }
            PhotoCommand::Lower => photo.0.lower(),
            PhotoCommand::Zoom(delta) => photo.0.zoom(delta),
            PhotoCommand::Shoot => {
                if let Err(e) = photo.0.begin_photo() {
                    debug!("Photo: {e}");
                }
            }
            PhotoCommand::Place => {
                let Ok(tf) = camera_q.single() else { continue };
                let VistaWorld { arena, level, generator } = &mut *world;
                let Some(level) = level.as_mut() else { continue };
                let target = VirtualCamera::new(*tf, photo.0.fov());

                let result = match photo.0.place(arena, level, &target) {
                    Ok(r) => r,
                    Err(e) => {
                        debug!("Photo: {e}");
                        continue;
                    }
                };
                placed.write(PhotoPlaced { objects: result.props.len(), fragment: result.fragment });
                match generator.on_photo_placed(arena, level, &result.categories, result.fragment, &settings.progress) {
                    Ok(Some(frame)) => {
                        opened.write(ExitOpened(frame));
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Level: no room for the frame: {e}"),
                }
            }
        }
    }
}

fn tick_photo_sequence(
    time: Res<Time>,
    world: Res<VistaWorld>,
    mut photo: ResMut<PhotoState>,
    camera_q: Query<&Transform, With<PlayerCamera>>,
) {
    if photo.0.sequence().is_none() {
        return;
    }
    let Ok(tf) = camera_q.single() else { return };
    let camera = VirtualCamera::new(*tf, photo.0.fov());
    photo.0.tick(time.delta_secs(), &world.arena, &camera, &mut SketchRenderer);
}
