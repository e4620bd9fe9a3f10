//! Vistaforge: procedural levels you paint before entering and reshape with photos.
//!
//! The core (scene, placement, level, paint, photo) is plain data and functions over a
//! `SceneArena`; `plugin` and `render` wire it into a Bevy app.

pub mod config;
pub mod core;
pub mod level;
pub mod paint;
pub mod photo;
pub mod placement;
pub mod plugin;
pub mod render;
pub mod scene;

pub use plugin::VistaforgePlugin;
