// src/level/mod.rs
//! Blueprints, level generation and completion tracking.

pub mod blueprint;
pub mod generator;
pub mod progress;

pub use blueprint::{
    Blueprint, BlueprintAssetPlugin, BlueprintLibrary, BlueprintLoadError, CategorySpec, LevelLayout, TerrainTemplate,
};
pub use generator::{facing_away, spawn_prop, GenerationMode, Level, LevelError, LevelGenerator, PLAYER_CONTENT};
pub use progress::LevelProgress;
