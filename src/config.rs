// src/config.rs
//! Named numeric knobs for placement, capture, painting and progression.
//! Every struct is `#[serde(default)]`, so a partial RON file only overrides what it names.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Safe-position search and level population.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementSettings {
    /// Attempts per ordinary prop.
    pub max_attempts: u32,
    /// Attempts per exit (door/frame) search round.
    pub exit_max_attempts: u32,
    /// Probe ray starts this far above the candidate.
    pub probe_height: f32,
    /// Max probe ray length.
    pub probe_distance: f32,
    /// Added on top of radii + clearance in every overlap test.
    pub safety_margin: f32,
    /// Fraction of terrain radius used for landmark/large props.
    pub large_spawn_fraction: f32,
    /// Fraction of terrain radius used for the exit.
    pub exit_spawn_fraction: f32,
    /// Extra exit rounds after the first one fails.
    pub exit_retry_rounds: u32,
    /// Radius multiplier applied per exit retry round.
    pub exit_radius_growth: f32,
    /// Clearance used when looking for a teleport point.
    pub teleport_clearance: f32,
    pub player_radius: f32,
    /// +/- distance jitter of park rock lines.
    pub radial_jitter: f32,
    /// Half-extent used when a level has no terrain bounds.
    pub fallback_radius: f32,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            exit_max_attempts: 100,
            probe_height: 5.0,
            probe_distance: 15.0,
            safety_margin: 0.5,
            large_spawn_fraction: 0.8,
            exit_spawn_fraction: 0.9,
            exit_retry_rounds: 3,
            exit_radius_growth: 1.2,
            teleport_clearance: 2.0,
            player_radius: 0.5,
            radial_jitter: 2.0,
            fallback_radius: 10.0,
        }
    }
}

/// Capture frustum, zoom bounds and splice scaling.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub frustum_height: f32,
    pub base_width: f32,
    pub base_height: f32,
    pub min_fov: f32,
    pub max_fov: f32,
    pub min_frustum_height: f32,
    pub max_frustum_height: f32,
    pub zoom_sensitivity: f32,
    pub min_placement_distance: f32,
    pub max_placement_distance: f32,
    pub placement_zoom_step: f32,
    /// Placement distance at which a capture is re-inserted at 1:1 scale.
    pub reference_distance: f32,
    pub fade_out_secs: f32,
    pub fade_in_secs: f32,
    pub photo_width: u32,
    pub photo_height: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            frustum_height: 50.0,
            base_width: 16.0,
            base_height: 9.0,
            min_fov: 30.0,
            max_fov: 80.0,
            min_frustum_height: 30.0,
            max_frustum_height: 80.0,
            zoom_sensitivity: 10.0,
            min_placement_distance: 5.0,
            max_placement_distance: 100.0,
            placement_zoom_step: 2.0,
            reference_distance: 10.0,
            fade_out_secs: 0.2,
            fade_in_secs: 0.3,
            photo_width: 320,
            photo_height: 180,
        }
    }
}

/// Paint canvas and stroke conversion.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PaintSettings {
    /// Square canvas resolution in pixels.
    pub canvas_size: u32,
    pub brush_size: u32,
    /// Placements per canvas unit of stroke length.
    pub density_per_unit: f32,
    /// Max radial jitter in normalized canvas units.
    pub jitter: f32,
    /// Line pick radius, in brush sizes.
    pub select_threshold: f32,
    pub min_saturation: f32,
    pub max_saturation: f32,
}

impl Default for PaintSettings {
    fn default() -> Self {
        Self {
            canvas_size: 512,
            brush_size: 20,
            density_per_unit: 0.1,
            jitter: 0.02,
            select_threshold: 1.5,
            min_saturation: 0.1,
            max_saturation: 1.0,
        }
    }
}

/// Exit-portal trigger after photo placements.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressSettings {
    pub min_objects_in_capture: usize,
    pub min_total_placements: u32,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self { min_objects_in_capture: 5, min_total_placements: 3 }
    }
}

#[derive(Resource, Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub placement: PlacementSettings,
    pub capture: CaptureSettings,
    pub paint: PaintSettings,
    pub progress: ProgressSettings,
}

impl GameSettings {
    pub fn from_ron_str(text: &str) -> Result<Self, SettingsError> {
        ron::de::from_str(text).map_err(|e| SettingsError::Ron(e.to_string()))
    }

    /// Read overrides from disk; callers usually fall back to `default()` on error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("I/O while reading settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_ron_keeps_defaults() {
        let s = GameSettings::from_ron_str("(placement: (max_attempts: 7), paint: (brush_size: 4))").unwrap();
        assert_eq!(s.placement.max_attempts, 7);
        assert_eq!(s.placement.exit_max_attempts, 100);
        assert_eq!(s.paint.brush_size, 4);
        assert_eq!(s.capture.reference_distance, 10.0);
    }

    #[test]
    fn bad_ron_is_reported() {
        assert!(matches!(GameSettings::from_ron_str("(placement: ("), Err(SettingsError::Ron(_))));
    }
}
