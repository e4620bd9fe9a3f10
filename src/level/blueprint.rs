// src/level/blueprint.rs
//! Data-driven level blueprints + loader.

use bevy::asset::{io::Reader, AssetLoader, LoadContext};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{MaterialRef, PropCategory, PropTemplate};
use crate::scene::TriMesh;

// ---------- Public plugin to register asset+loader ----------

pub struct BlueprintAssetPlugin;

impl Plugin for BlueprintAssetPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<BlueprintLibrary>()
            .register_asset_loader(BlueprintLibraryLoader);
    }
}

/// Which hand-written population rules a level uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelLayout {
    /// Landmark at the centre, radial rock lines, scattered props.
    #[default]
    Park,
    /// Everything scattered by count.
    Forest,
}

// ---------- Terrain (data form) ----------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TerrainTemplate {
    /// Ground-plane size in meters (x, z).
    pub size: Vec2,
    #[serde(default = "default_resolution")]
    pub resolution: UVec2,
    /// Amplitude of the rolling height field; 0 gives a flat plate.
    #[serde(default)]
    pub relief: f32,
    #[serde(default = "default_wavelength")]
    pub wavelength: f32,
    #[serde(default)]
    pub material: Option<MaterialRef>,
}

fn default_resolution() -> UVec2 {
    UVec2::splat(32)
}
fn default_wavelength() -> f32 {
    24.0
}

impl TerrainTemplate {
    pub fn flat(size: f32) -> Self {
        Self {
            size: Vec2::splat(size),
            resolution: default_resolution(),
            relief: 0.0,
            wavelength: default_wavelength(),
            material: None,
        }
    }

    pub fn build_mesh(&self) -> TriMesh {
        let k = std::f32::consts::TAU / self.wavelength.max(f32::EPSILON);
        let relief = self.relief;
        TriMesh::grid(self.size, self.resolution, move |x, z| relief * (x * k).sin() * (z * k).cos())
    }
}

// ---------- Per-category population ----------

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorySpec {
    pub templates: Vec<PropTemplate>,
    /// Fixed count for blueprint-only generation.
    pub count: u32,
    /// Extra spacing kept to every other placement.
    pub clearance: f32,
    /// Paint units available for this category on the canvas.
    pub paint_budget: u32,
}

impl CategorySpec {
    pub fn has_templates(&self) -> bool {
        !self.templates.is_empty()
    }
}

// ---------- Blueprint ----------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Blueprint {
    /// Unique human-readable name (used for lookup).
    pub name: String,
    #[serde(default)]
    pub layout: LevelLayout,
    pub terrain: TerrainTemplate,
    #[serde(default)]
    pub landmark: CategorySpec,
    #[serde(default)]
    pub large: CategorySpec,
    #[serde(default)]
    pub small: CategorySpec,
    /// Door leading out of a generated level.
    #[serde(default)]
    pub exit: Option<PropTemplate>,
    #[serde(default = "default_exit_clearance")]
    pub exit_clearance: f32,
    /// Frame that appears on a spliced fragment once the level is solved.
    #[serde(default)]
    pub frame: Option<PropTemplate>,
    #[serde(default = "default_allow_randomness")]
    pub allow_randomness: bool,
}

fn default_exit_clearance() -> f32 {
    2.0
}
fn default_allow_randomness() -> bool {
    true
}

impl Blueprint {
    pub fn new(name: impl Into<String>, layout: LevelLayout, terrain: TerrainTemplate) -> Self {
        Self {
            name: name.into(),
            layout,
            terrain,
            landmark: CategorySpec::default(),
            large: CategorySpec::default(),
            small: CategorySpec::default(),
            exit: None,
            exit_clearance: default_exit_clearance(),
            frame: None,
            allow_randomness: true,
        }
    }

    /// Spec for a paintable category; `Exit` has none.
    pub fn category(&self, category: PropCategory) -> Option<&CategorySpec> {
        match category {
            PropCategory::Landmark => Some(&self.landmark),
            PropCategory::Large => Some(&self.large),
            PropCategory::Small => Some(&self.small),
            PropCategory::Exit => None,
        }
    }

    pub fn paint_budget(&self, category: PropCategory) -> u32 {
        self.category(category).map_or(0, |c| c.paint_budget)
    }

    /// Template used when the level is solved: the frame, or the door if none is set.
    pub fn frame_template(&self) -> Option<&PropTemplate> {
        self.frame.as_ref().or(self.exit.as_ref())
    }
}

// ---------- Runtime library asset ----------

#[derive(Asset, TypePath, Clone, Debug)]
pub struct BlueprintLibrary {
    /// Ordered; levels cycle through this list.
    pub blueprints: Vec<Arc<Blueprint>>,
    /// Name → index for quick lookups.
    pub name_to_index: HashMap<String, usize>,
}

impl BlueprintLibrary {
    pub fn from_blueprints(defs: Vec<Blueprint>) -> Result<Self, BlueprintLoadError> {
        if defs.is_empty() {
            return Err(BlueprintLoadError::EmptyLibrary);
        }
        let mut name_to_index = HashMap::with_capacity(defs.len());
        for (i, def) in defs.iter().enumerate() {
            if let Some(prev) = name_to_index.insert(def.name.clone(), i) {
                return Err(BlueprintLoadError::DuplicateName { name: def.name.clone(), first: prev, second: i });
            }
        }
        Ok(Self { blueprints: defs.into_iter().map(Arc::new).collect(), name_to_index })
    }

    pub fn from_ron_bytes(bytes: &[u8]) -> Result<Self, BlueprintLoadError> {
        let defs: Vec<Blueprint> =
            ron::de::from_bytes(bytes).map_err(|e| BlueprintLoadError::Ron(e.to_string()))?;
        Self::from_blueprints(defs)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Blueprint>> {
        self.name_to_index.get(name).and_then(|&i| self.blueprints.get(i))
    }

    /// Blueprint for the n-th level entry, cycling through the list.
    pub fn cycle(&self, entry: u32) -> Option<&Arc<Blueprint>> {
        if self.blueprints.is_empty() {
            return None;
        }
        self.blueprints.get(entry as usize % self.blueprints.len())
    }

    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }
}

// ---------- Asset loader for `.blueprints.ron` ----------

#[derive(Default)]
pub struct BlueprintLibraryLoader;

impl AssetLoader for BlueprintLibraryLoader {
    type Asset = BlueprintLibrary;
    type Settings = ();
    type Error = BlueprintLoadError;

    fn extensions(&self) -> &[&str] {
        &["blueprints.ron"]
    }

    async fn load(
        &self,
        reader: &mut dyn Reader,
        _settings: &Self::Settings,
        _load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        BlueprintLibrary::from_ron_bytes(&bytes)
    }
}

// ---------- Loader errors ----------

#[derive(thiserror::Error, Debug)]
pub enum BlueprintLoadError {
    #[error("I/O while reading blueprints: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(String),
    #[error("Duplicate blueprint name '{name}' (first idx {first}, second idx {second})")]
    DuplicateName { name: String, first: usize, second: usize },
    #[error("Blueprint library is empty")]
    EmptyLibrary,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_LIBRARY: &str = include_str!("../../assets/levels/default.blueprints.ron");

    #[test]
    fn bundled_library_parses() {
        let lib = BlueprintLibrary::from_ron_bytes(DEFAULT_LIBRARY.as_bytes()).unwrap();
        assert!(lib.len() >= 2);
        let park = lib.get("park").unwrap();
        assert_eq!(park.layout, LevelLayout::Park);
        assert!(park.large.has_templates());
        assert!(park.paint_budget(PropCategory::Small) > 0);
        assert_eq!(park.paint_budget(PropCategory::Exit), 0);
    }

    #[test]
    fn minimal_blueprint_uses_defaults() {
        let text = r#"[(name: "bare", terrain: (size: (40.0, 40.0)))]"#;
        let lib = BlueprintLibrary::from_ron_bytes(text.as_bytes()).unwrap();
        let bp = &lib.blueprints[0];
        assert_eq!(bp.layout, LevelLayout::Park);
        assert!(bp.allow_randomness);
        assert_eq!(bp.exit_clearance, 2.0);
        assert!(!bp.small.has_templates());
        assert!(bp.frame_template().is_none());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let text = r#"[
            (name: "a", terrain: (size: (10.0, 10.0))),
            (name: "a", terrain: (size: (20.0, 20.0))),
        ]"#;
        let err = BlueprintLibrary::from_ron_bytes(text.as_bytes()).unwrap_err();
        assert!(matches!(err, BlueprintLoadError::DuplicateName { first: 0, second: 1, .. }));
    }

    #[test]
    fn empty_library_is_an_error() {
        assert!(matches!(BlueprintLibrary::from_ron_bytes(b"[]"), Err(BlueprintLoadError::EmptyLibrary)));
    }

    #[test]
    fn cycle_wraps_around() {
        let lib = BlueprintLibrary::from_blueprints(vec![
            Blueprint::new("a", LevelLayout::Park, TerrainTemplate::flat(10.0)),
            Blueprint::new("b", LevelLayout::Forest, TerrainTemplate::flat(10.0)),
        ])
        .unwrap();
        assert_eq!(lib.cycle(0).unwrap().name, "a");
        assert_eq!(lib.cycle(3).unwrap().name, "b");
    }

    #[test]
    fn terrain_template_spans_its_size() {
        let mesh = TerrainTemplate::flat(60.0).build_mesh();
        let b = mesh.bounds().unwrap();
        assert_eq!(Vec3::from(b.max).x, 30.0);
        assert_eq!(Vec3::from(b.min).z, -30.0);
    }
}
