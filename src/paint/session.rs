// src/paint/session.rs
//! A painting session over one painted-mode level: canvas input in, level props out.

use bevy::prelude::*;

use crate::config::PaintSettings;
use crate::core::PropCategory;
use crate::level::{Level, LevelGenerator};
use crate::scene::SceneArena;
use super::apply::LinePlacements;
use super::canvas::PaintCanvas;

/// What the player ended up with when they confirmed the painting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaintSummary {
    pub lines: usize,
    pub landmark: usize,
    pub large: usize,
    pub small: usize,
}

pub struct PaintSession {
    pub canvas: PaintCanvas,
    placements: LinePlacements,
}

impl PaintSession {
    pub fn start(settings: PaintSettings, level: &Level) -> Self {
        let canvas = PaintCanvas::new(settings, &level.blueprint);
        let b = canvas.budgets();
        info!(
            "Paint: session for '{}' (paint landmark={}, large={}, small={})",
            level.blueprint.name, b.landmark.max, b.large.max, b.small.max
        );
        Self { canvas, placements: LinePlacements::new() }
    }

    pub fn placements(&self) -> &LinePlacements {
        &self.placements
    }

    /// Close the active stroke and populate the level from it. Returns the new line index.
    pub fn on_line_finished(
        &mut self,
        arena: &mut SceneArena,
        level: &mut Level,
        generator: &mut LevelGenerator,
    ) -> Option<usize> {
        let index = self.canvas.finish_stroke()?;
        let line = self.canvas.line(index)?.clone();
        let (placement, rng) = generator.parts();
        self.placements
            .apply_line(arena, level, index, &line, self.canvas.settings(), placement, rng);
        Some(index)
    }

    /// Drag the active stroke to `point`. Leaving the canvas ends the line where it last was.
    pub fn on_stroke_moved(
        &mut self,
        point: Vec2,
        arena: &mut SceneArena,
        level: &mut Level,
        generator: &mut LevelGenerator,
    ) -> Option<usize> {
        if self.canvas.contains(point) {
            self.canvas.extend_stroke(point);
            return None;
        }
        self.on_line_finished(arena, level, generator)
    }

    /// Undo the newest line: its props go, its paint comes back.
    pub fn undo_last_line(&mut self, arena: &mut SceneArena, level: &mut Level) -> Option<usize> {
        let (index, _) = self.canvas.undo_last_line()?;
        let removed = self.placements.remove_line(arena, level, index);
        debug!("Paint: undid line {} ({} props removed)", index, removed);
        Some(index)
    }

    /// Saturation slider moved. In edit mode this rebuilds the selected line's props.
    pub fn edit_selected_saturation(
        &mut self,
        saturation: f32,
        arena: &mut SceneArena,
        level: &mut Level,
        generator: &mut LevelGenerator,
    ) -> Option<usize> {
        let index = self.canvas.set_saturation(saturation)?;
        let line = self.canvas.line(index)?.clone();
        let (placement, rng) = generator.parts();
        self.placements
            .regenerate_line(arena, level, index, &line, self.canvas.settings(), placement, rng);
        Some(index)
    }

    /// Player is done painting. A stroke still in progress is finished and applied first.
    pub fn confirm(mut self, arena: &mut SceneArena, level: &mut Level, generator: &mut LevelGenerator) -> PaintSummary {
        if self.canvas.is_drawing() {
            self.on_line_finished(arena, level, generator);
        }
        let summary = PaintSummary {
            lines: self.canvas.lines().len(),
            landmark: level.count_props(arena, PropCategory::Landmark),
            large: level.count_props(arena, PropCategory::Large),
            small: level.count_props(arena, PropCategory::Small),
        };
        info!(
            "Paint: '{}' confirmed with {} lines → landmark={}, large={}, small={}",
            level.blueprint.name, summary.lines, summary.landmark, summary.large, summary.small
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlacementSettings;
    use crate::core::PropTemplate;
    use crate::level::{Blueprint, GenerationMode, LevelLayout, TerrainTemplate};
    use std::sync::Arc;

    fn setup() -> (SceneArena, Level, LevelGenerator) {
        let mut bp = Blueprint::new("studio", LevelLayout::Park, TerrainTemplate::flat(200.0));
        bp.small.templates = vec![PropTemplate::new("pebble", Vec3::splat(0.2))];
        bp.small.paint_budget = 2000;
        bp.large.templates = vec![PropTemplate::new("rock", Vec3::splat(0.5))];
        bp.large.paint_budget = 2000;
        bp.allow_randomness = false;
        let mut arena = SceneArena::new();
        let mut gen = LevelGenerator::new(PlacementSettings::default(), 17);
        let level = gen.generate_level(&mut arena, Arc::new(bp), Vec3::ZERO, GenerationMode::Painted).unwrap();
        (arena, level, gen)
    }

    fn stroke(session: &mut PaintSession, from: Vec2, to: Vec2) {
        assert!(session.canvas.begin_stroke(from));
        session.canvas.extend_stroke(to);
    }

    #[test]
    fn undo_of_newest_line_restores_props_and_paint() {
        let (mut arena, mut level, mut gen) = setup();
        let mut s = PaintSession::start(PaintSettings::default(), &level);
        s.canvas.set_category(PropCategory::Small);

        stroke(&mut s, Vec2::new(20.0, 50.0), Vec2::new(490.0, 50.0));
        s.on_line_finished(&mut arena, &mut level, &mut gen).unwrap();
        let props_before = level.props(&arena);
        let paint_before = s.canvas.budgets().remaining(PropCategory::Small);

        stroke(&mut s, Vec2::new(20.0, 400.0), Vec2::new(490.0, 400.0));
        assert_eq!(s.on_line_finished(&mut arena, &mut level, &mut gen), Some(1));
        assert!(level.props(&arena).len() > props_before.len());

        assert_eq!(s.undo_last_line(&mut arena, &mut level), Some(1));
        assert_eq!(level.props(&arena), props_before);
        assert_eq!(s.canvas.budgets().remaining(PropCategory::Small), paint_before);
        assert_eq!(level.index.len(), props_before.len());
    }

    #[test]
    fn editing_saturation_only_rebuilds_the_selected_line() {
        let (mut arena, mut level, mut gen) = setup();
        let mut s = PaintSession::start(PaintSettings::default(), &level);

        s.canvas.set_category(PropCategory::Large);
        stroke(&mut s, Vec2::new(20.0, 50.0), Vec2::new(490.0, 50.0));
        s.on_line_finished(&mut arena, &mut level, &mut gen);
        s.canvas.set_category(PropCategory::Small);
        stroke(&mut s, Vec2::new(20.0, 400.0), Vec2::new(490.0, 400.0));
        s.on_line_finished(&mut arena, &mut level, &mut gen);

        let large_ids = s.placements().mapping(0).unwrap().spawned.clone();
        let small_before = s.placements().mapping(1).unwrap().spawned.len();

        s.canvas.toggle_edit_mode();
        assert_eq!(s.canvas.select_line_at(Vec2::new(22.0, 402.0)), Some(1));
        assert_eq!(s.edit_selected_saturation(0.3, &mut arena, &mut level, &mut gen), Some(1));

        let small_after = s.placements().mapping(1).unwrap().spawned.len();
        assert!(small_after < small_before);
        assert_eq!(s.placements().mapping(0).unwrap().spawned, large_ids);
        assert!(large_ids.iter().all(|id| arena.contains(*id)));
    }

    #[test]
    fn confirm_reports_the_painted_population() {
        let (mut arena, mut level, mut gen) = setup();
        let mut s = PaintSession::start(PaintSettings::default(), &level);
        s.canvas.set_category(PropCategory::Small);
        stroke(&mut s, Vec2::new(20.0, 256.0), Vec2::new(120.0, 256.0));
        s.on_line_finished(&mut arena, &mut level, &mut gen);

        let summary = s.confirm(&mut arena, &mut level, &mut gen);
        assert_eq!(summary.lines, 1);
        assert_eq!(summary.small, 10);
        assert_eq!(summary.large, 0);
    }

    #[test]
    fn dragging_off_the_canvas_finishes_the_line() {
        let (mut arena, mut level, mut gen) = setup();
        let mut s = PaintSession::start(PaintSettings::default(), &level);
        s.canvas.set_category(PropCategory::Small);
        assert!(s.canvas.begin_stroke(Vec2::new(20.0, 256.0)));
        assert_eq!(s.on_stroke_moved(Vec2::new(120.0, 256.0), &mut arena, &mut level, &mut gen), None);
        assert!(s.canvas.is_drawing());

        let size = s.canvas.settings().canvas_size as f32;
        assert_eq!(s.on_stroke_moved(Vec2::new(size + 30.0, 256.0), &mut arena, &mut level, &mut gen), Some(0));
        assert!(!s.canvas.is_drawing());
        assert_eq!(s.canvas.lines()[0].points.last(), Some(&Vec2::new(120.0, 256.0)));
        assert_eq!(level.count_props(&arena, PropCategory::Small), 10);

        // Coming back in does not resume the old line.
        assert_eq!(s.on_stroke_moved(Vec2::new(100.0, 256.0), &mut arena, &mut level, &mut gen), None);
        assert_eq!(s.canvas.lines().len(), 1);
    }

    #[test]
    fn confirming_mid_stroke_applies_the_open_line() {
        let (mut arena, mut level, mut gen) = setup();
        let mut s = PaintSession::start(PaintSettings::default(), &level);
        s.canvas.set_category(PropCategory::Small);
        stroke(&mut s, Vec2::new(20.0, 256.0), Vec2::new(120.0, 256.0));
        assert!(s.canvas.is_drawing());

        let summary = s.confirm(&mut arena, &mut level, &mut gen);
        assert_eq!(summary.lines, 1);
        assert_eq!(summary.small, 10);
        assert_eq!(level.index.len(), 10);
    }
}
