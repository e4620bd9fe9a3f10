// src/paint/canvas.rs
//! 2D paint surface: strokes become typed lines, each dab spends category paint.

use bevy::prelude::*;
use image::{Rgb, RgbImage};

use crate::config::PaintSettings;
use crate::core::PropCategory;
use crate::level::Blueprint;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// A finished stroke. Points are canvas pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct PaintLine {
    pub points: Vec<Vec2>,
    pub category: PropCategory,
    pub saturation: f32,
    /// Paint units actually spent drawing this line.
    pub paint_consumed: u32,
}

impl PaintLine {
    pub fn color(&self) -> Color {
        Color::hsv(self.category.hue(), self.saturation, 1.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CategoryBudget {
    pub max: u32,
    pub remaining: u32,
}

impl CategoryBudget {
    pub fn full(max: u32) -> Self {
        Self { max, remaining: max }
    }
}

/// Remaining paint per paintable category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PaintBudgets {
    pub landmark: CategoryBudget,
    pub large: CategoryBudget,
    pub small: CategoryBudget,
}

impl PaintBudgets {
    pub fn from_blueprint(bp: &Blueprint) -> Self {
        Self {
            landmark: CategoryBudget::full(bp.paint_budget(PropCategory::Landmark)),
            large: CategoryBudget::full(bp.paint_budget(PropCategory::Large)),
            small: CategoryBudget::full(bp.paint_budget(PropCategory::Small)),
        }
    }

    pub fn get(&self, category: PropCategory) -> Option<&CategoryBudget> {
        match category {
            PropCategory::Landmark => Some(&self.landmark),
            PropCategory::Large => Some(&self.large),
            PropCategory::Small => Some(&self.small),
            PropCategory::Exit => None,
        }
    }

    fn get_mut(&mut self, category: PropCategory) -> Option<&mut CategoryBudget> {
        match category {
            PropCategory::Landmark => Some(&mut self.landmark),
            PropCategory::Large => Some(&mut self.large),
            PropCategory::Small => Some(&mut self.small),
            PropCategory::Exit => None,
        }
    }

    pub fn remaining(&self, category: PropCategory) -> u32 {
        self.get(category).map_or(0, |b| b.remaining)
    }

    /// Spend one unit if any is left.
    fn consume(&mut self, category: PropCategory) -> bool {
        match self.get_mut(category) {
            Some(b) if b.remaining > 0 => {
                b.remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn refund(&mut self, category: PropCategory, amount: u32) {
        if let Some(b) = self.get_mut(category) {
            b.remaining = (b.remaining + amount).min(b.max);
        }
    }
}

#[derive(Clone, Debug)]
struct Stroke {
    points: Vec<Vec2>,
    category: PropCategory,
    saturation: f32,
    consumed: u32,
}

pub struct PaintCanvas {
    settings: PaintSettings,
    lines: Vec<PaintLine>,
    budgets: PaintBudgets,
    category: PropCategory,
    saturation: f32,
    stroke: Option<Stroke>,
    edit_mode: bool,
    selected: Option<usize>,
    raster: RgbImage,
}

impl PaintCanvas {
    pub fn new(settings: PaintSettings, blueprint: &Blueprint) -> Self {
        let size = settings.canvas_size.max(1);
        let saturation = settings.max_saturation;
        Self {
            settings,
            lines: Vec::new(),
            budgets: PaintBudgets::from_blueprint(blueprint),
            category: PropCategory::Landmark,
            saturation,
            stroke: None,
            edit_mode: false,
            selected: None,
            raster: RgbImage::from_pixel(size, size, WHITE),
        }
    }

    pub fn settings(&self) -> &PaintSettings {
        &self.settings
    }

    pub fn lines(&self) -> &[PaintLine] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&PaintLine> {
        self.lines.get(index)
    }

    pub fn budgets(&self) -> &PaintBudgets {
        &self.budgets
    }

    pub fn category(&self) -> PropCategory {
        self.category
    }

    pub fn saturation(&self) -> f32 {
        self.saturation
    }

    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn is_drawing(&self) -> bool {
        self.stroke.is_some()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn raster(&self) -> &RgbImage {
        &self.raster
    }

    /// Pixel coordinates → [0,1]².
    pub fn normalize(&self, point: Vec2) -> Vec2 {
        (point / self.settings.canvas_size.max(1) as f32).clamp(Vec2::ZERO, Vec2::ONE)
    }

    /// Pick the brush category. Ignored in edit mode.
    pub fn set_category(&mut self, category: PropCategory) -> bool {
        if self.edit_mode || !PropCategory::PAINTABLE.contains(&category) {
            return false;
        }
        self.category = category;
        true
    }

    /// Slider input. In edit mode with a selected line this retunes that line
    /// and returns its index so the caller can regenerate its props.
    pub fn set_saturation(&mut self, saturation: f32) -> Option<usize> {
        let s = saturation.clamp(self.settings.min_saturation, self.settings.max_saturation);
        self.saturation = s;
        let index = self.selected.filter(|_| self.edit_mode)?;
        let line = self.lines.get_mut(index)?;
        line.saturation = s;
        self.redraw();
        Some(index)
    }

    pub fn begin_stroke(&mut self, point: Vec2) -> bool {
        if self.edit_mode || self.stroke.is_some() || !self.contains(point) {
            return false;
        }
        if self.budgets.remaining(self.category) == 0 {
            return false;
        }
        let mut stroke = Stroke { points: vec![point], category: self.category, saturation: self.saturation, consumed: 0 };
        let color = to_rgb(Color::hsv(stroke.category.hue(), stroke.saturation, 1.0));
        self.stamp_consuming(&mut stroke, point, color);
        self.stroke = Some(stroke);
        true
    }

    /// Continue the active stroke to `point`. Stops extending once the budget is empty.
    pub fn extend_stroke(&mut self, point: Vec2) -> bool {
        if !self.contains(point) {
            return false;
        }
        let Some(mut stroke) = self.stroke.take() else { return false };
        let extended = self.budgets.remaining(stroke.category) > 0;
        if extended {
            let from = stroke.points.last().copied().unwrap_or(point);
            let color = to_rgb(Color::hsv(stroke.category.hue(), stroke.saturation, 1.0));
            for p in segment_dabs(from, point) {
                self.stamp_consuming(&mut stroke, p, color);
            }
            stroke.points.push(point);
        }
        self.stroke = Some(stroke);
        extended
    }

    /// Close the active stroke. `None` if nothing was drawn.
    pub fn finish_stroke(&mut self) -> Option<usize> {
        let stroke = self.stroke.take()?;
        if stroke.points.is_empty() {
            return None;
        }
        self.lines.push(PaintLine {
            points: stroke.points,
            category: stroke.category,
            saturation: stroke.saturation,
            paint_consumed: stroke.consumed,
        });
        let index = self.lines.len() - 1;
        debug!(
            "Paint: line {} ({:?}, sat {:.2}) used {} paint",
            index, stroke.category, stroke.saturation, stroke.consumed
        );
        Some(index)
    }

    /// Remove the newest line and give back exactly the paint it used.
    pub fn undo_last_line(&mut self) -> Option<(usize, PaintLine)> {
        let line = self.lines.pop()?;
        let index = self.lines.len();
        self.budgets.refund(line.category, line.paint_consumed);
        if self.selected.is_some_and(|s| s >= self.lines.len()) {
            self.selected = None;
        }
        self.redraw();
        Some((index, line))
    }

    pub fn toggle_edit_mode(&mut self) -> bool {
        self.edit_mode = !self.edit_mode;
        self.selected = None;
        if !self.edit_mode {
            self.saturation = self.settings.max_saturation;
        }
        self.redraw();
        self.edit_mode
    }

    /// Edit mode: select the line with the closest point within the pick radius.
    pub fn select_line_at(&mut self, point: Vec2) -> Option<usize> {
        if !self.edit_mode {
            return None;
        }
        let threshold = self.settings.brush_size as f32 * self.settings.select_threshold;
        let mut best: Option<(usize, f32)> = None;
        for (i, line) in self.lines.iter().enumerate() {
            for p in &line.points {
                let d = p.distance(point);
                if d < threshold && best.is_none_or(|(_, bd)| d < bd) {
                    best = Some((i, d));
                }
            }
        }
        let (index, _) = best?;
        self.selected = Some(index);
        self.saturation = self.lines[index].saturation;
        self.redraw();
        Some(index)
    }

    /// Repaint every line; the selected one is lifted towards white in edit mode.
    pub fn redraw(&mut self) {
        for px in self.raster.pixels_mut() {
            *px = WHITE;
        }
        for i in 0..self.lines.len() {
            let mut color = to_rgb(self.lines[i].color());
            if self.edit_mode && self.selected == Some(i) {
                color = toward_white(color, 0.3);
            }
            let points = self.lines[i].points.clone();
            for (j, &p) in points.iter().enumerate() {
                self.stamp(p, color);
                if j > 0 {
                    for q in segment_dabs(points[j - 1], p) {
                        self.stamp(q, color);
                    }
                }
            }
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        let size = self.settings.canvas_size as f32;
        point.x >= 0.0 && point.y >= 0.0 && point.x <= size && point.y <= size
    }

    fn stamp_consuming(&mut self, stroke: &mut Stroke, point: Vec2, color: Rgb<u8>) {
        self.stamp(point, color);
        if self.budgets.consume(stroke.category) {
            stroke.consumed += 1;
        }
    }

    /// Filled circle of radius brush/2, clamped to the raster edge.
    fn stamp(&mut self, point: Vec2, color: Rgb<u8>) {
        let (w, h) = self.raster.dimensions();
        let (cx, cy) = (point.x.round() as i64, point.y.round() as i64);
        let half = (self.settings.brush_size / 2) as i64;
        for i in -half..=half {
            for j in -half..=half {
                if i * i + j * j <= half * half {
                    let x = (cx + i).clamp(0, w as i64 - 1) as u32;
                    let y = (cy + j).clamp(0, h as i64 - 1) as u32;
                    self.raster.put_pixel(x, y, color);
                }
            }
        }
    }
}

/// Dab centres along a segment at unit spacing, both ends included.
fn segment_dabs(from: Vec2, to: Vec2) -> impl Iterator<Item = Vec2> {
    let steps = from.distance(to).round() as u32;
    (0..=steps).map(move |i| {
        let t = if steps > 0 { i as f32 / steps as f32 } else { 0.0 };
        from.lerp(to, t)
    })
}

fn to_rgb(color: Color) -> Rgb<u8> {
    let c = color.to_srgba();
    let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgb([q(c.red), q(c.green), q(c.blue)])
}

fn toward_white(c: Rgb<u8>, t: f32) -> Rgb<u8> {
    let f = |v: u8| (v as f32 + (255.0 - v as f32) * t).round() as u8;
    Rgb([f(c[0]), f(c[1]), f(c[2])])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{LevelLayout, TerrainTemplate};

    fn canvas(budget: u32) -> PaintCanvas {
        let mut bp = Blueprint::new("t", LevelLayout::Park, TerrainTemplate::flat(40.0));
        bp.landmark.paint_budget = budget;
        bp.large.paint_budget = budget;
        bp.small.paint_budget = budget;
        PaintCanvas::new(PaintSettings::default(), &bp)
    }

    fn draw(c: &mut PaintCanvas, pts: &[Vec2]) -> Option<usize> {
        assert!(c.begin_stroke(pts[0]));
        for p in &pts[1..] {
            c.extend_stroke(*p);
        }
        c.finish_stroke()
    }

    #[test]
    fn stroke_spends_one_unit_per_dab() {
        let mut c = canvas(1000);
        c.set_category(PropCategory::Large);
        let idx = draw(&mut c, &[Vec2::new(10.0, 10.0), Vec2::new(20.0, 10.0)]).unwrap();
        // 1 initial dab + 11 along the 10-pixel segment.
        assert_eq!(c.lines()[idx].paint_consumed, 12);
        assert_eq!(c.budgets().remaining(PropCategory::Large), 988);
        assert_eq!(c.budgets().remaining(PropCategory::Small), 1000);
    }

    #[test]
    fn undo_refunds_exactly_what_was_used() {
        for cat in PropCategory::PAINTABLE {
            let mut c = canvas(30);
            c.set_category(cat);
            draw(&mut c, &[Vec2::new(5.0, 5.0), Vec2::new(5.0, 15.0)]);
            let before = c.budgets().remaining(cat);
            draw(&mut c, &[Vec2::new(100.0, 100.0), Vec2::new(160.0, 100.0)]);
            assert_eq!(c.budgets().remaining(cat), 0);
            let (idx, line) = c.undo_last_line().unwrap();
            assert_eq!(idx, 1);
            assert_eq!(line.paint_consumed, before);
            assert_eq!(c.budgets().remaining(cat), before);
        }
    }

    #[test]
    fn empty_budget_blocks_new_strokes() {
        let mut c = canvas(3);
        assert!(c.begin_stroke(Vec2::new(1.0, 1.0)));
        c.extend_stroke(Vec2::new(40.0, 1.0));
        c.finish_stroke();
        assert_eq!(c.budgets().remaining(PropCategory::Landmark), 0);
        assert!(!c.begin_stroke(Vec2::new(50.0, 50.0)));
        assert!(c.set_category(PropCategory::Small));
        assert!(c.begin_stroke(Vec2::new(50.0, 50.0)));
    }

    #[test]
    fn finishing_without_a_stroke_is_a_no_op() {
        let mut c = canvas(10);
        assert_eq!(c.finish_stroke(), None);
        assert!(c.lines().is_empty());
        assert!(!c.begin_stroke(Vec2::new(-4.0, 3.0)));
    }

    #[test]
    fn edit_mode_selects_and_retunes_lines() {
        let mut c = canvas(500);
        c.set_category(PropCategory::Small);
        c.set_saturation(0.8);
        draw(&mut c, &[Vec2::new(50.0, 50.0), Vec2::new(90.0, 50.0)]);
        draw(&mut c, &[Vec2::new(50.0, 200.0), Vec2::new(90.0, 200.0)]);

        assert_eq!(c.select_line_at(Vec2::new(60.0, 60.0)), None, "needs edit mode");
        c.toggle_edit_mode();
        assert!(!c.set_category(PropCategory::Large));
        assert!(!c.begin_stroke(Vec2::new(10.0, 10.0)));

        assert_eq!(c.select_line_at(Vec2::new(60.0, 195.0)), Some(1));
        assert_eq!(c.saturation(), 0.8);
        assert_eq!(c.select_line_at(Vec2::new(400.0, 400.0)), None);
        assert_eq!(c.set_saturation(0.05), Some(1));
        assert_eq!(c.lines()[1].saturation, 0.1);
        assert_eq!(c.lines()[0].saturation, 0.8);

        c.toggle_edit_mode();
        assert_eq!(c.selected(), None);
        assert_eq!(c.saturation(), 1.0);
        assert_eq!(c.set_saturation(0.5), None);
    }

    #[test]
    fn raster_shows_lines_and_highlight() {
        let mut c = canvas(500);
        c.set_category(PropCategory::Landmark);
        draw(&mut c, &[Vec2::new(100.0, 100.0)]);
        let px = c.raster().get_pixel(100, 100);
        assert!(px[0] == 255 && px[1] < 3 && px[2] < 3, "{px:?}");
        assert_eq!(*c.raster().get_pixel(300, 300), WHITE);

        c.toggle_edit_mode();
        c.select_line_at(Vec2::new(100.0, 100.0));
        let px = c.raster().get_pixel(100, 100);
        assert!(px[0] == 255 && (74..=80).contains(&px[1]), "{px:?}");

        c.undo_last_line();
        assert_eq!(*c.raster().get_pixel(100, 100), WHITE);
    }
}
