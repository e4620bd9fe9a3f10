// src/paint/convert.rs
//! Paint line → evenly spaced, normalized placement requests.

use bevy::prelude::*;
use rand::Rng;

use crate::config::PaintSettings;
use crate::core::PropCategory;
use crate::placement::sample_disk;
use super::canvas::PaintLine;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementRequest {
    pub category: PropCategory,
    /// Canvas position in [0,1]².
    pub position: Vec2,
    pub density: f32,
}

/// Total arc length of a polyline.
pub fn polyline_length(points: &[Vec2]) -> f32 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Count for a full-saturation line: length based, so sampling rate does not bias it.
pub fn max_placeable_count(length: f32, density_per_unit: f32) -> usize {
    ((length * density_per_unit).round() as usize).max(1)
}

/// Count after applying a saturation, floor 1.
pub fn saturated_count(max_placeable: usize, saturation: f32) -> usize {
    ((max_placeable as f32 * saturation).round() as usize).max(1)
}

/// Point at arc length `distance` along the polyline, clamped to its ends.
pub fn point_at_distance(points: &[Vec2], distance: f32) -> Option<Vec2> {
    let first = *points.first()?;
    if distance <= 0.0 {
        return Some(first);
    }
    let mut walked = 0.0;
    for w in points.windows(2) {
        let seg = w[0].distance(w[1]);
        if seg > 0.0 && walked + seg >= distance {
            return Some(w[0].lerp(w[1], (distance - walked) / seg));
        }
        walked += seg;
    }
    points.last().copied()
}

/// Spread `target` (or the length-derived count) placements along the line.
/// Empty lines produce nothing.
pub fn convert_line<R: Rng + ?Sized>(
    line: &PaintLine,
    target: Option<usize>,
    settings: &PaintSettings,
    allow_randomness: bool,
    rng: &mut R,
) -> Vec<PlacementRequest> {
    if line.points.is_empty() {
        return Vec::new();
    }
    let length = polyline_length(&line.points);
    let count = target.unwrap_or_else(|| max_placeable_count(length, settings.density_per_unit));
    let size = settings.canvas_size.max(1) as f32;

    (0..count)
        .filter_map(|i| {
            let t = if count == 1 { 0.5 } else { i as f32 / (count - 1) as f32 };
            let on_line = point_at_distance(&line.points, t * length)?;
            let mut position = (on_line / size).clamp(Vec2::ZERO, Vec2::ONE);
            if allow_randomness && settings.jitter > 0.0 {
                position = (position + sample_disk(rng, settings.jitter)).clamp(Vec2::ZERO, Vec2::ONE);
            }
            Some(PlacementRequest { category: line.category, position, density: line.saturation })
        })
        .collect()
}
