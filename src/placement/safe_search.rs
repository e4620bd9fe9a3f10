// src/placement/safe_search.rs
//! Bounded random search for a collision-free, ground-projected position.

use bevy::prelude::*;
use rand::Rng;

use crate::config::PlacementSettings;
use crate::scene::{NodeId, OverlapQuery, QueryFilter, SurfaceKind, SurfaceProbe};
use super::spatial::SpatialIndex;

/// Whether a candidate may rest on top of a prop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CandidateMode {
    #[default]
    Strict,
    /// Prop surfaces are acceptable ground; the supporting prop is not an obstacle.
    Unrestricted,
}

#[derive(Clone, Copy, Debug)]
pub struct SearchRequest {
    pub center: Vec3,
    pub search_radius: f32,
    pub min_clearance: f32,
    pub footprint_radius: f32,
    /// Only accept probe hits on this node (frame placement on a spliced fragment).
    pub surface_filter: Option<NodeId>,
    pub mode: CandidateMode,
    pub max_attempts: u32,
}

impl SearchRequest {
    pub fn new(center: Vec3, search_radius: f32, min_clearance: f32, footprint_radius: f32, max_attempts: u32) -> Self {
        Self {
            center,
            search_radius,
            min_clearance,
            footprint_radius,
            surface_filter: None,
            mode: CandidateMode::Strict,
            max_attempts,
        }
    }

    pub fn on_surface(mut self, node: NodeId) -> Self {
        self.surface_filter = Some(node);
        self
    }

    pub fn with_mode(mut self, mode: CandidateMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Sample the search disk until a candidate passes every check.
/// `None` means "could not place here"; callers skip the object.
pub fn find_safe_position<S, R>(
    scene: &S,
    existing: &SpatialIndex,
    req: &SearchRequest,
    settings: &PlacementSettings,
    rng: &mut R,
) -> Option<Vec3>
where
    S: SurfaceProbe + OverlapQuery + ?Sized,
    R: Rng + ?Sized,
{
    // A zero radius can only ever test the centre.
    let attempts = if req.search_radius <= 0.0 { 1 } else { req.max_attempts.max(1) };

    for attempt in 0..attempts {
        let offset = sample_disk(rng, req.search_radius.max(0.0));
        let candidate = Vec3::new(req.center.x + offset.x, req.center.y, req.center.z + offset.y);
        if let Some(pos) = check_candidate(scene, existing, candidate, req, settings) {
            debug!("safe search: found {:?} on attempt {}", pos, attempt + 1);
            return Some(pos);
        }
    }

    debug!(
        "safe search: exhausted {} attempts (center={:?}, radius={:.2}, footprint={:.2})",
        attempts, req.center, req.search_radius, req.footprint_radius
    );
    None
}

/// Validate a precomputed position instead of searching (paint strokes pick the spot).
pub fn verify_position<S>(
    scene: &S,
    existing: &SpatialIndex,
    position: Vec3,
    footprint_radius: f32,
    min_clearance: f32,
    settings: &PlacementSettings,
) -> Option<Vec3>
where
    S: SurfaceProbe + OverlapQuery + ?Sized,
{
    let req = SearchRequest::new(position, 0.0, min_clearance, footprint_radius, 1);
    check_candidate(scene, existing, position, &req, settings)
}

fn check_candidate<S>(
    scene: &S,
    existing: &SpatialIndex,
    candidate: Vec3,
    req: &SearchRequest,
    settings: &PlacementSettings,
) -> Option<Vec3>
where
    S: SurfaceProbe + OverlapQuery + ?Sized,
{
    let hit = scene.probe_down(candidate + Vec3::Y * settings.probe_height, settings.probe_distance)?;

    if hit.surface == SurfaceKind::Prop && req.mode == CandidateMode::Strict {
        return None;
    }
    if req.surface_filter.is_some_and(|f| f != hit.node) {
        return None;
    }

    let pos = Vec3::new(candidate.x, hit.point.y, candidate.z);
    if existing.overlaps(pos, req.footprint_radius, req.min_clearance, settings.safety_margin) {
        return None;
    }

    // Broad phase: any prop near the spot that the index does not know about.
    let support = (hit.surface == SurfaceKind::Prop).then_some(hit.node);
    let blocked = scene
        .overlap_sphere(pos, req.footprint_radius + settings.safety_margin, QueryFilter::PROPS)
        .into_iter()
        .any(|n| Some(n) != support && !existing.contains_owner(n));
    if blocked {
        return None;
    }

    Some(pos)
}

/// Uniform point inside a disk of `radius` (XZ offset as Vec2).
pub fn sample_disk<R: Rng + ?Sized>(rng: &mut R, radius: f32) -> Vec2 {
    if radius <= 0.0 {
        return Vec2::ZERO;
    }
    let r = radius * rng.random::<f32>().sqrt();
    let theta = rng.random_range(0.0..std::f32::consts::TAU);
    Vec2::new(r * theta.cos(), r * theta.sin())
}
