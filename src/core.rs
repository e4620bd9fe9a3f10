// src/core.rs
//! Core types shared by placement, painting and photos.
//! Keep this file dependency-light; everything else builds on it.

use bevy::prelude::*; // Vec3, Quat, Mat3
use serde::{Deserialize, Serialize};

/// What a prop is for. Painting picks one explicitly per stroke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropCategory {
    /// Point of interest; capturing one completes a level.
    Landmark,
    Large,
    Small,
    /// Door or frame leading out of the level.
    Exit,
}

impl PropCategory {
    /// Categories a player can paint.
    pub const PAINTABLE: [PropCategory; 3] = [PropCategory::Landmark, PropCategory::Large, PropCategory::Small];

    /// Brush hue in degrees (red / blue / green for the paintable ones).
    pub fn hue(self) -> f32 {
        match self {
            PropCategory::Landmark => 0.0,
            PropCategory::Large => 240.0,
            PropCategory::Small => 120.0,
            PropCategory::Exit => 45.0,
        }
    }
}

/// Opaque material name carried by terrain pieces.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialRef(pub String);

/// A placeable object description. The pivot sits on the ground at the bottom centre.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropTemplate {
    pub name: String,
    /// Half size of the visual bounds at scale 1.
    pub half_extents: Vec3,
    #[serde(default = "default_capturable")]
    pub capturable: bool,
}

fn default_capturable() -> bool {
    true
}

impl PropTemplate {
    pub fn new(name: impl Into<String>, half_extents: Vec3) -> Self {
        Self { name: name.into(), half_extents, capturable: true }
    }

    /// Offset from pivot to bounds centre, in the prop's local (unrotated) frame.
    #[inline]
    pub fn local_center(&self, scale: Vec3) -> Vec3 {
        Vec3::Y * self.half_extents.y * scale.y
    }

    /// Half size of the world AABB enclosing the rotated, scaled bounds.
    pub fn world_half_extents(&self, rotation: Quat, scale: Vec3) -> Vec3 {
        let h = self.half_extents * scale.abs();
        let m = Mat3::from_quat(rotation);
        m.x_axis.abs() * h.x + m.y_axis.abs() * h.y + m.z_axis.abs() * h.z
    }

    /// Ground-plane half-extent of the combined bounds.
    pub fn footprint_radius(&self, rotation: Quat, scale: Vec3) -> f32 {
        let e = self.world_half_extents(rotation, scale);
        e.x.max(e.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footprint_uses_the_wider_ground_axis() {
        let t = PropTemplate::new("rock", Vec3::new(1.0, 3.0, 2.0));
        assert_eq!(t.footprint_radius(Quat::IDENTITY, Vec3::ONE), 2.0);
        assert_eq!(t.footprint_radius(Quat::IDENTITY, Vec3::splat(2.0)), 4.0);
    }

    #[test]
    fn footprint_grows_under_yaw() {
        let t = PropTemplate::new("crate", Vec3::new(1.0, 1.0, 1.0));
        let r = t.footprint_radius(Quat::from_rotation_y(std::f32::consts::FRAC_PI_4), Vec3::ONE);
        assert!((r - std::f32::consts::SQRT_2).abs() < 1e-5);
    }
}
