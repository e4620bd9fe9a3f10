// src/photo/frustum.rs
//! Rectangular-section capture cone and the camera pose it hangs off.

use bevy::prelude::*;
use std::f32::consts::PI;

use crate::config::CaptureSettings;

/// Cone with its apex at the camera and a `base_width × base_height` rectangle at `height`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptureFrustum {
    pub height: f32,
    pub base_width: f32,
    pub base_height: f32,
}

impl CaptureFrustum {
    pub fn new(height: f32, base_width: f32, base_height: f32) -> Self {
        Self { height, base_width, base_height }
    }

    pub fn from_settings(settings: &CaptureSettings) -> Self {
        Self::new(settings.frustum_height, settings.base_width, settings.base_height)
    }

    /// Same shape, every dimension multiplied by `factor`.
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.height * factor, self.base_width * factor, self.base_height * factor)
    }

    /// Containment in the view frame (+Z is the view direction).
    pub fn contains_local(&self, p: Vec3) -> bool {
        if self.height <= 0.0 || p.z < 0.0 || p.z > self.height {
            return false;
        }
        let depth = p.z / self.height;
        let half_w = self.base_width * depth * 0.5;
        let half_h = self.base_height * depth * 0.5;
        p.x.abs() <= half_w && p.y.abs() <= half_h
    }

    pub fn contains(&self, camera: &VirtualCamera, world: Vec3) -> bool {
        self.contains_local(camera.to_local(world))
    }

    /// Vertex-or-centroid test: straddling triangles count as inside.
    pub fn touches_triangle_local(&self, tri: [Vec3; 3]) -> bool {
        let centroid = (tri[0] + tri[1] + tri[2]) / 3.0;
        tri.iter().any(|&v| self.contains_local(v)) || self.contains_local(centroid)
    }
}

/// Camera pose plus field of view. `transform` follows Bevy's convention (looks down -Z);
/// capture math runs in the view frame, which looks down +Z.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VirtualCamera {
    pub transform: Transform,
    pub fov_degrees: f32,
}

impl VirtualCamera {
    pub fn new(transform: Transform, fov_degrees: f32) -> Self {
        Self { transform, fov_degrees }
    }

    pub fn looking_at(eye: Vec3, target: Vec3, fov_degrees: f32) -> Self {
        Self::new(Transform::from_translation(eye).looking_at(target, Vec3::Y), fov_degrees)
    }

    pub fn position(&self) -> Vec3 {
        self.transform.translation
    }

    /// Camera pose turned half a revolution about its up axis, so +Z looks forward.
    pub fn view_frame(&self) -> Transform {
        let mut frame = self.transform;
        frame.rotation = self.transform.rotation * Quat::from_rotation_y(PI);
        frame
    }

    pub fn to_local(&self, world: Vec3) -> Vec3 {
        self.view_frame().compute_affine().inverse().transform_point3(world)
    }

    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.view_frame().transform_point(local)
    }

    /// Rotation of a world orientation relative to the view frame.
    pub fn rotation_to_local(&self, world: Quat) -> Quat {
        self.view_frame().rotation.inverse() * world
    }

    pub fn rotation_to_world(&self, local: Quat) -> Quat {
        self.view_frame().rotation * local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frustum() -> CaptureFrustum {
        CaptureFrustum::new(50.0, 16.0, 9.0)
    }

    #[test]
    fn half_depth_on_axis_is_inside() {
        let f = frustum();
        assert!(f.contains_local(Vec3::new(0.0, 0.0, f.height / 2.0)));
        assert!(f.contains_local(Vec3::ZERO));
    }

    #[test]
    fn cross_section_grows_linearly_with_depth() {
        let f = frustum();
        // At z = 25 the half-width is 4 and the half-height 2.25.
        assert!(f.contains_local(Vec3::new(3.9, 2.2, 25.0)));
        assert!(!f.contains_local(Vec3::new(4.1, 0.0, 25.0)));
        assert!(!f.contains_local(Vec3::new(0.0, 2.3, 25.0)));
        assert!(f.contains_local(Vec3::new(7.9, 4.4, 50.0)));
    }

    #[test]
    fn depth_outside_range_is_rejected() {
        let f = frustum();
        assert!(!f.contains_local(Vec3::new(0.0, 0.0, -0.1)));
        assert!(!f.contains_local(Vec3::new(0.0, 0.0, 50.1)));
        assert!(!CaptureFrustum::new(0.0, 16.0, 9.0).contains_local(Vec3::ZERO));
    }

    #[test]
    fn view_frame_looks_where_the_camera_looks() {
        let cam = VirtualCamera::looking_at(Vec3::new(0.0, 2.0, 0.0), Vec3::new(10.0, 2.0, 0.0), 60.0);
        let local = cam.to_local(Vec3::new(20.0, 2.0, 0.0));
        assert!((local - Vec3::new(0.0, 0.0, 20.0)).length() < 1e-4);
        assert!((cam.to_world(local) - Vec3::new(20.0, 2.0, 0.0)).length() < 1e-4);
        assert!(frustum().contains(&cam, Vec3::new(20.0, 2.0, 0.0)));
        assert!(!frustum().contains(&cam, Vec3::new(-20.0, 2.0, 0.0)));
    }

    #[test]
    fn straddling_triangle_counts_through_its_centroid() {
        let f = frustum();
        // All three corners outside, centroid on the axis.
        let tri = [Vec3::new(-20.0, 0.0, 30.0), Vec3::new(20.0, 0.0, 30.0), Vec3::new(0.0, 0.0, 60.0)];
        assert!(tri.iter().all(|&v| !f.contains_local(v)));
        assert!(f.touches_triangle_local(tri));
        let away = [Vec3::new(-30.0, 0.0, 5.0), Vec3::new(-25.0, 0.0, 5.0), Vec3::new(-30.0, 0.0, 6.0)];
        assert!(!f.touches_triangle_local(away));
    }

    #[test]
    fn large_crossing_triangle_with_no_sample_inside_is_missed() {
        let f = frustum();
        // The first edge passes through (0, 0, 10), but no corner and not the centroid is inside.
        let tri = [Vec3::new(-20.0, 0.0, 10.0), Vec3::new(20.0, 0.0, 10.0), Vec3::new(20.0, 0.0, -30.0)];
        assert!(f.contains_local(Vec3::new(0.0, 0.0, 10.0)));
        assert!(!f.touches_triangle_local(tri));
    }
}
