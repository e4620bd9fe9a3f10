// src/photo/session.rs
//! The player's camera: aim/place modes, zoom, and the one photo they may hold.

use bevy::prelude::*;

use crate::config::CaptureSettings;
use crate::level::Level;
use crate::scene::SceneArena;
use super::capture::{capture_scene, Capture, PhotoRenderer};
use super::frustum::{CaptureFrustum, VirtualCamera};
use super::sequence::{SequenceEvent, TakePhotoSequence};
use super::splice::{place_capture, SpliceResult};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhotoError {
    #[error("already holding a photo")]
    AlreadyHolding,
    #[error("no photo held")]
    NothingHeld,
    #[error("camera is not raised for aiming")]
    NotAiming,
    #[error("held photo is not raised for placement")]
    NotPlacing,
    #[error("a photo is already being taken")]
    SequenceBusy,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CameraMode {
    #[default]
    Idle,
    Aiming,
    Placing,
}

pub struct PhotoSession {
    settings: CaptureSettings,
    mode: CameraMode,
    fov: f32,
    frustum_height: f32,
    placement_distance: f32,
    held: Option<Capture>,
    sequence: Option<TakePhotoSequence>,
}

impl PhotoSession {
    pub fn new(settings: CaptureSettings) -> Self {
        let fov = (settings.min_fov + settings.max_fov) * 0.5;
        let frustum_height = settings.frustum_height;
        let placement_distance = (settings.min_placement_distance + settings.max_placement_distance) * 0.5;
        Self { settings, mode: CameraMode::Idle, fov, frustum_height, placement_distance, held: None, sequence: None }
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn frustum_height(&self) -> f32 {
        self.frustum_height
    }

    pub fn placement_distance(&self) -> f32 {
        self.placement_distance
    }

    pub fn held(&self) -> Option<&Capture> {
        self.held.as_ref()
    }

    pub fn sequence(&self) -> Option<&TakePhotoSequence> {
        self.sequence.as_ref()
    }

    /// Cone the next photo would use.
    pub fn frustum(&self) -> CaptureFrustum {
        CaptureFrustum::new(self.frustum_height, self.settings.base_width, self.settings.base_height)
    }

    /// Raise the camera: aim when empty-handed, otherwise get ready to place.
    pub fn raise(&mut self) -> CameraMode {
        if self.sequence.is_none() {
            self.mode = if self.held.is_some() { CameraMode::Placing } else { CameraMode::Aiming };
        }
        self.mode
    }

    pub fn lower(&mut self) {
        if self.sequence.is_none() {
            self.mode = CameraMode::Idle;
        }
    }

    /// Scroll input, routed by mode.
    pub fn zoom(&mut self, delta: f32) {
        match self.mode {
            CameraMode::Aiming => self.capture_zoom(delta),
            CameraMode::Placing => self.placement_zoom(delta),
            CameraMode::Idle => {}
        }
    }

    /// Narrower fov reaches further.
    pub fn capture_zoom(&mut self, delta: f32) {
        let s = &self.settings;
        self.fov = (self.fov - delta * s.zoom_sensitivity).clamp(s.min_fov, s.max_fov);
        let span = s.max_fov - s.min_fov;
        let t = if span > 0.0 { (self.fov - s.min_fov) / span } else { 0.0 };
        self.frustum_height = lerp(s.max_frustum_height, s.min_frustum_height, t);
        debug!("Photo: fov {:.1} → frustum height {:.1}", self.fov, self.frustum_height);
    }

    pub fn placement_zoom(&mut self, delta: f32) {
        let s = &self.settings;
        self.placement_distance = (self.placement_distance - delta * s.placement_zoom_step)
            .clamp(s.min_placement_distance, s.max_placement_distance);
    }

    /// Preview size of the held photo while placing; larger when placing close.
    pub fn placement_ui_scale(&self) -> f32 {
        let s = &self.settings;
        let span = s.max_placement_distance - s.min_placement_distance;
        let t = if span > 0.0 { (self.placement_distance - s.min_placement_distance) / span } else { 0.0 };
        lerp(2.5, 0.8, t)
    }

    /// Start the take-photo sequence.
    pub fn begin_photo(&mut self) -> Result<(), PhotoError> {
        if self.sequence.is_some() {
            return Err(PhotoError::SequenceBusy);
        }
        if self.held.is_some() {
            return Err(PhotoError::AlreadyHolding);
        }
        if self.mode != CameraMode::Aiming {
            return Err(PhotoError::NotAiming);
        }
        self.sequence = Some(TakePhotoSequence::new(&self.settings));
        Ok(())
    }

    /// Step the running sequence, taking the photo when it reaches the capture step.
    pub fn tick(
        &mut self,
        dt: f32,
        arena: &SceneArena,
        camera: &VirtualCamera,
        renderer: &mut dyn PhotoRenderer,
    ) -> Vec<SequenceEvent> {
        let Some(seq) = self.sequence.as_mut() else { return Vec::new() };
        let events = seq.advance(dt);
        let done = seq.is_done();
        for event in &events {
            match event {
                SequenceEvent::Capture => {
                    let size = UVec2::new(self.settings.photo_width, self.settings.photo_height);
                    let camera = VirtualCamera { fov_degrees: self.fov, ..*camera };
                    self.held = Some(capture_scene(arena, &camera, self.frustum(), renderer, size));
                }
                SequenceEvent::RestoreCamera => self.mode = CameraMode::Idle,
                SequenceEvent::HideAim | SequenceEvent::Finished => {}
            }
        }
        if done {
            self.sequence = None;
        }
        events
    }

    /// Hand over a capture taken elsewhere.
    pub fn store(&mut self, capture: Capture) -> Result<(), PhotoError> {
        if self.held.is_some() {
            return Err(PhotoError::AlreadyHolding);
        }
        self.held = Some(capture);
        Ok(())
    }

    pub fn discard(&mut self) -> Result<Capture, PhotoError> {
        self.held.take().ok_or(PhotoError::NothingHeld)
    }

    /// Splice the held photo in front of `target`; the photo is used up.
    pub fn place(
        &mut self,
        arena: &mut SceneArena,
        level: &mut Level,
        target: &VirtualCamera,
    ) -> Result<SpliceResult, PhotoError> {
        if self.held.is_none() {
            return Err(PhotoError::NothingHeld);
        }
        if self.mode != CameraMode::Placing {
            return Err(PhotoError::NotPlacing);
        }
        let capture = self.held.take().ok_or(PhotoError::NothingHeld)?;
        self.mode = CameraMode::Idle;
        Ok(place_capture(arena, level, &capture, target, self.placement_distance, self.settings.reference_distance))
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photo::capture::SketchRenderer;
    use image::RgbImage;

    fn empty_capture() -> Capture {
        Capture {
            image: RgbImage::new(1, 1),
            objects: Vec::new(),
            terrain: None,
            frustum: CaptureFrustum::new(50.0, 16.0, 9.0),
            camera: VirtualCamera::new(Transform::IDENTITY, 60.0),
        }
    }

    #[test]
    fn capture_zoom_trades_fov_for_reach() {
        let mut s = PhotoSession::new(CaptureSettings::default());
        s.raise();
        s.zoom(10.0);
        assert_eq!(s.fov(), 30.0);
        assert_eq!(s.frustum_height(), 80.0);
        s.zoom(-10.0);
        assert_eq!(s.fov(), 80.0);
        assert_eq!(s.frustum_height(), 30.0);
        assert_eq!(s.placement_distance(), 52.5);
    }

    #[test]
    fn placement_zoom_is_clamped_and_scales_the_preview() {
        let mut s = PhotoSession::new(CaptureSettings::default());
        s.store(empty_capture()).unwrap();
        assert_eq!(s.raise(), CameraMode::Placing);
        s.zoom(100.0);
        assert_eq!(s.placement_distance(), 5.0);
        assert_eq!(s.placement_ui_scale(), 2.5);
        s.zoom(-100.0);
        assert_eq!(s.placement_distance(), 100.0);
        assert!((s.placement_ui_scale() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn at_most_one_photo_is_held() {
        let mut s = PhotoSession::new(CaptureSettings::default());
        assert_eq!(s.begin_photo(), Err(PhotoError::NotAiming));
        s.store(empty_capture()).unwrap();
        assert_eq!(s.store(empty_capture()), Err(PhotoError::AlreadyHolding));
        s.raise();
        assert_eq!(s.begin_photo(), Err(PhotoError::AlreadyHolding));
        s.discard().unwrap();
        assert_eq!(s.discard().err(), Some(PhotoError::NothingHeld));
    }

    #[test]
    fn sequence_fills_the_hand_and_returns_to_idle() {
        let arena = SceneArena::new();
        let cam = VirtualCamera::new(Transform::IDENTITY, 60.0);
        let mut s = PhotoSession::new(CaptureSettings::default());
        assert_eq!(s.raise(), CameraMode::Aiming);
        s.begin_photo().unwrap();
        assert_eq!(s.begin_photo(), Err(PhotoError::SequenceBusy));

        let mut seen = Vec::new();
        for _ in 0..20 {
            seen.extend(s.tick(0.05, &arena, &cam, &mut SketchRenderer));
        }
        assert!(seen.contains(&SequenceEvent::Capture));
        assert_eq!(seen.last(), Some(&SequenceEvent::Finished));
        assert!(s.sequence().is_none());
        assert_eq!(s.mode(), CameraMode::Idle);
        let held = s.held().unwrap();
        assert_eq!(held.frustum.height, 50.0);
        assert_eq!(held.image.dimensions(), (320, 180));
    }

    #[test]
    fn placing_needs_a_raised_photo() {
        use crate::config::PlacementSettings;
        use crate::level::{Blueprint, GenerationMode, LevelGenerator, LevelLayout, TerrainTemplate};
        use std::sync::Arc;

        let mut arena = SceneArena::new();
        let bp = Blueprint::new("p", LevelLayout::Park, TerrainTemplate::flat(50.0));
        let mut level = LevelGenerator::new(PlacementSettings::default(), 1)
            .generate_level(&mut arena, Arc::new(bp), Vec3::ZERO, GenerationMode::Painted)
            .unwrap();
        let cam = VirtualCamera::new(Transform::IDENTITY, 60.0);
        let mut s = PhotoSession::new(CaptureSettings::default());

        assert_eq!(s.place(&mut arena, &mut level, &cam).err(), Some(PhotoError::NothingHeld));
        s.store(empty_capture()).unwrap();
        assert_eq!(s.place(&mut arena, &mut level, &cam).err(), Some(PhotoError::NotPlacing));
        s.raise();
        assert!(s.place(&mut arena, &mut level, &cam).is_ok());
        assert!(s.held().is_none());
        assert_eq!(s.mode(), CameraMode::Idle);
    }
}
