// src/photo/mod.rs
//! Capture and splice: take a conical slice of one place and rebuild it somewhere else.

pub mod capture;
pub mod frustum;
pub mod sequence;
pub mod session;
pub mod splice;

pub use capture::{
    capture_objects, capture_scene, capture_terrain, Capture, CapturedObjectRecord, PhotoRenderer, SketchRenderer,
    TerrainIntersectionRecord,
};
pub use frustum::{CaptureFrustum, VirtualCamera};
pub use sequence::{PhotoStep, SequenceEvent, TakePhotoSequence};
pub use session::{CameraMode, PhotoError, PhotoSession};
pub use splice::{hide_covered, place_capture, respliced_transform, splice_factor, SpliceResult};
