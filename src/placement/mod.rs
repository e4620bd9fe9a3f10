// src/placement/mod.rs
//! Collision-aware positioning shared by level generation, paint and photo splicing.

pub mod safe_search;
pub mod spatial;

pub use safe_search::{find_safe_position, sample_disk, verify_position, CandidateMode, SearchRequest};
pub use spatial::{PlacedObjectRecord, SpatialIndex};
