// src/level/progress.rs
//! When has the player done enough photo splicing to be let out of a level?

use crate::config::ProgressSettings;
use crate::core::PropCategory;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelProgress {
    /// Photos placed in this level.
    pub total_placements: u32,
    pub landmark_captured: bool,
    /// Largest object count seen in a single placed photo.
    pub max_objects_in_capture: usize,
    /// The frame has appeared; nothing more to unlock.
    pub frame_generated: bool,
}

impl LevelProgress {
    /// Record one placed photo and the categories of the objects it carried.
    pub fn record_placement(&mut self, categories: &[PropCategory]) {
        self.total_placements += 1;
        self.landmark_captured |= categories.contains(&PropCategory::Landmark);
        self.max_objects_in_capture = self.max_objects_in_capture.max(categories.len());
    }

    /// Landmark captured, or a crowded photo, or enough photos overall.
    pub fn is_complete(&self, settings: &ProgressSettings) -> bool {
        self.landmark_captured
            || self.max_objects_in_capture >= settings.min_objects_in_capture
            || self.total_placements >= settings.min_total_placements
    }

    pub fn should_open_exit(&self, settings: &ProgressSettings) -> bool {
        !self.frame_generated && self.is_complete(settings)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PropCategory::*;

    #[test]
    fn landmark_alone_completes() {
        let mut p = LevelProgress::default();
        p.record_placement(&[Small, Landmark]);
        assert!(p.should_open_exit(&ProgressSettings::default()));
    }

    #[test]
    fn crowded_photo_completes() {
        let mut p = LevelProgress::default();
        p.record_placement(&[Small, Small, Large, Large]);
        assert!(!p.is_complete(&ProgressSettings::default()));
        p.reset();
        p.record_placement(&[Small, Small, Large, Large, Small]);
        assert!(p.is_complete(&ProgressSettings::default()));
    }

    #[test]
    fn third_placement_completes_and_frame_closes_it() {
        let s = ProgressSettings::default();
        let mut p = LevelProgress::default();
        p.record_placement(&[]);
        p.record_placement(&[Small]);
        assert!(!p.should_open_exit(&s));
        p.record_placement(&[]);
        assert!(p.should_open_exit(&s));
        p.frame_generated = true;
        assert!(!p.should_open_exit(&s));
    }
}
