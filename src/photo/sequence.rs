// src/photo/sequence.rs
//! Take-photo sequence, stepped by frame delta.

use crate::config::CaptureSettings;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PhotoStep {
    HideAim,
    FadeOut { elapsed: f32 },
    Capture,
    RestoreCamera,
    FadeIn { elapsed: f32 },
    Done,
}

/// One-shot actions the caller performs as the sequence passes each step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceEvent {
    HideAim,
    Capture,
    RestoreCamera,
    Finished,
}

#[derive(Clone, Debug)]
pub struct TakePhotoSequence {
    step: PhotoStep,
    fade_out: f32,
    fade_in: f32,
}

impl TakePhotoSequence {
    pub fn new(settings: &CaptureSettings) -> Self {
        Self { step: PhotoStep::HideAim, fade_out: settings.fade_out_secs, fade_in: settings.fade_in_secs }
    }

    pub fn step(&self) -> PhotoStep {
        self.step
    }

    pub fn is_done(&self) -> bool {
        self.step == PhotoStep::Done
    }

    /// Advance by `dt` seconds. Instant steps run back to back; `dt` feeds at most one fade.
    pub fn advance(&mut self, dt: f32) -> Vec<SequenceEvent> {
        let mut events = Vec::new();
        let mut dt = Some(dt.max(0.0));
        loop {
            match self.step {
                PhotoStep::HideAim => {
                    events.push(SequenceEvent::HideAim);
                    self.step = PhotoStep::FadeOut { elapsed: 0.0 };
                }
                PhotoStep::FadeOut { elapsed } => {
                    let Some(d) = dt.take() else { break };
                    let elapsed = elapsed + d;
                    if elapsed < self.fade_out {
                        self.step = PhotoStep::FadeOut { elapsed };
                        break;
                    }
                    self.step = PhotoStep::Capture;
                }
                PhotoStep::Capture => {
                    events.push(SequenceEvent::Capture);
                    self.step = PhotoStep::RestoreCamera;
                }
                PhotoStep::RestoreCamera => {
                    events.push(SequenceEvent::RestoreCamera);
                    self.step = PhotoStep::FadeIn { elapsed: 0.0 };
                }
                PhotoStep::FadeIn { elapsed } => {
                    let Some(d) = dt.take() else { break };
                    let elapsed = elapsed + d;
                    if elapsed < self.fade_in {
                        self.step = PhotoStep::FadeIn { elapsed };
                        break;
                    }
                    self.step = PhotoStep::Done;
                    events.push(SequenceEvent::Finished);
                }
                PhotoStep::Done => break,
            }
        }
        events
    }

    /// Black overlay opacity for the current step.
    pub fn overlay_alpha(&self) -> f32 {
        let ratio = |t: f32, d: f32| if d > 0.0 { (t / d).clamp(0.0, 1.0) } else { 1.0 };
        match self.step {
            PhotoStep::HideAim | PhotoStep::Done => 0.0,
            PhotoStep::FadeOut { elapsed } => ratio(elapsed, self.fade_out),
            PhotoStep::Capture | PhotoStep::RestoreCamera => 1.0,
            PhotoStep::FadeIn { elapsed } => 1.0 - ratio(elapsed, self.fade_in),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_run_in_order_with_both_fades() {
        let mut seq = TakePhotoSequence::new(&CaptureSettings::default());
        assert_eq!(seq.advance(0.0), vec![SequenceEvent::HideAim]);
        assert_eq!(seq.step(), PhotoStep::FadeOut { elapsed: 0.0 });

        assert!(seq.advance(0.1).is_empty());
        assert!((seq.overlay_alpha() - 0.5).abs() < 1e-5);

        assert_eq!(seq.advance(0.1), vec![SequenceEvent::Capture, SequenceEvent::RestoreCamera]);
        assert!(matches!(seq.step(), PhotoStep::FadeIn { .. }));
        assert_eq!(seq.overlay_alpha(), 1.0);

        assert!(seq.advance(0.15).is_empty());
        assert!((seq.overlay_alpha() - 0.5).abs() < 1e-5);
        assert_eq!(seq.advance(0.15), vec![SequenceEvent::Finished]);
        assert!(seq.is_done());
        assert_eq!(seq.overlay_alpha(), 0.0);
        assert!(seq.advance(1.0).is_empty());
    }

    #[test]
    fn one_long_frame_does_not_skip_the_fade_in() {
        let mut seq = TakePhotoSequence::new(&CaptureSettings::default());
        let events = seq.advance(5.0);
        assert_eq!(events, vec![SequenceEvent::HideAim, SequenceEvent::Capture, SequenceEvent::RestoreCamera]);
        assert_eq!(seq.step(), PhotoStep::FadeIn { elapsed: 0.0 });
    }
}
