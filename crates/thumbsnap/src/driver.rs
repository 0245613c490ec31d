//! The frame loop.
//!
//! Every tick reads one camera frame, looks for the gesture, advances the [`CaptureSession`] and
//! carries out the [`Effect`]s it returns, then shows the annotated frame. All hardware is behind
//! the traits re-exported here, so the loop runs just as well against in-memory fakes.

use std::time::{Instant, SystemTime};

use crate::capture::{CaptureSession, Effect, Phase};
use crate::gui::draw_overlay;
use crate::hand::gesture::gesture_present;
use crate::image::Image;
use crate::timer::{FpsCounter, Timer};

pub use crate::audio::{Cue, CuePlayer};
pub use crate::gui::Display;
pub use crate::hand::HandDetector;
pub use crate::persist::{CaptureEvent, SnapshotStore};
pub use crate::video::FrameSource;

/// Whether [`FrameLoop::tick`] wants to be called again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Returns the countdown text shown while a capture is pending.
pub fn countdown_text(secs: u64) -> String {
    format!("Capturing in {secs} sec")
}

/// Owns the collaborators and the capture session, and runs them one frame at a time.
pub struct FrameLoop {
    source: Box<dyn FrameSource>,
    detector: Box<dyn HandDetector>,
    display: Box<dyn Display>,
    cues: Box<dyn CuePlayer>,
    store: Box<dyn SnapshotStore>,
    session: CaptureSession,
    clean_snapshots: bool,
    fps: FpsCounter,
    t_acquire: Timer,
    t_detect: Timer,
    t_show: Timer,
}

impl FrameLoop {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn HandDetector>,
        display: Box<dyn Display>,
        cues: Box<dyn CuePlayer>,
        store: Box<dyn SnapshotStore>,
        session: CaptureSession,
    ) -> Self {
        Self {
            source,
            detector,
            display,
            cues,
            store,
            session,
            clean_snapshots: false,
            fps: FpsCounter::new("frame loop"),
            t_acquire: Timer::new("acquire"),
            t_detect: Timer::new("detect"),
            t_show: Timer::new("show"),
        }
    }

    /// Stores the raw camera frame instead of the annotated preview frame.
    ///
    /// By default a snapshot looks exactly like the preview at the moment of capture, including
    /// the hand skeleton and the countdown.
    pub fn clean_snapshots(mut self, clean: bool) -> Self {
        self.clean_snapshots = clean;
        self
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    /// Runs ticks until the display asks to exit or the camera fails.
    ///
    /// A camera failure is returned as the error.
    pub fn run(&mut self) -> anyhow::Result<()> {
        log::info!(
            "watching for a thumbs up ({:?} delay), press Q or Escape to quit",
            self.session.timing().confirm_delay,
        );
        while self.tick(Instant::now())? == Flow::Continue {}
        log::info!("exit requested");
        Ok(())
    }

    /// Processes a single frame, treating `now` as the current time.
    ///
    /// Only frame acquisition and display errors are returned. Detection and storage failures are
    /// logged and the loop carries on.
    pub fn tick(&mut self, now: Instant) -> anyhow::Result<Flow> {
        let frame = self.t_acquire.time(|| self.source.read())?;

        let hands = match self.t_detect.time(|| self.detector.detect(&frame)) {
            Ok(hands) => hands,
            Err(e) => {
                log::warn!("hand detection failed: {e:#}");
                Vec::new()
            }
        };
        let present = gesture_present(&hands, frame.height() as f32);

        let mut annotated = frame.clone();
        for (i, hand) in hands.iter().enumerate() {
            log::trace!(
                "hand #{i}: presence {:?}, {:?}",
                hand.presence(),
                hand.handedness(),
            );
            hand.draw(&mut annotated);
        }

        let effects = self.session.advance(present, now);

        // The capture frame shows the countdown at zero.
        let overlay = effects.iter().find_map(|effect| match effect {
            Effect::RenderCountdown(secs) => Some(countdown_text(*secs)),
            Effect::CaptureNow => Some(countdown_text(0)),
            _ => None,
        });
        if let Some(text) = &overlay {
            draw_overlay(&mut annotated, text);
        }

        for effect in effects {
            match effect {
                Effect::PlayConfirmCue => {
                    log::info!("thumbs up recognized");
                    self.cues.play(Cue::Confirm);
                }
                Effect::RenderCountdown(_) => {}
                Effect::CaptureNow => {
                    let snapshot = if self.clean_snapshots {
                        &frame
                    } else {
                        &annotated
                    };
                    self.capture(snapshot);
                }
                Effect::PlayShutterCue => self.cues.play(Cue::Shutter),
                Effect::EnterCooldown => log::debug!("cooling down"),
                Effect::CancelCountdown => log::info!("thumbs up lost, capture cancelled"),
            }
        }

        self.t_show
            .time(|| self.display.show(&annotated, overlay.as_deref()))?;

        self.fps
            .tick_with([&self.t_acquire, &self.t_detect, &self.t_show]);

        if self.display.exit_requested() {
            Ok(Flow::Exit)
        } else {
            Ok(Flow::Continue)
        }
    }

    fn capture(&mut self, frame: &Image) {
        let event = CaptureEvent {
            frame,
            taken_at: SystemTime::now(),
        };
        match self.store.store(&event) {
            Ok(path) => log::info!("snapshot saved to '{}'", path.display()),
            Err(e) => log::error!("failed to store snapshot: {e:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_wording() {
        assert_eq!(countdown_text(3), "Capturing in 3 sec");
        assert_eq!(countdown_text(1), "Capturing in 1 sec");
    }
}
