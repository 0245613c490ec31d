//! The capture state machine.
//!
//! [`CaptureSession`] is fed one gesture sample per frame and decides when to beep, count down,
//! take the picture and lock out re-triggering. It does not perform any of these actions itself;
//! [`CaptureSession::advance`] returns a list of [`Effect`]s for the frame loop to carry out.
//!
//! ```text
//!            gesture            delay elapsed            cooldown elapsed
//!   Idle ─────────────► Armed ──────────────► Cooldown ─────────────────► Idle
//! ```

use std::time::{Duration, Instant};

/// Whether an armed countdown needs the gesture to stay visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArmingPolicy {
    /// Once armed, the countdown runs to completion even if the gesture disappears.
    #[default]
    Committed,
    /// The countdown is cancelled on the first frame without the gesture.
    Continuous,
}

/// Timing parameters of a [`CaptureSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Time between the gesture being recognized and the picture being taken.
    pub confirm_delay: Duration,
    /// Lockout after a capture during which the gesture is ignored.
    pub cooldown: Duration,
    pub arming: ArmingPolicy,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            confirm_delay: Duration::from_secs(3),
            cooldown: Duration::from_secs(1),
            arming: ArmingPolicy::Committed,
        }
    }
}

/// The state of a [`CaptureSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the gesture.
    Idle,
    /// Gesture seen at `armed_at`, counting down to the capture.
    Armed { armed_at: Instant },
    /// A picture was taken at `since`; the gesture is ignored until the cooldown has passed.
    Cooldown { since: Instant },
}

impl Phase {
    /// Returns a short lowercase name for log output.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Armed { .. } => "armed",
            Phase::Cooldown { .. } => "cooldown",
        }
    }
}

/// Side effects requested by [`CaptureSession::advance`], in the order they should happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// The gesture was recognized, play the confirmation beep.
    PlayConfirmCue,
    /// Show the number of whole seconds left until the capture.
    RenderCountdown(u64),
    /// Take the picture now.
    CaptureNow,
    PlayShutterCue,
    /// The session entered its post-capture lockout.
    EnterCooldown,
    /// The gesture was lost while armed (only with [`ArmingPolicy::Continuous`]).
    CancelCountdown,
}

/// Debounces the per-frame gesture signal into capture events.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    timing: Timing,
    phase: Phase,
}

impl CaptureSession {
    /// Creates a session in [`Phase::Idle`].
    pub fn new(timing: Timing) -> Self {
        Self {
            timing,
            phase: Phase::Idle,
        }
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Advances the session by one frame.
    ///
    /// `gesture_present` is this frame's gesture sample, `now` the time the frame is processed at.
    /// `now` is expected to be monotonic; a timestamp before the arming time counts as no time
    /// having passed.
    pub fn advance(&mut self, gesture_present: bool, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        let next = match self.phase {
            Phase::Idle if gesture_present => {
                effects.push(Effect::PlayConfirmCue);
                effects.push(Effect::RenderCountdown(whole_secs_ceil(
                    self.timing.confirm_delay,
                )));
                Phase::Armed { armed_at: now }
            }
            Phase::Idle => Phase::Idle,
            Phase::Armed { armed_at } => {
                let elapsed = now.saturating_duration_since(armed_at);
                if elapsed >= self.timing.confirm_delay {
                    effects.push(Effect::CaptureNow);
                    effects.push(Effect::PlayShutterCue);
                    effects.push(Effect::EnterCooldown);
                    Phase::Cooldown { since: now }
                } else if !gesture_present && self.timing.arming == ArmingPolicy::Continuous {
                    effects.push(Effect::CancelCountdown);
                    Phase::Idle
                } else {
                    effects.push(Effect::RenderCountdown(whole_secs_ceil(
                        self.timing.confirm_delay - elapsed,
                    )));
                    self.phase
                }
            }
            Phase::Cooldown { since }
                if now.saturating_duration_since(since) >= self.timing.cooldown =>
            {
                Phase::Idle
            }
            Phase::Cooldown { .. } => self.phase,
        };

        if next.name() != self.phase.name() {
            log::debug!("capture session: {} -> {}", self.phase.name(), next.name());
        }
        self.phase = next;
        effects
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new(Timing::default())
    }
}

/// Rounds `d` up to whole seconds.
fn whole_secs_ceil(d: Duration) -> u64 {
    if d.subsec_nanos() == 0 {
        d.as_secs()
    } else {
        d.as_secs() + 1
    }
}
