//! Tap gesture classification.
//!
//! Raw taps arrive as `(track, instant)` pairs from the track grid. A
//! classifier folds them into playback intents under one of two policies:
//!
//! - **Count**: every tap acts at once. Repeated taps on the same track within
//!   the click window accumulate, so a second tap corrects the first into a
//!   pause and a third restarts the clip.
//! - **Deferred**: a lone tap waits out a short delay before it plays or
//!   toggles; a second tap inside the delay restarts whichever track it hit.
//!
//! Both accumulators are plain values advanced by `step` functions, so the
//! gesture logic runs without a UI or a clock.

use std::time::{Duration, Instant};

use crate::catalog::TrackId;
use crate::config::GesturePolicy;
use crate::constants::RESTART_TAP_COUNT;

/// A playback command inferred from taps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Start the track, or resume it if it is current and paused
    PlayOrResume(TrackId),
    /// Pause whatever is playing
    Pause(TrackId),
    /// Play from start, or flip play/pause if the track is current
    Toggle(TrackId),
    /// Seek to zero and play, switching tracks if needed
    Restart(TrackId),
}

impl Intent {
    pub fn track(&self) -> TrackId {
        match *self {
            Intent::PlayOrResume(t) | Intent::Pause(t) | Intent::Toggle(t) | Intent::Restart(t) => {
                t
            }
        }
    }
}

/// Tap accumulator for the count policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountAccumulator {
    pub last_track: Option<TrackId>,
    pub count: u32,
    pub last_tap: Option<Instant>,
}

impl CountAccumulator {
    pub fn step(self, track: TrackId, at: Instant, window: Duration) -> (Self, Option<Intent>) {
        let same = self.last_track == Some(track);
        let within = self
            .last_tap
            .map(|last| at.saturating_duration_since(last) <= window)
            .unwrap_or(false);

        let mut next = self;
        if same && within {
            next.count += 1;
        } else {
            next.count = 1;
            next.last_track = Some(track);
        }
        next.last_tap = Some(at);

        let intent = if next.count >= RESTART_TAP_COUNT {
            next.count = 0;
            Intent::Restart(track)
        } else if next.count == 2 {
            Intent::Pause(track)
        } else {
            Intent::PlayOrResume(track)
        };

        (next, Some(intent))
    }
}

/// Pending classification for the deferred policy. At most one exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeferredAccumulator {
    pub pending: Option<PendingTap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTap {
    pub track: TrackId,
    pub deadline: Instant,
}

impl DeferredAccumulator {
    pub fn step(self, track: TrackId, at: Instant, delay: Duration) -> (Self, Option<Intent>) {
        match self.pending {
            Some(pending) if at < pending.deadline => {
                // Second tap inside the delay: drop the pending single tap.
                (Self { pending: None }, Some(Intent::Restart(track)))
            }
            Some(stale) => {
                // Deadline passed without a poll; the stale tap still counts.
                let armed = Self {
                    pending: Some(PendingTap {
                        track,
                        deadline: at + delay,
                    }),
                };
                (armed, Some(Intent::Toggle(stale.track)))
            }
            None => (
                Self {
                    pending: Some(PendingTap {
                        track,
                        deadline: at + delay,
                    }),
                },
                None,
            ),
        }
    }

    pub fn expire(self, now: Instant) -> (Self, Option<Intent>) {
        match self.pending {
            Some(pending) if now >= pending.deadline => {
                (Self { pending: None }, Some(Intent::Toggle(pending.track)))
            }
            _ => (self, None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Accumulator {
    Count(CountAccumulator),
    Deferred(DeferredAccumulator),
}

/// Turns taps into intents under a single, fixed policy.
#[derive(Debug, Clone)]
pub struct GestureClassifier {
    policy: GesturePolicy,
    window: Duration,
    state: Accumulator,
}

impl GestureClassifier {
    /// `window` is the click window for the count policy and the
    /// single-tap delay for the deferred policy.
    pub fn new(policy: GesturePolicy, window: Duration) -> Self {
        Self {
            policy,
            window,
            state: Self::fresh(policy),
        }
    }

    fn fresh(policy: GesturePolicy) -> Accumulator {
        match policy {
            GesturePolicy::Count => Accumulator::Count(CountAccumulator::default()),
            GesturePolicy::Deferred => Accumulator::Deferred(DeferredAccumulator::default()),
        }
    }

    pub fn policy(&self) -> GesturePolicy {
        self.policy
    }

    pub fn tap(&mut self, track: TrackId, at: Instant) -> Option<Intent> {
        let (state, intent) = match self.state {
            Accumulator::Count(acc) => {
                let (next, intent) = acc.step(track, at, self.window);
                (Accumulator::Count(next), intent)
            }
            Accumulator::Deferred(acc) => {
                let (next, intent) = acc.step(track, at, self.window);
                (Accumulator::Deferred(next), intent)
            }
        };
        self.state = state;

        if let Some(intent) = intent {
            log::debug!("Tap on track {track} classified as {intent:?}");
        }
        intent
    }

    /// Fire the deferred classification if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<Intent> {
        if let Accumulator::Deferred(acc) = self.state {
            let (next, intent) = acc.expire(now);
            self.state = Accumulator::Deferred(next);
            if let Some(intent) = intent {
                log::debug!("Deferred tap fired as {intent:?}");
            }
            return intent;
        }
        None
    }

    /// When the next `poll` could produce something, if ever.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            Accumulator::Deferred(DeferredAccumulator {
                pending: Some(pending),
            }) => Some(pending.deadline),
            _ => None,
        }
    }

    /// Tap count accumulated so far (count policy only).
    pub fn tap_count(&self) -> u32 {
        match self.state {
            Accumulator::Count(acc) => acc.count,
            Accumulator::Deferred(_) => 0,
        }
    }

    /// Drop counters and cancel any pending classification.
    pub fn reset(&mut self) {
        self.state = Self::fresh(self.policy);
    }
}
