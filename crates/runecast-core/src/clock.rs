//! Timekeeping for the activation engine.
//!
//! All durations in the engine are expressed in seconds. The [`GameClock`]
//! is advanced by the host once per update; every timed phase wait is a
//! [`PhaseTimer`] checked against the clock at each suspension point rather
//! than a blocking OS wait.
//!
//! # Hit-stop
//!
//! A confirmed hit may freeze the clock for a short window
//! ([`GameClock::freeze`]). The clock keeps advancing during the freeze, but
//! [`GameClock::advance`] reports how much of each step overlapped the
//! frozen window. Active timers are credited with that overlap
//! ([`PhaseTimer::credit`]) so frozen time is never counted against them.
//!
//! # Example
//!
//! ```
//! use runecast_core::clock::{GameClock, PhaseTimer};
//!
//! let mut clock = GameClock::new();
//! let mut timer = PhaseTimer::new(clock.now(), 1.0);
//!
//! clock.freeze(0.5);
//! let slice = clock.advance(0.5); // entirely inside the freeze window
//! timer.credit(slice.frozen);
//!
//! // The full second is still outstanding: frozen time did not count.
//! assert!((timer.remaining(clock.now()) - 1.0).abs() < 1e-6);
//! ```

use serde::{Deserialize, Serialize};

/// Granularity of a suspension-point poll, in seconds.
///
/// Timed phases do not need servicing more often than this; the engine
/// shortens the interval near the end of a wait so deadlines are not
/// overshot by a full poll tick.
pub const POLL_TICK: f32 = 0.2;

/// Composes a base duration with an ability speed stat and an entity-wide
/// global adjustment, both expressed as percentages (100 = unmodified).
///
/// # Example
///
/// ```
/// use runecast_core::clock::scaled_duration;
///
/// // 2s base, ability casts at 50% duration, entity is 25% slower.
/// let d = scaled_duration(2.0, 50.0, 125.0);
/// assert!((d - 1.25).abs() < 1e-6);
/// ```
#[must_use]
pub fn scaled_duration(base: f32, ability_speed_pct: f32, global_speed_pct: f32) -> f32 {
    base * (ability_speed_pct / 100.0) * (global_speed_pct / 100.0)
}

// =============================================================================
// Game Clock
// =============================================================================

/// Monotonic seconds-based clock owned by the entity's update loop.
///
/// The clock is advanced by the host with [`advance`](Self::advance), which
/// returns a [`TickSlice`] describing how much of the step was spent inside
/// a hit-stop freeze window. The engine forwards the frozen portion to every
/// active timer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameClock {
    /// Seconds since the clock was created.
    now: f32,
    /// End of the current hit-stop window, if any.
    freeze_until: f32,
}

/// One clock step, split into wall-clock and frozen portions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickSlice {
    /// Total seconds advanced this step.
    pub dt: f32,
    /// Portion of `dt` that fell inside a hit-stop freeze window.
    pub frozen: f32,
}

impl GameClock {
    /// Creates a clock at time zero with no freeze pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time in seconds.
    #[must_use]
    pub const fn now(&self) -> f32 {
        self.now
    }

    /// Returns `true` while a hit-stop freeze window is active.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.now < self.freeze_until
    }

    /// Opens (or extends) a hit-stop freeze window of `duration` seconds.
    ///
    /// Overlapping freezes merge; the window never shrinks.
    pub fn freeze(&mut self, duration: f32) {
        self.freeze_until = self.freeze_until.max(self.now + duration.max(0.0));
    }

    /// Advances the clock by `dt` seconds.
    ///
    /// Returns the slice of the step that overlapped the freeze window so
    /// the caller can credit active timers.
    pub fn advance(&mut self, dt: f32) -> TickSlice {
        let dt = dt.max(0.0);
        let start = self.now;
        self.now += dt;
        let frozen = (self.freeze_until.min(self.now) - start).max(0.0);
        TickSlice { dt, frozen }
    }
}

// =============================================================================
// Phase Timer
// =============================================================================

/// A timed wait anchored at a clock instant.
///
/// The deadline is `started_at + duration + extension`; the extension
/// accumulates hit-stop credit and resets only when the timer is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseTimer {
    started_at: f32,
    duration: f32,
    extension: f32,
}

impl PhaseTimer {
    /// Starts a timer of `duration` seconds at clock time `now`.
    #[must_use]
    pub fn new(now: f32, duration: f32) -> Self {
        Self {
            started_at: now,
            duration: duration.max(0.0),
            extension: 0.0,
        }
    }

    /// Seconds remaining until the deadline, clamped at zero.
    #[must_use]
    pub fn remaining(&self, now: f32) -> f32 {
        (self.started_at + self.duration + self.extension - now).max(0.0)
    }

    /// Returns `true` once the deadline has passed.
    #[must_use]
    pub fn is_elapsed(&self, now: f32) -> bool {
        self.remaining(now) <= 0.0
    }

    /// Fraction of the wait completed, in `[0, 1]`.
    #[must_use]
    pub fn fraction_elapsed(&self, now: f32) -> f32 {
        let total = self.duration + self.extension;
        if total <= 0.0 {
            return 1.0;
        }
        ((now - self.started_at) / total).clamp(0.0, 1.0)
    }

    /// Adds hit-stop credit: the deadline moves out by `frozen_dt` seconds.
    pub fn credit(&mut self, frozen_dt: f32) {
        self.extension += frozen_dt.max(0.0);
    }

    /// Seconds until this timer next needs servicing.
    ///
    /// The fixed poll tick, shortened near the end of the wait.
    #[must_use]
    pub fn next_poll(&self, now: f32) -> f32 {
        self.remaining(now).min(POLL_TICK)
    }

    /// The configured duration, excluding hit-stop credit.
    #[must_use]
    pub const fn duration(&self) -> f32 {
        self.duration
    }
}

// =============================================================================
// Tests
// =============================================================================
