//! Clip and reload bookkeeping.
//!
//! When an ability declares a clip, its ammo splits into a *stock* pool on
//! the acting entity's ledger and an in-clip counter owned by the ability's
//! runtime record. Firing decrements the clip; reloading moves rounds from
//! stock to clip, either all at once at the end of one duration or one
//! shell per tick of the reload timer.
//!
//! The reload is an interruptible timed sub-state: interrupting discards
//! the in-flight timer, but shells already banked into the clip stay.

use serde::{Deserialize, Serialize};

use crate::caster::{PoolId, ResourceLedger};
use crate::clock::PhaseTimer;

/// How a reload refills the clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReloadMode {
    /// The whole clip fills at the end of one duration.
    WholeClip {
        /// Seconds for the full reload.
        duration: f32,
    },
    /// One round moves from stock to clip per timer tick.
    PerShell {
        /// Seconds per shell.
        per_shell: f32,
    },
}

/// Clip configuration carried by an ability definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSpec {
    /// Maximum rounds the clip holds.
    pub clip_size: u32,
    /// Refill behavior.
    pub reload: ReloadMode,
    /// Ledger pool the stock is drawn from (own pool or a linked
    /// equipped-item pool).
    pub stock_pool: PoolId,
    /// Whether another activation may safely interrupt a reload in
    /// progress.
    pub interruptible: bool,
}

/// What a reload tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadEvent {
    /// Nothing to report; the timer is still running (or no reload active).
    Idle,
    /// One shell was banked into the clip (per-shell mode).
    ShellBanked,
    /// The reload finished and the clip is as full as stock allowed.
    Completed,
}

/// In-flight reload progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct ReloadProgress {
    timer: PhaseTimer,
    /// Shells banked so far this reload (per-shell mode).
    banked: u32,
}

/// Mutable clip state owned by one ability runtime record.
///
/// Invariant: `in_clip` stays within `[0, clip_size]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipState {
    in_clip: u32,
    reload: Option<ReloadProgress>,
}

impl ClipState {
    /// A full clip, no reload pending.
    #[must_use]
    pub fn full(spec: &ClipSpec) -> Self {
        Self {
            in_clip: spec.clip_size,
            reload: None,
        }
    }

    /// An empty clip, no reload pending.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            in_clip: 0,
            reload: None,
        }
    }

    /// Rounds currently in the clip.
    #[must_use]
    pub const fn rounds(&self) -> u32 {
        self.in_clip
    }

    /// Whether a reload timer is running.
    #[must_use]
    pub const fn is_reloading(&self) -> bool {
        self.reload.is_some()
    }

    /// Whether the clip has run dry and needs a reload before firing.
    #[must_use]
    pub fn needs_reload(&self, rounds_per_shot: u32) -> bool {
        self.in_clip < rounds_per_shot.max(1)
    }

    /// Consumes `rounds` from the clip. Returns `false` (and consumes
    /// nothing) if the clip holds fewer.
    pub fn fire(&mut self, rounds: u32) -> bool {
        let rounds = rounds.max(1);
        if self.in_clip < rounds {
            return false;
        }
        self.in_clip -= rounds;
        true
    }

    /// Starts a reload at clock time `now`. No-op if one is already
    /// running or the clip is full.
    pub fn begin_reload(&mut self, spec: &ClipSpec, now: f32) {
        if self.reload.is_some() || self.in_clip >= spec.clip_size {
            return;
        }
        let duration = match spec.reload {
            ReloadMode::WholeClip { duration } => duration,
            ReloadMode::PerShell { per_shell } => per_shell,
        };
        self.reload = Some(ReloadProgress {
            timer: PhaseTimer::new(now, duration),
            banked: 0,
        });
    }

    /// Advances the reload against the clock, moving rounds out of the
    /// stock pool as they bank.
    pub fn tick_reload<L: ResourceLedger + ?Sized>(
        &mut self,
        spec: &ClipSpec,
        ledger: &mut L,
        now: f32,
    ) -> ReloadEvent {
        let Some(mut progress) = self.reload else {
            return ReloadEvent::Idle;
        };
        if !progress.timer.is_elapsed(now) {
            return ReloadEvent::Idle;
        }

        let stock = ledger.value(&spec.stock_pool).floor().max(0.0) as u32;
        match spec.reload {
            ReloadMode::WholeClip { .. } => {
                let take = (spec.clip_size - self.in_clip).min(stock);
                if take > 0 {
                    ledger.adjust(&spec.stock_pool, -(take as f32));
                    self.in_clip += take;
                }
                self.reload = None;
                ReloadEvent::Completed
            }
            ReloadMode::PerShell { per_shell } => {
                if stock == 0 {
                    self.reload = None;
                    return ReloadEvent::Completed;
                }
                ledger.adjust(&spec.stock_pool, -1.0);
                self.in_clip += 1;
                progress.banked += 1;
                if self.in_clip >= spec.clip_size || stock == 1 {
                    self.reload = None;
                    return ReloadEvent::Completed;
                }
                progress.timer = PhaseTimer::new(now, per_shell);
                self.reload = Some(progress);
                ReloadEvent::ShellBanked
            }
        }
    }

    /// Interrupts an in-flight reload.
    ///
    /// The current timer is discarded; shells already banked stay in the
    /// clip.
    pub fn interrupt_reload(&mut self) {
        self.reload = None;
    }

    /// Forwards hit-stop credit to the reload timer, if one is running.
    pub fn credit(&mut self, frozen_dt: f32) {
        if let Some(progress) = &mut self.reload {
            progress.timer.credit(frozen_dt);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
