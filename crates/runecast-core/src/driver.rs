//! Per-caster composition root.
//!
//! The [`ActivationDriver`] owns one caster's [`AbilityBook`], one
//! [`ActivationEngine`] per ability, the caster's [`GameClock`], and the
//! optional scroll set. The host calls [`update`](ActivationDriver::update)
//! once per frame; the driver advances the clock, forwards hit-stop credit
//! to every running timer, ticks reloads, steps each engine in declaration
//! order, and routes linked-ability cascades between engines.
//!
//! Travel-strategy keys and cross-ability links are resolved here, once,
//! when the driver is built; configuration errors are reported a single
//! time through diagnostics and the offending feature stays inert.

use std::collections::BTreeMap;

use crate::ability::{AbilityBook, AbilityId, AbilitySpec, ConfigError};
use crate::caster::CasterHost;
use crate::clock::GameClock;
use crate::dispatch::{DispatchHandle, TravelRegistry};
use crate::engine::{ActivationEngine, ActivationEvent, InterruptCause, Phase, TriggerKind};
use crate::gate::{self, GateDecision};
use crate::toggle::ScrollSet;

/// Drives every ability of one caster.
pub struct ActivationDriver {
    book: AbilityBook,
    engines: BTreeMap<AbilityId, ActivationEngine>,
    scroll: Option<ScrollSet>,
    clock: GameClock,
    config_errors: Vec<ConfigError>,
    errors_reported: bool,
}

impl ActivationDriver {
    /// Builds a driver from definitions.
    ///
    /// Definitions are sanitized into an [`AbilityBook`]; travel keys are
    /// resolved against `registry` now so dispatch never looks anything up
    /// by name. `seed` makes shuffle tie-breaks and scatter offsets
    /// deterministic.
    #[must_use]
    pub fn new(specs: Vec<AbilitySpec>, registry: &TravelRegistry, seed: u64) -> Self {
        let (book, mut errors) = AbilityBook::build(specs);
        let mut engines = BTreeMap::new();
        for entry in book.iter() {
            let id = entry.spec.id;
            let travel = registry.resolve(&entry.spec.dispatch.travel_key);
            if travel.is_none() {
                errors.push(ConfigError::UnknownTravelKey {
                    ability: id,
                    key: entry.spec.dispatch.travel_key.clone(),
                });
            }
            engines.insert(
                id,
                ActivationEngine::new(id, seed.wrapping_add(u64::from(id.as_u32())), travel),
            );
        }
        Self {
            book,
            engines,
            scroll: None,
            clock: GameClock::new(),
            config_errors: errors,
            errors_reported: false,
        }
    }

    /// The caster's ability book.
    #[must_use]
    pub fn book(&self) -> &AbilityBook {
        &self.book
    }

    /// Mutable access to the ability book (setup and tests).
    #[must_use]
    pub fn book_mut(&mut self) -> &mut AbilityBook {
        &mut self.book
    }

    /// The caster's clock.
    #[must_use]
    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    /// Configuration errors found at build time.
    #[must_use]
    pub fn config_errors(&self) -> &[ConfigError] {
        &self.config_errors
    }

    /// Current phase of an ability's engine.
    #[must_use]
    pub fn phase(&self, id: AbilityId) -> Option<Phase> {
        self.engines.get(&id).map(ActivationEngine::phase)
    }

    /// Remaining recast cooldown of an ability.
    #[must_use]
    pub fn remaining_cooldown(&self, id: AbilityId) -> f32 {
        self.book
            .runtime(id)
            .map_or(0.0, |runtime| runtime.remaining_cooldown(self.clock.now()))
    }

    /// Installs a scroll set over abilities in the book.
    pub fn set_scroll(&mut self, scroll: ScrollSet) {
        self.scroll = Some(scroll);
    }

    /// The currently scroll-equipped ability, if a set is installed.
    #[must_use]
    pub fn scroll_equipped(&self) -> Option<AbilityId> {
        self.scroll.as_ref().map(ScrollSet::equipped)
    }

    /// Rotates the scroll set, turning off any toggle being switched away
    /// from (unless it persists). Returns the newly equipped ability.
    pub fn advance_scroll<H>(&mut self, host: &mut H) -> Option<AbilityId>
    where
        H: CasterHost + ?Sized,
    {
        let scroll = self.scroll.as_mut()?;
        Some(scroll.advance(&mut self.book, host))
    }

    /// Records a trigger for an ability, observed at the next update.
    pub fn trigger(&mut self, id: AbilityId, kind: TriggerKind) {
        if let Some(engine) = self.engines.get_mut(&id) {
            engine.request_trigger(kind);
        }
    }

    /// Requests cooperative cancellation of one ability's activation.
    pub fn interrupt(&mut self, id: AbilityId, cause: InterruptCause) {
        if let Some(engine) = self.engines.get_mut(&id) {
            engine.interrupt(cause);
        }
    }

    /// Requests cancellation of every in-flight activation (forced
    /// takeover, death, stagger).
    pub fn interrupt_all(&mut self, cause: InterruptCause) {
        for engine in self.engines.values_mut() {
            engine.interrupt(cause);
        }
    }

    /// A higher-priority action takes over the caster: every in-flight
    /// activation is interrupted and every live toggle is switched off,
    /// destroying its tracked objects.
    pub fn force_takeover<H>(&mut self, host: &mut H) -> Vec<ActivationEvent>
    where
        H: CasterHost + ?Sized,
    {
        self.interrupt_all(InterruptCause::Overridden);
        let mut events = Vec::new();
        for id in self.book.declaration_order().to_vec() {
            if let Some(runtime) = self.book.runtime_mut(id) {
                if runtime.is_toggled_on() {
                    crate::toggle::turn_off(runtime, host);
                    events.push(ActivationEvent::ToggledOff { ability: id });
                }
            }
        }
        events
    }

    /// Registers a confirmed hit for an ability's current combo lock.
    pub fn confirm_hit(&mut self, id: AbilityId) {
        if let Some(runtime) = self.book.runtime_mut(id) {
            runtime.confirm_hit();
        }
    }

    /// Opens a hit-stop freeze window; frozen time is credited back to
    /// every running timer.
    pub fn freeze(&mut self, duration: f32) {
        self.clock.freeze(duration);
    }

    /// Pure precondition check for an ability, without triggering it.
    pub fn can_activate<H>(&mut self, id: AbilityId, host: &H, kind: TriggerKind) -> GateDecision
    where
        H: CasterHost + ?Sized,
    {
        gate::evaluate(&mut self.book, id, host, self.clock.now(), kind)
    }

    /// The host reports a spawned object's destruction.
    ///
    /// Removes the handle from the owning runtime and, when the definition
    /// deferred its cooldown to handle death, starts the cooldown once the
    /// last handle is gone. Cleanup is guarded by the activation sequence
    /// number: if a newer activation already owns the record, the stale
    /// notification must not start its cooldown.
    pub fn handle_destroyed(&mut self, id: AbilityId, handle: DispatchHandle) -> Option<ActivationEvent> {
        let now = self.clock.now();
        let cooldown = self.book.spec(id).map(|spec| spec.timing.cooldown)?;
        let runtime = self.book.runtime_mut(id)?;
        runtime.live_handles.retain(|&h| h != handle);
        if !runtime.live_handles.is_empty() {
            return None;
        }
        let seq = runtime.deferred_cooldown_seq()?;
        if seq != runtime.latest_seq() {
            // A newer activation is already running; its dispatch will
            // re-arm the deferral.
            return None;
        }
        runtime.start_cooldown(now, cooldown);
        Some(ActivationEvent::CooldownStarted { ability: id })
    }

    /// Advances the caster's abilities by `dt` seconds.
    ///
    /// Returns everything that happened this frame, across all engines,
    /// in declaration order.
    pub fn update<H>(&mut self, host: &mut H, dt: f32) -> Vec<ActivationEvent>
    where
        H: CasterHost + ?Sized,
    {
        self.report_config_errors(host);

        let slice = self.clock.advance(dt);
        let now = self.clock.now();

        if slice.frozen > 0.0 {
            for id in self.book.declaration_order().to_vec() {
                if let Some(runtime) = self.book.runtime_mut(id) {
                    runtime.credit_timers(slice.frozen);
                }
            }
        }

        self.tick_reloads(host, now);

        let mut events = Vec::new();
        for id in self.book.declaration_order().to_vec() {
            if let Some(engine) = self.engines.get_mut(&id) {
                events.extend(engine.tick(&mut self.book, host, &self.clock, slice));
            }
        }

        // Route linked cascades; the target engines observe them at the
        // next update, like any other trigger.
        for event in &events {
            if let ActivationEvent::LinkedTrigger { to, .. } = event {
                if let Some(engine) = self.engines.get_mut(to) {
                    engine.request_trigger(TriggerKind::Linked);
                }
            }
        }
        events
    }

    /// Begins and advances reloads for clip abilities.
    ///
    /// A dry clip starts reloading on its own as soon as stock is
    /// available and no activation is mid-flight for that ability.
    fn tick_reloads<H>(&mut self, host: &mut H, now: f32)
    where
        H: CasterHost + ?Sized,
    {
        for id in self.book.declaration_order().to_vec() {
            let engine_busy = self
                .engines
                .get(&id)
                .is_some_and(|engine| !matches!(engine.phase(), Phase::Idle | Phase::CoolingDown));
            let Some(entry) = self.book.entry_mut(id) else {
                continue;
            };
            let Some(clip_spec) = entry.spec.clip.clone() else {
                continue;
            };
            let rounds = entry.spec.cost.rounds_per_shot.max(1);
            let Some(clip) = &mut entry.runtime.clip else {
                continue;
            };

            if !clip.is_reloading()
                && !engine_busy
                && clip.needs_reload(rounds)
                && host.value(&clip_spec.stock_pool) >= 1.0
            {
                clip.begin_reload(&clip_spec, now);
            }
            clip.tick_reload(&clip_spec, host, now);
        }
    }

    fn report_config_errors<H>(&mut self, host: &mut H)
    where
        H: CasterHost + ?Sized,
    {
        if self.errors_reported {
            return;
        }
        self.errors_reported = true;
        for error in &self.config_errors {
            host.note(&format!("config: {error}"));
            tracing::warn!(target: "runecast", "config error: {error}");
        }
    }
}

impl std::fmt::Debug for ActivationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationDriver")
            .field("abilities", &self.book.len())
            .field("tick", &self.clock.now())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
