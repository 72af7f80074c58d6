//! The per-ability activation phase machine.
//!
//! One [`ActivationEngine`] drives all activations of a single ability on a
//! single caster, stepping through
//! `Idle → Triggered → Gated → TargetResolving → Preparing → Initiating →
//! Dispatching → CoolingDown → Idle`, with an `Interrupted` absorbing state
//! reachable from every active phase.
//!
//! # Scheduling model
//!
//! The engine is driven by [`tick`](ActivationEngine::tick) from the
//! caster's single update thread. Every timed wait is a suspension point:
//! the tick re-examines timers and interrupt flags and either advances or
//! returns, never blocking. Several engines (one per ability) may be
//! mid-activation concurrently on the same caster; shared state lives on
//! the per-ability runtime record and every activation carries a sequence
//! number so stale cleanup can recognize that a newer activation owns the
//! record (see [`crate::driver`]).
//!
//! Cancellation is cooperative: [`interrupt`](ActivationEngine::interrupt)
//! sets a flag that the next suspension point observes, unwinding
//! presentation cues and discarding the activation context exactly once.

use std::fmt;
use std::sync::Arc;

use glam::Vec2;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::ability::{AbilityBook, AbilityId, CooldownStart, InitiateGate, TargetingMode, ToggleMode};
use crate::caster::{CasterFlags, CasterHost, PointQuery};
use crate::clock::{scaled_duration, GameClock, PhaseTimer, TickSlice};
use crate::combo::{self, AI_EXTRA_LEEWAY};
use crate::dispatch::{DispatchHandle, SpawnRequest, TravelContext, TravelMotion, TravelStrategy};
use crate::gate::{self, GateDecision, GateReason};
use crate::hooks::PhaseCue;
use crate::target::{ResolveFailure, ResolveOutcome, ResolvedTarget, TargetResolver};
use crate::toggle;

/// What caused an activation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// Player input edge.
    Input,
    /// Auto-cast re-trigger.
    AutoCast,
    /// AI decision; receives extra combo leeway.
    Ai,
    /// Cascade from a linked ability's dispatch.
    Linked,
}

impl TriggerKind {
    /// Extra combo-window leeway granted to this trigger source.
    #[must_use]
    pub fn combo_leeway(self) -> f32 {
        match self {
            Self::Ai => AI_EXTRA_LEEWAY,
            _ => 0.0,
        }
    }
}

/// Why an activation was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptCause {
    /// External cancel signal.
    External,
    /// A blocking hit-reaction landed on the caster.
    HitReaction,
    /// A higher-priority activation took over.
    Overridden,
    /// The caster moved past the configured cancel distance.
    Moved,
    /// A hold-to-continue trigger was released.
    HoldReleased,
    /// The target vanished or failed final range/facing re-validation.
    TargetLost,
}

/// Activation phase. See the module docs for the transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No activation in flight.
    Idle,
    /// A trigger was observed and awaits gating.
    Triggered,
    /// Gate and combo checks passed.
    Gated,
    /// Resolving (or polling for) a target.
    TargetResolving,
    /// Timed wind-up; cancellable.
    Preparing,
    /// Timed initiation; costs are paid on exit.
    Initiating,
    /// Spawning per-origin dispatches.
    Dispatching,
    /// Dispatch complete; waiting out the recast cooldown.
    CoolingDown,
    /// Absorbing state after a cancellation; resolves to `Idle`.
    Interrupted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Triggered => "triggered",
            Self::Gated => "gated",
            Self::TargetResolving => "target-resolving",
            Self::Preparing => "preparing",
            Self::Initiating => "initiating",
            Self::Dispatching => "dispatching",
            Self::CoolingDown => "cooling-down",
            Self::Interrupted => "interrupted",
        };
        write!(f, "{name}")
    }
}

/// Something an engine tick did, reported to the driver and tests.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationEvent {
    /// The gate refused the trigger; no state persists.
    Rejected {
        /// The refused ability.
        ability: AbilityId,
        /// First failing precondition.
        reason: GateReason,
    },
    /// Target resolution failed and the activation was abandoned.
    ResolveFailed {
        /// The ability that failed to resolve.
        ability: AbilityId,
        /// Structured failure reason.
        reason: ResolveFailure,
    },
    /// The activation entered a new phase.
    PhaseEntered {
        /// The ability whose activation advanced.
        ability: AbilityId,
        /// The phase entered.
        phase: Phase,
    },
    /// One origin dispatched. `handle` is `None` for instantaneous ray
    /// dispatches and for configurations whose travel strategy is missing.
    Dispatched {
        /// The dispatching ability.
        ability: AbilityId,
        /// Handle of the spawned object, when one was spawned.
        handle: Option<DispatchHandle>,
    },
    /// A successful dispatch requests a linked-ability cascade.
    LinkedTrigger {
        /// The dispatching ability.
        from: AbilityId,
        /// The ability to trigger.
        to: AbilityId,
    },
    /// The recast cooldown started.
    CooldownStarted {
        /// The ability now cooling down.
        ability: AbilityId,
    },
    /// The activation was interrupted and unwound.
    Interrupted {
        /// The interrupted ability.
        ability: AbilityId,
        /// What caused the interruption.
        cause: InterruptCause,
    },
    /// A toggle flipped on at dispatch.
    ToggledOn {
        /// The toggle ability.
        ability: AbilityId,
    },
    /// A toggle flipped off.
    ToggledOff {
        /// The toggle ability.
        ability: AbilityId,
    },
}

/// Per-activation scratch state; created on trigger, destroyed on
/// completion or interruption. Never outlives one activation.
#[derive(Debug, Clone)]
struct ActivationContext {
    seq: u64,
    trigger: TriggerKind,
    target: Option<ResolvedTarget>,
    aim_point: Option<Vec2>,
    scatter_offset: Vec2,
    timer: Option<PhaseTimer>,
    anchor_pos: Vec2,
    origin_idx: usize,
    origin_timer: Option<PhaseTimer>,
}

/// Upper bound on state transitions processed in one tick; an instant
/// ability runs its whole pipeline in a single call.
const MAX_STEPS_PER_TICK: u32 = 16;

// =============================================================================
// Activation Engine
// =============================================================================

/// Phase machine driving one ability's activations on one caster.
pub struct ActivationEngine {
    ability: AbilityId,
    phase: Phase,
    ctx: Option<ActivationContext>,
    resolver: TargetResolver,
    rng: ChaCha8Rng,
    pending_trigger: Option<TriggerKind>,
    pending_interrupt: Option<InterruptCause>,
    travel: Option<Arc<dyn TravelStrategy>>,
}

impl fmt::Debug for ActivationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationEngine")
            .field("ability", &self.ability)
            .field("phase", &self.phase)
            .field("pending_trigger", &self.pending_trigger)
            .finish_non_exhaustive()
    }
}

impl ActivationEngine {
    /// Creates an engine for one ability.
    ///
    /// `travel` is the strategy resolved from the registry at setup;
    /// `None` means the definition named an unknown key and dispatch
    /// degrades to a no-op (reported once as a configuration error by the
    /// driver).
    #[must_use]
    pub fn new(ability: AbilityId, seed: u64, travel: Option<Arc<dyn TravelStrategy>>) -> Self {
        Self {
            ability,
            phase: Phase::Idle,
            ctx: None,
            resolver: TargetResolver::new(seed),
            rng: ChaCha8Rng::seed_from_u64(seed.wrapping_add(1)),
            pending_trigger: None,
            pending_interrupt: None,
            travel,
        }
    }

    /// The ability this engine drives.
    #[must_use]
    pub const fn ability(&self) -> AbilityId {
        self.ability
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Records a trigger for the next tick to observe (pull-based; the
    /// latest request wins).
    pub fn request_trigger(&mut self, kind: TriggerKind) {
        self.pending_trigger = Some(kind);
    }

    /// Requests cooperative cancellation of the in-flight activation.
    ///
    /// Idempotent: repeated calls, or calls with no activation in flight,
    /// do nothing. The next suspension point unwinds side effects once.
    pub fn interrupt(&mut self, cause: InterruptCause) {
        let active = !matches!(self.phase, Phase::Idle | Phase::Interrupted | Phase::CoolingDown);
        if active && self.pending_interrupt.is_none() {
            self.pending_interrupt = Some(cause);
        }
    }

    /// Advances the phase machine by one tick.
    ///
    /// `slice` is the clock step that just elapsed; its frozen portion is
    /// credited to the in-flight phase timers so hit-stop never counts
    /// against them.
    pub fn tick<H>(
        &mut self,
        book: &mut AbilityBook,
        host: &mut H,
        clock: &GameClock,
        slice: TickSlice,
    ) -> Vec<ActivationEvent>
    where
        H: CasterHost + ?Sized,
    {
        let mut events = Vec::new();
        let now = clock.now();

        if slice.frozen > 0.0 {
            if let Some(ctx) = &mut self.ctx {
                if let Some(timer) = &mut ctx.timer {
                    timer.credit(slice.frozen);
                }
                if let Some(timer) = &mut ctx.origin_timer {
                    timer.credit(slice.frozen);
                }
            }
        }

        // The absorbing state resolves at the next tick after its unwind.
        if self.phase == Phase::Interrupted {
            self.phase = Phase::Idle;
        }

        // Cooperative cancellation: observed here, at the suspension point.
        if let Some(cause) = self.pending_interrupt.take() {
            if !matches!(self.phase, Phase::Idle | Phase::Interrupted | Phase::CoolingDown) {
                self.enter_interrupted(book, host, cause, &mut events);
            }
        }

        let mut steps = 0;
        loop {
            steps += 1;
            if steps > MAX_STEPS_PER_TICK {
                break;
            }
            let advanced = match self.phase {
                Phase::Idle => self.step_idle(book, host, now, &mut events),
                Phase::Triggered => self.step_triggered(book, host, now, &mut events),
                Phase::Gated => {
                    self.phase = Phase::TargetResolving;
                    true
                }
                Phase::TargetResolving => self.step_resolving(book, host, now, &mut events),
                Phase::Preparing => self.step_preparing(book, host, now, &mut events),
                Phase::Initiating => self.step_initiating(book, host, now, &mut events),
                Phase::Dispatching => self.step_dispatching(book, host, now, &mut events),
                Phase::CoolingDown => self.step_cooling(book, host, now, &mut events),
                // Absorbing; resolves to Idle at the next tick.
                Phase::Interrupted => false,
            };
            if !advanced {
                break;
            }
        }
        events
    }

    // -------------------------------------------------------------------------
    // Phase handlers
    // -------------------------------------------------------------------------

    fn step_idle<H>(
        &mut self,
        book: &mut AbilityBook,
        host: &mut H,
        now: f32,
        events: &mut Vec<ActivationEvent>,
    ) -> bool
    where
        H: CasterHost + ?Sized,
    {
        let id = self.ability;
        let Some(entry) = book.entry(id) else {
            self.pending_trigger = None;
            return false;
        };
        let toggle_mode = entry.spec.toggle.mode;
        let toggled_on = entry.runtime.is_toggled_on();
        let auto_cast = entry.spec.auto_cast && entry.runtime.auto_cast_on;

        // Hold-mode toggles drop out the instant the trigger is released.
        if toggled_on
            && toggle_mode == ToggleMode::Hold
            && !host.flags().contains(CasterFlags::TRIGGER_HELD)
        {
            if let Some(runtime) = book.runtime_mut(id) {
                toggle::turn_off(runtime, host);
            }
            events.push(ActivationEvent::ToggledOff { ability: id });
            return false;
        }

        if let Some(kind) = self.pending_trigger.take() {
            if toggled_on {
                // A live toggle consumes the trigger as its off edge.
                if toggle_mode == ToggleMode::OnOff {
                    if let Some(runtime) = book.runtime_mut(id) {
                        toggle::turn_off(runtime, host);
                    }
                    events.push(ActivationEvent::ToggledOff { ability: id });
                }
                return false;
            }
            self.begin_activation(kind);
            return true;
        }

        if auto_cast && !toggled_on && !book.runtime(id).is_some_and(|r| r.on_cooldown(now)) {
            self.begin_activation(TriggerKind::AutoCast);
            return true;
        }
        false
    }

    fn begin_activation(&mut self, kind: TriggerKind) {
        // The sequence number is claimed only once the gate passes, so a
        // rejected trigger leaves no trace on the runtime record.
        self.ctx = Some(ActivationContext {
            seq: 0,
            trigger: kind,
            target: None,
            aim_point: None,
            scatter_offset: Vec2::ZERO,
            timer: None,
            anchor_pos: Vec2::ZERO,
            origin_idx: 0,
            origin_timer: None,
        });
        self.phase = Phase::Triggered;
    }

    fn step_triggered<H>(
        &mut self,
        book: &mut AbilityBook,
        host: &mut H,
        now: f32,
        events: &mut Vec<ActivationEvent>,
    ) -> bool
    where
        H: CasterHost + ?Sized,
    {
        let id = self.ability;
        let trigger = self.ctx.as_ref().map_or(TriggerKind::Input, |c| c.trigger);
        match gate::evaluate(book, id, host, now, trigger) {
            GateDecision::Pass => {
                if let Some(runtime) = book.runtime_mut(id) {
                    runtime.interrupted = false;
                    let seq = runtime.next_seq();
                    if let Some(ctx) = &mut self.ctx {
                        ctx.seq = seq;
                    }
                }
                self.phase = Phase::Gated;
                true
            }
            GateDecision::Blocked(reason) => {
                self.note(book, host, &format!("rejected: {reason}"));
                events.push(ActivationEvent::Rejected {
                    ability: id,
                    reason,
                });
                self.ctx = None;
                self.phase = Phase::Idle;
                false
            }
        }
    }

    fn step_resolving<H>(
        &mut self,
        book: &mut AbilityBook,
        host: &mut H,
        now: f32,
        events: &mut Vec<ActivationEvent>,
    ) -> bool
    where
        H: CasterHost + ?Sized,
    {
        let id = self.ability;
        let Some(spec) = book.spec(id) else {
            self.ctx = None;
            self.phase = Phase::Idle;
            return false;
        };
        let targeting = spec.targeting.clone();
        let loop_until_found = targeting.loop_until_found;

        let caster_id = host.caster_id();
        let caster_pos = host.position();
        match self
            .resolver
            .resolve(&targeting, host, caster_id, caster_pos)
        {
            ResolveOutcome::Ready(target) => {
                if let Some(ctx) = &mut self.ctx {
                    ctx.target = Some(target);
                }
                self.enter_preparing(book, host, now, events);
                true
            }
            // Await the host's asynchronous selection; re-polled next tick.
            ResolveOutcome::Pending => false,
            ResolveOutcome::Failed(reason) => {
                if loop_until_found {
                    // Suspend until the caster supplies a target; bounded
                    // only by external interruption.
                    return false;
                }
                self.note(book, host, &format!("no target: {reason:?}"));
                events.push(ActivationEvent::ResolveFailed {
                    ability: id,
                    reason,
                });
                self.ctx = None;
                self.phase = Phase::Idle;
                false
            }
        }
    }

    fn enter_preparing<H>(
        &mut self,
        book: &AbilityBook,
        host: &mut H,
        now: f32,
        events: &mut Vec<ActivationEvent>,
    ) where
        H: CasterHost + ?Sized,
    {
        let id = self.ability;
        let duration = book.spec(id).map_or(0.0, |spec| {
            scaled_duration(spec.timing.prepare, spec.timing.speed_pct, host.global_speed_pct())
        });
        let anchor = host.position();
        if let Some(ctx) = &mut self.ctx {
            ctx.timer = Some(PhaseTimer::new(now, duration));
            ctx.anchor_pos = anchor;
        }
        host.play_phase_cue(PhaseCue::Prepare, duration);
        self.phase = Phase::Preparing;
        events.push(ActivationEvent::PhaseEntered {
            ability: id,
            phase: Phase::Preparing,
        });
    }

    fn step_preparing<H>(
        &mut self,
        book: &mut AbilityBook,
        host: &mut H,
        now: f32,
        events: &mut Vec<ActivationEvent>,
    ) -> bool
    where
        H: CasterHost + ?Sized,
    {
        let id = self.ability;
        let Some(spec) = book.spec(id) else {
            self.ctx = None;
            self.phase = Phase::Idle;
            return false;
        };
        let prepare = spec.prepare;
        self.repoll_point(spec, host);

        if prepare.hold_to_continue && !host.flags().contains(CasterFlags::TRIGGER_HELD) {
            self.enter_interrupted(book, host, InterruptCause::HoldReleased, events);
            return true;
        }
        if let Some(cause) = self.movement_violation(host, prepare.move_cancel_distance) {
            self.enter_interrupted(book, host, cause, events);
            return true;
        }

        let elapsed = self
            .ctx
            .as_ref()
            .and_then(|c| c.timer)
            .is_none_or(|t| t.is_elapsed(now));
        if !elapsed {
            return false;
        }
        self.enter_initiating(book, host, now, events);
        true
    }

    fn enter_initiating<H>(
        &mut self,
        book: &AbilityBook,
        host: &mut H,
        now: f32,
        events: &mut Vec<ActivationEvent>,
    ) where
        H: CasterHost + ?Sized,
    {
        let id = self.ability;
        let (duration, scatter) = book.spec(id).map_or((0.0, 0.0), |spec| {
            (
                scaled_duration(spec.timing.initiate, spec.timing.speed_pct, host.global_speed_pct()),
                spec.dispatch.scatter,
            )
        });

        // Resolve the miss/hit positional offset for this activation.
        let offset = if scatter > 0.0 {
            let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
            let radius = self.rng.gen_range(0.0..scatter);
            Vec2::new(angle.cos(), angle.sin()) * radius
        } else {
            Vec2::ZERO
        };
        if let Some(ctx) = &mut self.ctx {
            ctx.timer = Some(PhaseTimer::new(now, duration));
            ctx.scatter_offset = offset;
        }
        host.play_phase_cue(PhaseCue::Initiate, duration);
        self.phase = Phase::Initiating;
        events.push(ActivationEvent::PhaseEntered {
            ability: id,
            phase: Phase::Initiating,
        });
    }

    fn step_initiating<H>(
        &mut self,
        book: &mut AbilityBook,
        host: &mut H,
        now: f32,
        events: &mut Vec<ActivationEvent>,
    ) -> bool
    where
        H: CasterHost + ?Sized,
    {
        let id = self.ability;
        let Some(spec) = book.spec(id) else {
            self.ctx = None;
            self.phase = Phase::Idle;
            return false;
        };
        let move_cancel = spec.prepare.move_cancel_distance;
        let initiate_gate = spec.timing.gate;
        self.repoll_point(spec, host);

        if let Some(cause) = self.movement_violation(host, move_cancel) {
            self.enter_interrupted(book, host, cause, events);
            return true;
        }

        let ready = match initiate_gate {
            InitiateGate::FixedDelay => self
                .ctx
                .as_ref()
                .and_then(|c| c.timer)
                .is_none_or(|t| t.is_elapsed(now)),
            InitiateGate::ProgressPct(pct) => host.progress_pct() >= pct,
        };
        if !ready {
            return false;
        }
        self.commit_dispatch(book, host, now, events)
    }

    /// The commit point: final target re-validation, cost deduction, and
    /// cooldown start. Runs exactly once per activation.
    fn commit_dispatch<H>(
        &mut self,
        book: &mut AbilityBook,
        host: &mut H,
        now: f32,
        events: &mut Vec<ActivationEvent>,
    ) -> bool
    where
        H: CasterHost + ?Sized,
    {
        let id = self.ability;
        let Some(spec) = book.spec(id).cloned() else {
            self.ctx = None;
            self.phase = Phase::Idle;
            return false;
        };

        // Final re-validation: range and facing against the live target.
        if let Some(ResolvedTarget::Entity(target)) =
            self.ctx.as_ref().and_then(|c| c.target)
        {
            if target != host.caster_id() {
                let Some(distance) = host.distance_to(target) else {
                    self.enter_interrupted(book, host, InterruptCause::TargetLost, events);
                    return true;
                };
                if distance > spec.targeting.range
                    || (spec.targeting.require_facing && !host.is_facing(target))
                {
                    self.enter_interrupted(book, host, InterruptCause::TargetLost, events);
                    return true;
                }
            }
        }

        // Resolve the aim point once, scatter included.
        let aim = self.resolve_aim_point(host, &spec);
        if let Some(ctx) = &mut self.ctx {
            ctx.aim_point = Some(aim);
        }

        // Costs are paid now, at the dispatch instant.
        if spec.cost.mana > 0.0 {
            host.adjust(&crate::caster::PoolId::mana(), -spec.cost.mana);
        }
        if let Some(stat) = &spec.cost.stat {
            host.adjust(&stat.pool, -stat.amount);
        }
        if spec.cost.rounds_per_shot > 0 {
            if spec.clip.is_some() {
                if let Some(runtime) = book.runtime_mut(id) {
                    if let Some(clip) = &mut runtime.clip {
                        if clip.is_reloading() {
                            clip.interrupt_reload();
                        }
                        clip.fire(spec.cost.rounds_per_shot);
                    }
                }
            } else if let Some(pool) = &spec.cost.ammo_pool {
                host.adjust(pool, -(spec.cost.rounds_per_shot as f32));
            }
        }

        // Cooldown starts here unless deferred to handle death.
        let seq = self.ctx.as_ref().map_or(0, |c| c.seq);
        if let Some(runtime) = book.runtime_mut(id) {
            match spec.timing.cooldown_start {
                CooldownStart::AtDispatch => {
                    runtime.start_cooldown(now, spec.timing.cooldown);
                    events.push(ActivationEvent::CooldownStarted { ability: id });
                }
                CooldownStart::OnLastHandleGone => runtime.defer_cooldown(seq),
            }
        }

        // A successful dispatch claims the combo lock.
        combo::note_dispatch(book, id, now);

        host.play_phase_cue(PhaseCue::Dispatch, 0.0);
        if let Some(ctx) = &mut self.ctx {
            ctx.origin_idx = 0;
            ctx.origin_timer = None;
        }
        self.phase = Phase::Dispatching;
        events.push(ActivationEvent::PhaseEntered {
            ability: id,
            phase: Phase::Dispatching,
        });
        true
    }

    fn step_dispatching<H>(
        &mut self,
        book: &mut AbilityBook,
        host: &mut H,
        now: f32,
        events: &mut Vec<ActivationEvent>,
    ) -> bool
    where
        H: CasterHost + ?Sized,
    {
        let id = self.ability;
        let Some(spec) = book.spec(id).cloned() else {
            self.ctx = None;
            self.phase = Phase::Idle;
            return false;
        };

        let origin_idx = self.ctx.as_ref().map_or(0, |c| c.origin_idx);
        if let Some(origin) = spec.dispatch.origins.get(origin_idx) {
            // Each extra origin may wait on its own delay or progress gate.
            if origin_idx > 0 || origin.delay > 0.0 || origin.progress_pct.is_some() {
                let gate_open = if let Some(pct) = origin.progress_pct {
                    host.progress_pct() >= pct
                } else {
                    let timer = self.ctx.as_ref().and_then(|c| c.origin_timer);
                    match timer {
                        Some(t) => t.is_elapsed(now),
                        None => {
                            // First look at this origin: arm its delay.
                            if let Some(ctx) = &mut self.ctx {
                                ctx.origin_timer = Some(PhaseTimer::new(now, origin.delay));
                            }
                            origin.delay <= 0.0
                        }
                    }
                };
                if !gate_open {
                    return false;
                }
            }

            self.spawn_origin(book, host, origin.offset, &spec, events);
            if let Some(ctx) = &mut self.ctx {
                ctx.origin_idx += 1;
                ctx.origin_timer = None;
            }
            return true;
        }

        // All origins fired: flip toggles on, cascade links, cool down.
        if spec.is_toggle() {
            if let Some(runtime) = book.runtime_mut(id) {
                runtime.set_toggled_on(true);
            }
            events.push(ActivationEvent::ToggledOn { ability: id });
        }
        for &linked in &spec.linked {
            events.push(ActivationEvent::LinkedTrigger {
                from: id,
                to: linked,
            });
        }
        self.note(book, host, "dispatch complete");
        self.ctx = None;
        self.phase = Phase::CoolingDown;
        events.push(ActivationEvent::PhaseEntered {
            ability: id,
            phase: Phase::CoolingDown,
        });
        true
    }

    fn spawn_origin<H>(
        &mut self,
        book: &mut AbilityBook,
        host: &mut H,
        offset: Vec2,
        spec: &crate::ability::AbilitySpec,
        events: &mut Vec<ActivationEvent>,
    ) where
        H: CasterHost + ?Sized,
    {
        let id = self.ability;
        let forward = host.forward();
        let perp = Vec2::new(-forward.y, forward.x);
        let origin = host.position() + forward * offset.x + perp * offset.y;

        let aim = self
            .ctx
            .as_ref()
            .and_then(|c| c.aim_point)
            .unwrap_or(origin + forward);
        let dir = (aim - origin).normalize_or_zero();
        let dir = if dir == Vec2::ZERO { forward } else { dir };
        let rotation = dir.y.atan2(dir.x);

        let Some(strategy) = &self.travel else {
            // Missing travel strategy: dispatch degrades to a no-op.
            events.push(ActivationEvent::Dispatched {
                ability: id,
                handle: None,
            });
            return;
        };
        let travel = strategy.travel(&TravelContext {
            origin,
            aim_point: aim,
            distance: origin.distance(aim),
        });

        match travel.motion {
            TravelMotion::Instant => {
                let ray = spec.dispatch.ray.unwrap_or(crate::ability::RaySettings {
                    radius: 0.5,
                    length: spec.targeting.range,
                });
                let hits = host.fire_ray(origin, dir, ray.radius, ray.length);
                if !hits.is_empty() {
                    // An instantaneous connection counts as a confirmed hit.
                    if let Some(runtime) = book.runtime_mut(id) {
                        runtime.confirm_hit();
                    }
                }
                events.push(ActivationEvent::Dispatched {
                    ability: id,
                    handle: None,
                });
            }
            _ => {
                let target = match self.ctx.as_ref().and_then(|c| c.target) {
                    Some(ResolvedTarget::Entity(entity)) => Some(entity),
                    _ => None,
                };
                let handle = host.spawn_projectile(&SpawnRequest {
                    origin,
                    rotation,
                    travel,
                    target,
                    aim_point: aim,
                });
                if let Some(runtime) = book.runtime_mut(id) {
                    runtime.live_handles.push(handle);
                }
                events.push(ActivationEvent::Dispatched {
                    ability: id,
                    handle: Some(handle),
                });
            }
        }
    }

    fn step_cooling<H>(
        &mut self,
        book: &AbilityBook,
        host: &mut H,
        now: f32,
        events: &mut Vec<ActivationEvent>,
    ) -> bool
    where
        H: CasterHost + ?Sized,
    {
        let cooling = book
            .runtime(self.ability)
            .is_some_and(|runtime| runtime.on_cooldown(now));
        if cooling {
            // A trigger pressed mid-cooldown still gets its logged
            // rejection; nothing else persists from the attempt.
            if self.pending_trigger.take().is_some() {
                self.note(book, host, &format!("rejected: {}", GateReason::OnCooldown));
                events.push(ActivationEvent::Rejected {
                    ability: self.ability,
                    reason: GateReason::OnCooldown,
                });
            }
            return false;
        }
        self.phase = Phase::Idle;
        true
    }

    /// Re-samples an asynchronous point selection at a suspension point,
    /// for definitions that track the cursor instead of caching the first
    /// answer.
    fn repoll_point<H>(&mut self, spec: &crate::ability::AbilitySpec, host: &mut H)
    where
        H: CasterHost + ?Sized,
    {
        if !spec.targeting.resample_each_poll {
            return;
        }
        let query = match &spec.targeting.mode {
            TargetingMode::World => PointQuery::World,
            TargetingMode::Crosshair => PointQuery::Crosshair,
            TargetingMode::Cursor => PointQuery::Cursor,
            TargetingMode::Custom(key) => PointQuery::Custom(key.clone()),
            _ => return,
        };
        if let Some(point) = host.request_point(&query) {
            if let Some(ctx) = &mut self.ctx {
                if matches!(ctx.target, Some(ResolvedTarget::Point(_))) {
                    ctx.target = Some(ResolvedTarget::Point(point));
                }
            }
        }
    }

    /// Where this activation is aimed: the live target position, the
    /// selected point, or a point ahead of the caster, plus the scatter
    /// offset resolved at initiation.
    fn resolve_aim_point<H>(&self, host: &H, spec: &crate::ability::AbilitySpec) -> Vec2
    where
        H: CasterHost + ?Sized,
    {
        let ahead = host.position() + host.forward() * spec.targeting.range;
        let base = match self.ctx.as_ref().and_then(|c| c.target) {
            Some(ResolvedTarget::Entity(entity)) => host.position_of(entity).unwrap_or(ahead),
            Some(ResolvedTarget::Point(point)) => point,
            Some(ResolvedTarget::Forward) | None => ahead,
        };
        base + self.ctx.as_ref().map_or(Vec2::ZERO, |c| c.scatter_offset)
    }

    // -------------------------------------------------------------------------
    // Interruption
    // -------------------------------------------------------------------------

    fn enter_interrupted<H>(
        &mut self,
        book: &mut AbilityBook,
        host: &mut H,
        cause: InterruptCause,
        events: &mut Vec<ActivationEvent>,
    ) where
        H: CasterHost + ?Sized,
    {
        let id = self.ability;
        host.cancel_cues();
        combo::clear_own_lock(book, id);
        if let Some(runtime) = book.runtime_mut(id) {
            runtime.interrupted = true;
        }
        self.note(book, host, &format!("interrupted: {cause:?}"));
        self.ctx = None;
        self.pending_interrupt = None;
        self.phase = Phase::Interrupted;
        events.push(ActivationEvent::Interrupted {
            ability: id,
            cause,
        });
    }

    fn movement_violation<H>(&self, host: &H, threshold: Option<f32>) -> Option<InterruptCause>
    where
        H: CasterHost + ?Sized,
    {
        let threshold = threshold?;
        let anchor = self.ctx.as_ref()?.anchor_pos;
        if host.position().distance(anchor) > threshold {
            Some(InterruptCause::Moved)
        } else {
            None
        }
    }

    fn note<H>(&self, book: &AbilityBook, host: &mut H, message: &str)
    where
        H: CasterHost + ?Sized,
    {
        let name = book
            .spec(self.ability)
            .map_or("<unknown>", |spec| spec.name.as_str());
        host.note(&format!("[{name}] {message}"));
        tracing::trace!(target: "runecast", ability = %self.ability, "{message}");
    }
}

// =============================================================================
// Tests
// =============================================================================
