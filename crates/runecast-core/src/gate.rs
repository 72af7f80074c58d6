//! Activation precondition gate.
//!
//! The gate runs before an activation leaves the triggered state. Checks
//! run in a fixed order and short-circuit on the first failure; every
//! failure carries a distinguishable [`GateReason`] for diagnostics.
//! Nothing here is an error: a blocked activation is an ordinary outcome
//! and no state persists from the attempt.
//!
//! The combo check runs last. It is the one consultation that may touch
//! state, because combo expiry is observed pull-based at evaluation time
//! (see [`crate::combo`]).

use std::fmt;

use crate::ability::{AbilityBook, AbilityId, Elevation};
use crate::caster::{CasterFlags, CasterHost, PoolId};
use crate::combo::{self, ComboDecision};
use crate::engine::TriggerKind;

/// Why the gate refused an activation.
#[derive(Debug, Clone, PartialEq)]
pub enum GateReason {
    /// The ability is disabled on this caster.
    Disabled,
    /// The caster cannot currently act at all.
    CannotAct,
    /// The recast cooldown has not elapsed.
    OnCooldown,
    /// The ability is a toggle and is already on.
    AlreadyToggledOn,
    /// Another toggled-on ability blocks all activation until turned off.
    BlockedByToggle(AbilityId),
    /// The caster is at the wrong elevation.
    WrongElevation,
    /// A blocking hit-reaction is playing and the ability cannot be cast
    /// during it.
    HitReacting,
    /// The required tagged entity near the caster is missing.
    MissingNearby,
    /// A resource pool cannot cover the cost.
    InsufficientResource(PoolId),
    /// Not enough rounds in the clip or ammo pool.
    InsufficientAmmo,
    /// A reload is in progress and cannot be safely interrupted.
    Reloading,
    /// The combo synchronizer refused the ability.
    ComboOutOfOrder,
}

impl fmt::Display for GateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::CannotAct => write!(f, "caster cannot act"),
            Self::OnCooldown => write!(f, "on cooldown"),
            Self::AlreadyToggledOn => write!(f, "already toggled on"),
            Self::BlockedByToggle(id) => write!(f, "blocked by toggled ability {id}"),
            Self::WrongElevation => write!(f, "wrong elevation"),
            Self::HitReacting => write!(f, "in hit reaction"),
            Self::MissingNearby => write!(f, "required nearby entity missing"),
            Self::InsufficientResource(pool) => write!(f, "insufficient {pool}"),
            Self::InsufficientAmmo => write!(f, "insufficient ammo"),
            Self::Reloading => write!(f, "reload in progress"),
            Self::ComboOutOfOrder => write!(f, "combo out of order"),
        }
    }
}

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Every precondition held.
    Pass,
    /// The first failing precondition.
    Blocked(GateReason),
}

impl GateDecision {
    /// Whether the activation may proceed.
    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Evaluates every activation precondition for `id`, in order.
pub fn evaluate<H>(
    book: &mut AbilityBook,
    id: AbilityId,
    host: &H,
    now: f32,
    trigger: TriggerKind,
) -> GateDecision
where
    H: CasterHost + ?Sized,
{
    let Some(entry) = book.entry(id) else {
        return GateDecision::Blocked(GateReason::Disabled);
    };
    let spec = &entry.spec;
    let runtime = &entry.runtime;
    let flags = host.flags();

    if !runtime.enabled {
        return GateDecision::Blocked(GateReason::Disabled);
    }
    if !flags.contains(CasterFlags::CAN_ACT) {
        return GateDecision::Blocked(GateReason::CannotAct);
    }
    if runtime.on_cooldown(now) {
        return GateDecision::Blocked(GateReason::OnCooldown);
    }
    if spec.is_toggle() && runtime.is_toggled_on() {
        return GateDecision::Blocked(GateReason::AlreadyToggledOn);
    }
    if let Some(blocker) = blocking_toggle(book, id) {
        return GateDecision::Blocked(GateReason::BlockedByToggle(blocker));
    }

    match spec.gate.elevation {
        Elevation::Grounded if !flags.contains(CasterFlags::GROUNDED) => {
            return GateDecision::Blocked(GateReason::WrongElevation);
        }
        Elevation::Airborne if !flags.contains(CasterFlags::AIRBORNE) => {
            return GateDecision::Blocked(GateReason::WrongElevation);
        }
        _ => {}
    }
    if flags.contains(CasterFlags::HIT_REACTING) && !spec.gate.usable_during_hit_reaction {
        return GateDecision::Blocked(GateReason::HitReacting);
    }
    if let Some(nearby) = &spec.gate.requires_nearby {
        let found = host
            .entities_within(host.position(), nearby.radius)
            .into_iter()
            .any(|e| e != host.caster_id() && host.tags_of(e).contains(&nearby.tag));
        if !found {
            return GateDecision::Blocked(GateReason::MissingNearby);
        }
    }

    if spec.cost.mana > 0.0 && host.value(&PoolId::mana()) < spec.cost.mana {
        return GateDecision::Blocked(GateReason::InsufficientResource(PoolId::mana()));
    }
    if let Some(stat) = &spec.cost.stat {
        if host.value(&stat.pool) < stat.amount {
            return GateDecision::Blocked(GateReason::InsufficientResource(stat.pool.clone()));
        }
    }

    if spec.cost.rounds_per_shot > 0 {
        if let (Some(clip_spec), Some(clip)) = (&spec.clip, &runtime.clip) {
            if clip.is_reloading() && !clip_spec.interruptible {
                return GateDecision::Blocked(GateReason::Reloading);
            }
            if clip.rounds() < spec.cost.rounds_per_shot {
                return GateDecision::Blocked(GateReason::InsufficientAmmo);
            }
        } else if let Some(pool) = &spec.cost.ammo_pool {
            if host.value(pool) < spec.cost.rounds_per_shot as f32 {
                return GateDecision::Blocked(GateReason::InsufficientAmmo);
            }
        }
    }

    match combo::evaluate(book, id, now, trigger.combo_leeway()) {
        ComboDecision::Proceed { .. } => GateDecision::Pass,
        ComboDecision::Blocked(_) => GateDecision::Blocked(GateReason::ComboOutOfOrder),
    }
}

/// Another ability on this caster that is toggled on and blocks all other
/// activation until turned off.
fn blocking_toggle(book: &AbilityBook, id: AbilityId) -> Option<AbilityId> {
    book.iter()
        .find(|entry| {
            entry.spec.id != id
                && entry.runtime.is_toggled_on()
                && entry.spec.toggle.blocks_others_until_off
        })
        .map(|entry| entry.spec.id)
}

// =============================================================================
// Tests
// =============================================================================
