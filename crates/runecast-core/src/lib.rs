//! # Runecast Core
//!
//! Runtime activation engine for scripted abilities (spells, attacks,
//! item uses) in a real-time game.
//!
//! Each ability is a declarative bundle of cost, targeting, timing, and
//! presentation settings ([`ability::AbilitySpec`]); the engine drives
//! activations through a tick-based phase machine — trigger, gating,
//! target resolution, timed preparation and initiation, dispatch, and
//! cooldown — with cooperative cancellation at every suspension point.
//!
//! ## Architecture
//!
//! - [`ability`]: definitions plus the entity-scoped runtime instance
//!   table (one record per caster × ability)
//! - [`engine`]: the per-ability activation phase machine
//! - [`driver`]: the per-caster composition root ticked by the host
//! - [`target`], [`combo`], [`gate`]: target resolution, combo-lock
//!   synchronization, precondition gating
//! - [`ammo`], [`toggle`], [`clock`]: clip/reload, toggle/scroll, and
//!   timer sub-machines
//! - [`caster`], [`dispatch`], [`hooks`]: the narrow boundaries to the
//!   acting entity, the projectile/ray subsystem, and
//!   presentation/diagnostics
//!
//! ## Usage
//!
//! ```rust,ignore
//! use runecast_core::{ActivationDriver, TriggerKind};
//! use runecast_core::ability::{AbilityId, AbilitySpec, TriggerSlot};
//! use runecast_core::dispatch::TravelRegistry;
//!
//! let fireball = AbilitySpec::new(AbilityId::new(1), "Fireball", TriggerSlot::new(0));
//! let mut driver = ActivationDriver::new(vec![fireball], &TravelRegistry::with_defaults(), seed);
//!
//! // Once per frame:
//! driver.trigger(AbilityId::new(1), TriggerKind::Input);
//! let events = driver.update(&mut host, dt);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ability;
pub mod ammo;
pub mod caster;
pub mod clock;
pub mod combo;
pub mod dispatch;
pub mod driver;
pub mod engine;
pub mod gate;
pub mod hooks;
pub mod target;
pub mod toggle;

#[cfg(test)]
mod tests;

pub use ability::{AbilityBook, AbilityId, AbilitySpec};
pub use driver::ActivationDriver;
pub use engine::{ActivationEvent, InterruptCause, Phase, TriggerKind};
pub use gate::{GateDecision, GateReason};
