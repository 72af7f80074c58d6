//! Toggle teardown and scroll-equipped ability rotation.
//!
//! Toggle *state* lives on the ability's runtime record; the phase machine
//! flips it on at dispatch. This module owns the teardown path (turning a
//! toggle off destroys every live object it spawned) and the
//! [`ScrollSet`]: an ordered ring of abilities of which one is "equipped"
//! on a dedicated trigger at a time.

use serde::{Deserialize, Serialize};

use crate::ability::{AbilityBook, AbilityId, AbilityRuntime};
use crate::dispatch::DispatchAdapter;

/// Turns a toggle off, destroying every live object it owns.
///
/// Idempotent: a runtime that is already off and owns no handles is left
/// untouched.
pub fn turn_off<A>(runtime: &mut AbilityRuntime, adapter: &mut A)
where
    A: DispatchAdapter + ?Sized,
{
    for handle in runtime.live_handles.drain(..) {
        adapter.despawn(handle);
    }
    runtime.set_toggled_on(false);
}

/// An ordered ring of abilities sharing one equip slot.
///
/// Exactly one member is equipped at a time and owns the slot's trigger;
/// [`advance`](Self::advance) rotates to the next member. Switching away
/// from a toggled-on ability turns it off unless its definition opts out
/// with `persist_on_unequip`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollSet {
    ring: Vec<AbilityId>,
    equipped: usize,
}

impl ScrollSet {
    /// Creates a scroll set over the given ring, equipping the first
    /// member. Returns `None` for an empty ring.
    #[must_use]
    pub fn new(ring: Vec<AbilityId>) -> Option<Self> {
        if ring.is_empty() {
            return None;
        }
        Some(Self { ring, equipped: 0 })
    }

    /// The currently equipped ability.
    #[must_use]
    pub fn equipped(&self) -> AbilityId {
        self.ring[self.equipped]
    }

    /// The abilities in the ring, in rotation order.
    #[must_use]
    pub fn ring(&self) -> &[AbilityId] {
        &self.ring
    }

    /// Rotates to the next ability in the ring and returns it.
    ///
    /// If the ability being switched away from is toggled on and does not
    /// persist across unequip, it is turned off and its live objects are
    /// destroyed.
    pub fn advance<A>(&mut self, book: &mut AbilityBook, adapter: &mut A) -> AbilityId
    where
        A: DispatchAdapter + ?Sized,
    {
        let previous = self.equipped();
        self.equipped = (self.equipped + 1) % self.ring.len();
        let next = self.equipped();
        if next == previous {
            return next;
        }

        let persists = book
            .spec(previous)
            .is_some_and(|spec| spec.toggle.persist_on_unequip);
        if !persists {
            if let Some(runtime) = book.runtime_mut(previous) {
                if runtime.is_toggled_on() {
                    turn_off(runtime, adapter);
                }
            }
        }
        next
    }
}

// =============================================================================
// Tests
// =============================================================================
