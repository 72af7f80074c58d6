//! Combo-lock synchronization across a trigger group.
//!
//! All combo-flagged abilities bound to one trigger slot form a chain in
//! declaration order. A successful dispatch sets the dispatching ability's
//! lock with the current timestamp; whichever member holds the most recent
//! lock decides who is "next". The check is pull-based: expiry of the
//! chain window is observed (and the group reset) when the next trigger is
//! evaluated, not by a background timer.
//!
//! A small leeway is always added on top of the declared window; AI
//! triggers receive extra leeway to compensate for reaction latency.

use crate::ability::{AbilityBook, AbilityId};

/// Leeway added to every combo window, seconds.
pub const BASE_LEEWAY: f32 = 0.25;

/// Additional leeway granted to AI-triggered checks, seconds.
pub const AI_EXTRA_LEEWAY: f32 = 0.25;

/// Why a combo check refused an ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboBlock {
    /// No chain is running and this ability is not the chain opener.
    NotChainStart,
    /// A chain is running but this ability is not the next member.
    NotNext,
}

/// Outcome of a combo check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboDecision {
    /// The ability may proceed. `chain_start` is true when no live lock
    /// existed (the chain begins or restarts here).
    Proceed {
        /// Whether this activation opens the chain.
        chain_start: bool,
    },
    /// The ability is refused back to the chain state it came from.
    Blocked(ComboBlock),
}

/// Decides whether a triggered combo ability is next in its chain.
///
/// May mutate the book: observing an expired window or a failed hit
/// requirement resets the group's locks before re-evaluating, per the
/// lock holder's `resets_group_on_break` setting.
///
/// Non-combo abilities trivially proceed.
pub fn evaluate(
    book: &mut AbilityBook,
    id: AbilityId,
    now: f32,
    extra_leeway: f32,
) -> ComboDecision {
    let Some(spec) = book.spec(id) else {
        return ComboDecision::Blocked(ComboBlock::NotChainStart);
    };
    if !spec.is_combo() {
        return ComboDecision::Proceed { chain_start: false };
    }
    let slot = spec.slot;
    let group = book.combo_group(slot);
    let Some(own_idx) = group.iter().position(|&member| member == id) else {
        return ComboDecision::Blocked(ComboBlock::NotChainStart);
    };

    // Find the live lock holder: the member with the most recent lock.
    let holder = group
        .iter()
        .filter_map(|&member| {
            book.runtime(member)
                .and_then(|r| r.combo_lock_at())
                .map(|at| (member, at))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1));

    let Some((holder_id, lock_at)) = holder else {
        return decide_chain_start(own_idx);
    };

    let holder_spec = book
        .spec(holder_id)
        .and_then(|s| s.combo)
        .unwrap_or_default();
    let window = holder_spec.window + BASE_LEEWAY + extra_leeway.max(0.0);
    let window_alive = now - lock_at <= window;
    let hit_ok = !holder_spec.requires_hit
        || book
            .runtime(holder_id)
            .is_some_and(crate::ability::AbilityRuntime::combo_hit_confirmed);

    if !window_alive || !hit_ok {
        // Chain broken: reset and restart from the top.
        reset_group(book, slot, holder_spec.resets_group_on_break, holder_id);
        return decide_chain_start(own_idx);
    }

    let holder_idx = group.iter().position(|&member| member == holder_id);
    let next_idx = holder_idx.map(|i| i + 1);
    match next_idx {
        Some(next) if next >= group.len() => {
            // Chain completed on the previous dispatch; restart.
            reset_group(book, slot, holder_spec.resets_group_on_break, holder_id);
            decide_chain_start(own_idx)
        }
        Some(next) if next == own_idx => ComboDecision::Proceed { chain_start: false },
        _ => ComboDecision::Blocked(ComboBlock::NotNext),
    }
}

/// Records a successful dispatch: clears the group's stale locks and sets
/// this ability's own lock at `now`.
///
/// Keeps the invariant that only the most recent lock in a group is live.
pub fn note_dispatch(book: &mut AbilityBook, id: AbilityId, now: f32) {
    let Some(spec) = book.spec(id) else { return };
    if !spec.is_combo() {
        return;
    }
    let slot = spec.slot;
    for member in book.combo_group(slot) {
        if let Some(runtime) = book.runtime_mut(member) {
            runtime.clear_combo_lock();
        }
    }
    if let Some(runtime) = book.runtime_mut(id) {
        runtime.set_combo_lock(now);
    }
}

/// Releases an ability's own lock after its activation is interrupted.
pub fn clear_own_lock(book: &mut AbilityBook, id: AbilityId) {
    if let Some(runtime) = book.runtime_mut(id) {
        runtime.clear_combo_lock();
    }
}

fn decide_chain_start(own_idx: usize) -> ComboDecision {
    if own_idx == 0 {
        ComboDecision::Proceed { chain_start: true }
    } else {
        ComboDecision::Blocked(ComboBlock::NotChainStart)
    }
}

fn reset_group(book: &mut AbilityBook, slot: crate::ability::TriggerSlot, all: bool, holder: AbilityId) {
    if all {
        for member in book.combo_group(slot) {
            if let Some(runtime) = book.runtime_mut(member) {
                runtime.clear_combo_lock();
            }
        }
    } else if let Some(runtime) = book.runtime_mut(holder) {
        runtime.clear_combo_lock();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::{AbilitySpec, ComboSettings, TriggerSlot};

    fn combo_spec(id: u32, window: f32, requires_hit: bool) -> AbilitySpec {
        let mut spec = AbilitySpec::new(AbilityId::new(id), &format!("combo-{id}"), TriggerSlot::new(0));
        spec.combo = Some(ComboSettings {
            window,
            requires_hit,
            resets_group_on_break: true,
        });
        spec
    }

    fn two_member_book() -> AbilityBook {
        let (book, errors) =
            AbilityBook::build(vec![combo_spec(1, 1.0, false), combo_spec(2, 1.0, false)]);
        assert!(errors.is_empty());
        book
    }

    const A: AbilityId = AbilityId::new(1);
    const B: AbilityId = AbilityId::new(2);

    #[test]
    fn first_member_opens_the_chain() {
        let mut book = two_member_book();
        assert_eq!(
            evaluate(&mut book, A, 0.0, 0.0),
            ComboDecision::Proceed { chain_start: true }
        );
    }

    #[test]
    fn second_member_cannot_open_the_chain() {
        let mut book = two_member_book();
        assert_eq!(
            evaluate(&mut book, B, 0.0, 0.0),
            ComboDecision::Blocked(ComboBlock::NotChainStart)
        );
        // The chain restarts cleanly: the first member proceeds next.
        assert_eq!(
            evaluate(&mut book, A, 0.1, 0.0),
            ComboDecision::Proceed { chain_start: true }
        );
    }

    #[test]
    fn next_member_proceeds_inside_window() {
        let mut book = two_member_book();
        note_dispatch(&mut book, A, 0.0);
        assert_eq!(
            evaluate(&mut book, B, 0.5, 0.0),
            ComboDecision::Proceed { chain_start: false }
        );
    }

    #[test]
    fn window_expiry_resets_the_group() {
        let mut book = two_member_book();
        note_dispatch(&mut book, A, 0.0);

        // Well past window + leeway.
        assert_eq!(
            evaluate(&mut book, B, 5.0, 0.0),
            ComboDecision::Blocked(ComboBlock::NotChainStart)
        );
        assert!(!book.runtime(A).unwrap().is_combo_locked());
    }

    #[test]
    fn expiry_observed_by_first_member_restarts_chain() {
        let mut book = two_member_book();
        note_dispatch(&mut book, A, 0.0);
        assert_eq!(
            evaluate(&mut book, A, 5.0, 0.0),
            ComboDecision::Proceed { chain_start: true }
        );
    }

    #[test]
    fn leeway_keeps_window_alive_slightly_past_declared() {
        let mut book = two_member_book();
        note_dispatch(&mut book, A, 0.0);
        // 1.0 declared + 0.25 base leeway.
        assert_eq!(
            evaluate(&mut book, B, 1.2, 0.0),
            ComboDecision::Proceed { chain_start: false }
        );
    }

    #[test]
    fn ai_leeway_extends_the_window_further() {
        let mut book = two_member_book();
        note_dispatch(&mut book, A, 0.0);
        assert_eq!(
            evaluate(&mut book, B, 1.4, AI_EXTRA_LEEWAY),
            ComboDecision::Proceed { chain_start: false }
        );
    }

    #[test]
    fn retriggering_the_holder_is_not_next() {
        let mut book = two_member_book();
        note_dispatch(&mut book, A, 0.0);
        assert_eq!(
            evaluate(&mut book, A, 0.5, 0.0),
            ComboDecision::Blocked(ComboBlock::NotNext)
        );
    }

    #[test]
    fn missing_required_hit_breaks_the_chain() {
        let (mut book, _) =
            AbilityBook::build(vec![combo_spec(1, 1.0, true), combo_spec(2, 1.0, false)]);
        note_dispatch(&mut book, A, 0.0);

        // No hit confirmed: B is refused and the group resets.
        assert_eq!(
            evaluate(&mut book, B, 0.5, 0.0),
            ComboDecision::Blocked(ComboBlock::NotChainStart)
        );
    }

    #[test]
    fn confirmed_hit_lets_the_chain_continue() {
        let (mut book, _) =
            AbilityBook::build(vec![combo_spec(1, 1.0, true), combo_spec(2, 1.0, false)]);
        note_dispatch(&mut book, A, 0.0);
        book.runtime_mut(A).unwrap().confirm_hit();

        assert_eq!(
            evaluate(&mut book, B, 0.5, 0.0),
            ComboDecision::Proceed { chain_start: false }
        );
    }

    #[test]
    fn chain_completion_restarts_from_the_top() {
        let mut book = two_member_book();
        note_dispatch(&mut book, A, 0.0);
        note_dispatch(&mut book, B, 0.5);

        // B holds the lock and is the last member: the chain restarts.
        assert_eq!(
            evaluate(&mut book, A, 0.6, 0.0),
            ComboDecision::Proceed { chain_start: true }
        );
    }

    #[test]
    fn note_dispatch_keeps_single_live_lock() {
        let mut book = two_member_book();
        note_dispatch(&mut book, A, 0.0);
        note_dispatch(&mut book, B, 0.5);
        assert!(!book.runtime(A).unwrap().is_combo_locked());
        assert!(book.runtime(B).unwrap().is_combo_locked());
    }

    #[test]
    fn break_can_spare_other_members_locks() {
        let mut a = combo_spec(1, 1.0, false);
        a.combo = Some(ComboSettings {
            window: 1.0,
            requires_hit: false,
            resets_group_on_break: false,
        });
        let (mut book, _) = AbilityBook::build(vec![a, combo_spec(2, 1.0, false)]);

        note_dispatch(&mut book, A, 0.0);
        // Manually give B an older lock to observe it surviving the break.
        book.runtime_mut(B).unwrap().set_combo_lock(-1.0);

        let _ = evaluate(&mut book, B, 5.0, 0.0);
        assert!(!book.runtime(A).unwrap().is_combo_locked());
        assert!(book.runtime(B).unwrap().is_combo_locked());
    }

    #[test]
    fn non_combo_ability_trivially_proceeds() {
        let plain = AbilitySpec::new(AbilityId::new(9), "plain", TriggerSlot::new(3));
        let (mut book, _) = AbilityBook::build(vec![plain]);
        assert_eq!(
            evaluate(&mut book, AbilityId::new(9), 0.0, 0.0),
            ComboDecision::Proceed { chain_start: false }
        );
    }
}
