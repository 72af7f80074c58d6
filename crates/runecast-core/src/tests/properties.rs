//! Property tests for the numeric invariants of the runtime records.

use proptest::prelude::*;

use crate::ability::{AbilityId, AbilityRuntime, TriggerSlot};
use crate::ammo::{ClipSpec, ClipState, ReloadMode};
use crate::caster::{PoolId, ResourceLedger, StatPools};
use crate::clock::{scaled_duration, PhaseTimer};

fn fresh_runtime() -> AbilityRuntime {
    let spec = crate::ability::AbilitySpec::new(AbilityId::new(1), "probe", TriggerSlot::new(0));
    AbilityRuntime::for_spec(&spec)
}

proptest! {
    // remaining == 0 exactly when the ability is not on cooldown, at any
    // point in time.
    #[test]
    fn cooldown_flag_matches_remaining(duration in 0.0f32..100.0, at in 0.0f32..200.0) {
        let mut runtime = fresh_runtime();
        runtime.start_cooldown(0.0, duration);
        prop_assert_eq!(runtime.on_cooldown(at), runtime.remaining_cooldown(at) > 0.0);
    }

    // Remaining cooldown never increases as time advances.
    #[test]
    fn cooldown_is_monotonically_decreasing(
        duration in 0.0f32..100.0,
        t1 in 0.0f32..200.0,
        dt in 0.0f32..50.0,
    ) {
        let mut runtime = fresh_runtime();
        runtime.start_cooldown(0.0, duration);
        prop_assert!(runtime.remaining_cooldown(t1 + dt) <= runtime.remaining_cooldown(t1));
    }

    // Adjusting a pool up then down by the same amount restores it,
    // as long as the intermediate value never clamped at zero.
    #[test]
    fn pool_adjustment_roundtrips(start in 0.0f32..1000.0, delta in 0.0f32..1000.0) {
        let mut pools = StatPools::new();
        let pool = PoolId::new("ammo");
        pools.set(pool.clone(), start);
        pools.adjust(&pool, delta);
        pools.adjust(&pool, -delta);
        prop_assert!((pools.value(&pool) - start).abs() < 1e-3);
    }

    // Pools never go below zero no matter the adjustment sequence.
    #[test]
    fn pools_never_negative(start in 0.0f32..100.0, deltas in proptest::collection::vec(-50.0f32..50.0, 0..12)) {
        let mut pools = StatPools::new();
        let pool = PoolId::new("ammo");
        pools.set(pool.clone(), start);
        for delta in deltas {
            pools.adjust(&pool, delta);
            prop_assert!(pools.value(&pool) >= 0.0);
        }
    }

    // The clip counter stays inside [0, clip_size] through any sequence
    // of fire and reload steps.
    #[test]
    fn clip_stays_in_bounds(
        clip_size in 1u32..64,
        stock in 0.0f32..500.0,
        ops in proptest::collection::vec(0u8..3, 1..24),
    ) {
        let spec = ClipSpec {
            clip_size,
            reload: ReloadMode::WholeClip { duration: 1.0 },
            stock_pool: PoolId::new("shells"),
            interruptible: true,
        };
        let mut pools = StatPools::new();
        pools.set(PoolId::new("shells"), stock);

        let mut clip = ClipState::full(&spec);
        let mut now = 0.0f32;
        for op in ops {
            match op {
                0 => { clip.fire(1); }
                1 => clip.begin_reload(&spec, now),
                _ => {
                    now += 2.0;
                    clip.tick_reload(&spec, &mut pools, now);
                }
            }
            prop_assert!(clip.rounds() <= clip_size);
        }
    }

    // A whole-clip reload conserves rounds: what the clip gains, the
    // stock loses.
    #[test]
    fn whole_clip_reload_conserves_rounds(
        clip_size in 1u32..64,
        fired in 0u32..64,
        stock in 0.0f32..200.0,
    ) {
        let fired = fired.min(clip_size);
        let spec = ClipSpec {
            clip_size,
            reload: ReloadMode::WholeClip { duration: 1.0 },
            stock_pool: PoolId::new("shells"),
            interruptible: true,
        };
        let stock = stock.floor();
        let mut pools = StatPools::new();
        pools.set(PoolId::new("shells"), stock);

        let mut clip = ClipState::full(&spec);
        clip.fire(fired);
        let before = clip.rounds();

        clip.begin_reload(&spec, 0.0);
        clip.tick_reload(&spec, &mut pools, 2.0);

        let gained = clip.rounds() - before;
        let spent = stock - pools.value(&PoolId::new("shells"));
        prop_assert!((gained as f32 - spent).abs() < 1e-3);
        prop_assert!(clip.rounds() <= clip_size);
    }

    // Hit-stop credit can only push a deadline out, never pull it in.
    #[test]
    fn timer_credit_never_shortens(duration in 0.0f32..50.0, credit in 0.0f32..50.0, at in 0.0f32..100.0) {
        let base = PhaseTimer::new(0.0, duration);
        let mut credited = base;
        credited.credit(credit);
        prop_assert!(credited.remaining(at) >= base.remaining(at));
    }

    // Speed scaling is proportional and sign-preserving for the
    // percentage ranges definitions actually use.
    #[test]
    fn scaled_duration_stays_non_negative(
        base in 0.0f32..100.0,
        ability_pct in 1.0f32..400.0,
        global_pct in 1.0f32..400.0,
    ) {
        prop_assert!(scaled_duration(base, ability_pct, global_pct) >= 0.0);
    }
}
