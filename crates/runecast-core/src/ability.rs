//! Ability definitions and per-caster runtime records.
//!
//! An [`AbilitySpec`] is the immutable design-time bundle: identity, costs,
//! timing, targeting, combo, toggle, and dispatch settings. The mutable
//! counterpart is [`AbilityRuntime`], one record per (caster, ability) pair:
//! cooldown, combo lock, clip, toggle, and in-flight handle tracking live
//! there and nowhere else, so no state is shared across casters.
//!
//! The [`AbilityBook`] is the entity-scoped instance table holding both
//! halves for every ability the caster owns. It is assembled once at
//! entity setup; cross-references between abilities (linked cascades) are
//! checked at that point so nothing dangles at runtime.
//!
//! # Example
//!
//! ```
//! use runecast_core::ability::{AbilityBook, AbilityId, AbilitySpec, TriggerSlot};
//!
//! let fireball = AbilitySpec::new(AbilityId::new(1), "Fireball", TriggerSlot::new(0));
//! let (book, errors) = AbilityBook::build(vec![fireball]);
//!
//! assert!(errors.is_empty());
//! assert_eq!(book.len(), 1);
//! assert!(!book.runtime(AbilityId::new(1)).unwrap().is_toggled_on());
//! ```

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ammo::{ClipSpec, ClipState};
use crate::caster::{PoolId, Tag};
use crate::clock::PhaseTimer;
use crate::dispatch::DispatchHandle;

// =============================================================================
// Identity
// =============================================================================

/// Identifier of an ability definition within one caster's book.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AbilityId(u32);

impl AbilityId {
    /// Creates an ability id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AbilityId({})", self.0)
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trigger input an ability is bound to.
///
/// Abilities sharing a slot form one combo group.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TriggerSlot(u8);

impl TriggerSlot {
    /// Creates a trigger slot.
    #[must_use]
    pub const fn new(slot: u8) -> Self {
        Self(slot)
    }

    /// Returns the raw slot index.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

// =============================================================================
// Definition Settings
// =============================================================================

/// How an activation finds its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TargetingMode {
    /// The caster targets itself.
    Caster,
    /// The caster's current hard-selected target.
    Selected,
    /// Nearest entity matching a priority-ordered tag list.
    NearestTag,
    /// A world point chosen through the host's point selection.
    World,
    /// Straight ahead along the caster's facing.
    Forward,
    /// The point under the crosshair.
    Crosshair,
    /// The point under the mouse cursor.
    Cursor,
    /// A host-defined selection routine, addressed by key.
    Custom(String),
}

/// Elevation the caster must be at to activate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Elevation {
    /// Must be standing on the ground.
    Grounded,
    /// Must be airborne.
    Airborne,
    /// No elevation requirement.
    Either,
}

/// A named-stat activation cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatCost {
    /// Ledger pool the cost is paid from.
    pub pool: PoolId,
    /// Amount deducted at dispatch.
    pub amount: f32,
}

/// Activation costs, deducted at the dispatch instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSettings {
    /// Mana cost (0 = free).
    pub mana: f32,
    /// Optional named-stat cost on top of mana.
    pub stat: Option<StatCost>,
    /// Rounds consumed per shot (0 = no ammo use). Drawn from the clip
    /// when one is declared, otherwise from `ammo_pool`.
    pub rounds_per_shot: u32,
    /// Direct ammo pool for clip-less ammo users.
    pub ammo_pool: Option<PoolId>,
}

impl Default for CostSettings {
    fn default() -> Self {
        Self {
            mana: 0.0,
            stat: None,
            rounds_per_shot: 0,
            ammo_pool: None,
        }
    }
}

/// Condition for leaving the initiation wait and dispatching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InitiateGate {
    /// Dispatch when the initiation timer elapses.
    FixedDelay,
    /// Dispatch once presentation progress reaches this percentage.
    ProgressPct(f32),
}

/// When the recast cooldown starts counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CooldownStart {
    /// At the dispatch instant, together with cost deduction.
    AtDispatch,
    /// Deferred until every object spawned by the activation is destroyed.
    OnLastHandleGone,
}

/// Phase durations and speed adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSettings {
    /// Base preparation (wind-up) duration, seconds.
    pub prepare: f32,
    /// Base initiation duration, seconds.
    pub initiate: f32,
    /// Recast cooldown, seconds.
    pub cooldown: f32,
    /// Per-ability speed stat percentage applied to prepare/initiate
    /// (100 = unmodified).
    pub speed_pct: f32,
    /// Initiation exit condition.
    pub gate: InitiateGate,
    /// When the cooldown starts.
    pub cooldown_start: CooldownStart,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            prepare: 0.0,
            initiate: 0.0,
            cooldown: 0.0,
            speed_pct: 100.0,
            gate: InitiateGate::FixedDelay,
            cooldown_start: CooldownStart::AtDispatch,
        }
    }
}

/// Cancellation rules for the preparation wait.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PrepareSettings {
    /// The trigger must stay held for the wait to keep advancing; release
    /// aborts instantly.
    pub hold_to_continue: bool,
    /// Moving farther than this from the phase-entry position cancels the
    /// activation.
    pub move_cancel_distance: Option<f32>,
}

/// Targeting configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetingSettings {
    /// Resolution mode.
    pub mode: TargetingMode,
    /// Maximum activation range for object targets.
    pub range: f32,
    /// Search radius for tag-proximity resolution.
    pub search_radius: f32,
    /// Tags accepted, in priority order.
    pub priority_tags: Vec<Tag>,
    /// Shuffle search candidates before scanning, for randomized
    /// tie-break.
    pub shuffle_ties: bool,
    /// Skip the caster itself during tag search.
    pub ignore_self: bool,
    /// Fall back to the soft target when nothing is hard-selected.
    pub allow_soft_target: bool,
    /// On resolution failure, dispatch as forward travel for this
    /// activation instead of failing.
    pub no_target_still_travels: bool,
    /// Re-sample point selection at every suspension point instead of
    /// caching the first answer for the activation.
    pub resample_each_poll: bool,
    /// On resolution failure, suspend and poll until a target appears
    /// (bounded only by external interruption).
    pub loop_until_found: bool,
    /// Require the caster to face the target at final re-validation.
    pub require_facing: bool,
}

impl Default for TargetingSettings {
    fn default() -> Self {
        Self {
            mode: TargetingMode::Forward,
            range: 20.0,
            search_radius: 20.0,
            priority_tags: Vec::new(),
            shuffle_ties: false,
            ignore_self: true,
            allow_soft_target: true,
            no_target_still_travels: false,
            resample_each_poll: false,
            loop_until_found: false,
            require_facing: false,
        }
    }
}

/// Combo-chain membership settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComboSettings {
    /// Seconds after this ability's dispatch during which the next chain
    /// member may proceed.
    pub window: f32,
    /// The chain continues only if this ability registered a confirmed
    /// hit before the window elapsed.
    pub requires_hit: bool,
    /// Whether breaking the chain at this ability resets the other
    /// members' locks.
    pub resets_group_on_break: bool,
}

impl Default for ComboSettings {
    fn default() -> Self {
        Self {
            window: 1.0,
            requires_hit: false,
            resets_group_on_break: true,
        }
    }
}

/// Toggle behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ToggleMode {
    /// Not a toggle ability.
    #[default]
    Off,
    /// Flips on/off on successive trigger edges.
    OnOff,
    /// Stays on only while the trigger is held.
    Hold,
}

/// Toggle configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ToggleSettings {
    /// Toggle mode.
    pub mode: ToggleMode,
    /// While on, every other activation on this caster is blocked.
    pub blocks_others_until_off: bool,
    /// Stays on when a scroll set switches away from this ability.
    pub persist_on_unequip: bool,
}

/// A world-object precondition near the caster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyRequirement {
    /// Tag an entity near the caster must carry.
    pub tag: Tag,
    /// Search radius around the caster.
    pub radius: f32,
}

/// Gate-only preconditions not covered by cost or targeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateSettings {
    /// Elevation requirement.
    pub elevation: Elevation,
    /// Castable while a blocking hit-reaction is playing.
    pub usable_during_hit_reaction: bool,
    /// Required tagged entity near the caster.
    pub requires_nearby: Option<NearbyRequirement>,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            elevation: Elevation::Either,
            usable_during_hit_reaction: false,
            requires_nearby: None,
        }
    }
}

/// One spawn origin of a dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginSpec {
    /// Offset from the caster position, in caster-local units.
    pub offset: Vec2,
    /// Extra delay before this origin fires, seconds.
    pub delay: f32,
    /// Alternatively, fire once presentation progress reaches this
    /// percentage.
    pub progress_pct: Option<f32>,
}

impl Default for OriginSpec {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            delay: 0.0,
            progress_pct: None,
        }
    }
}

/// Swept-ray parameters for instant dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaySettings {
    /// Sweep radius.
    pub radius: f32,
    /// Ray length.
    pub length: f32,
}

/// Dispatch configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// Travel strategy key, resolved against the registry at setup.
    pub travel_key: String,
    /// Spawn origins; one dispatch per entry, in order.
    pub origins: Vec<OriginSpec>,
    /// Radius of the randomized aim-point offset resolved during
    /// initiation (0 = exact aim).
    pub scatter: f32,
    /// Ray parameters for instant travel.
    pub ray: Option<RaySettings>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            travel_key: "linear".to_string(),
            origins: vec![OriginSpec::default()],
            scatter: 0.0,
            ray: None,
        }
    }
}

// =============================================================================
// Ability Spec
// =============================================================================

/// Immutable design-time definition of one ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilitySpec {
    /// Identifier within the caster's book.
    pub id: AbilityId,
    /// Display name, used in diagnostics traces.
    pub name: String,
    /// Gameplay group tags.
    pub tags: Vec<Tag>,
    /// Trigger input this ability is bound to.
    pub slot: TriggerSlot,
    /// Re-trigger automatically whenever the gate passes.
    pub auto_cast: bool,
    /// Activation costs.
    pub cost: CostSettings,
    /// Phase durations and cooldown.
    pub timing: TimingSettings,
    /// Preparation cancellation rules.
    pub prepare: PrepareSettings,
    /// Target resolution settings.
    pub targeting: TargetingSettings,
    /// Combo membership, if any.
    pub combo: Option<ComboSettings>,
    /// Toggle behavior.
    pub toggle: ToggleSettings,
    /// Gate-only preconditions.
    pub gate: GateSettings,
    /// Clip/reload configuration, if ammo splits into stock + clip.
    pub clip: Option<ClipSpec>,
    /// Dispatch configuration.
    pub dispatch: DispatchSettings,
    /// Abilities triggered in cascade after a successful dispatch.
    pub linked: Vec<AbilityId>,
}

impl AbilitySpec {
    /// Creates a definition with neutral defaults: no costs, instant
    /// phases, forward targeting, no combo/toggle/clip.
    #[must_use]
    pub fn new(id: AbilityId, name: &str, slot: TriggerSlot) -> Self {
        Self {
            id,
            name: name.to_string(),
            tags: Vec::new(),
            slot,
            auto_cast: false,
            cost: CostSettings::default(),
            timing: TimingSettings::default(),
            prepare: PrepareSettings::default(),
            targeting: TargetingSettings::default(),
            combo: None,
            toggle: ToggleSettings::default(),
            gate: GateSettings::default(),
            clip: None,
            dispatch: DispatchSettings::default(),
            linked: Vec::new(),
        }
    }

    /// Whether this definition participates in a combo chain.
    #[must_use]
    pub const fn is_combo(&self) -> bool {
        self.combo.is_some()
    }

    /// Whether this definition is a toggle ability.
    #[must_use]
    pub fn is_toggle(&self) -> bool {
        self.toggle.mode != ToggleMode::Off
    }
}

// =============================================================================
// Ability Runtime
// =============================================================================

/// Mutable per-(caster, ability) state.
///
/// Owned by the caster's [`AbilityBook`]; mutated only by the engine
/// driving that caster. The `latest_seq` counter guards against a stale
/// activation's cleanup racing a newer one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityRuntime {
    /// Whether the ability may activate at all.
    pub enabled: bool,
    /// Auto-cast currently switched on (meaningful when the spec allows
    /// auto-cast).
    pub auto_cast_on: bool,
    /// Running recast cooldown, if any.
    cooldown: Option<PhaseTimer>,
    /// Clock time this ability last set its combo lock.
    combo_lock_at: Option<f32>,
    /// A confirmed hit was registered for the current lock.
    combo_hit_confirmed: bool,
    /// The most recent activation ended in interruption.
    pub interrupted: bool,
    /// Clip state, when the definition declares a clip.
    pub clip: Option<ClipState>,
    /// Toggle currently on.
    toggled_on: bool,
    /// Live objects spawned by this ability, for toggle teardown and
    /// deferred cooldowns.
    pub live_handles: Vec<DispatchHandle>,
    /// Sequence number of the newest activation of this ability.
    latest_seq: u64,
    /// Activation whose dispatch deferred the cooldown to handle death.
    deferred_cooldown_seq: Option<u64>,
}

impl AbilityRuntime {
    /// Creates the runtime record matching a definition (full clip when
    /// one is declared).
    #[must_use]
    pub fn for_spec(spec: &AbilitySpec) -> Self {
        Self {
            enabled: true,
            auto_cast_on: spec.auto_cast,
            cooldown: None,
            combo_lock_at: None,
            combo_hit_confirmed: false,
            interrupted: false,
            clip: spec.clip.as_ref().map(ClipState::full),
            toggled_on: false,
            live_handles: Vec::new(),
            latest_seq: 0,
            deferred_cooldown_seq: None,
        }
    }

    /// Seconds of recast cooldown remaining (0 when ready).
    #[must_use]
    pub fn remaining_cooldown(&self, now: f32) -> f32 {
        self.cooldown.map_or(0.0, |timer| timer.remaining(now))
    }

    /// Whether the ability is on cooldown at clock time `now`.
    #[must_use]
    pub fn on_cooldown(&self, now: f32) -> bool {
        self.remaining_cooldown(now) > 0.0
    }

    /// Starts the recast cooldown. Zero-duration cooldowns never block.
    pub fn start_cooldown(&mut self, now: f32, duration: f32) {
        self.deferred_cooldown_seq = None;
        if duration > 0.0 {
            self.cooldown = Some(PhaseTimer::new(now, duration));
        } else {
            self.cooldown = None;
        }
    }

    /// Forwards hit-stop credit to the cooldown and reload timers.
    pub fn credit_timers(&mut self, frozen_dt: f32) {
        if let Some(timer) = &mut self.cooldown {
            timer.credit(frozen_dt);
        }
        if let Some(clip) = &mut self.clip {
            clip.credit(frozen_dt);
        }
    }

    /// Clock time of this ability's combo lock, if it holds one.
    #[must_use]
    pub const fn combo_lock_at(&self) -> Option<f32> {
        self.combo_lock_at
    }

    /// Whether this ability currently holds a combo lock.
    #[must_use]
    pub const fn is_combo_locked(&self) -> bool {
        self.combo_lock_at.is_some()
    }

    /// Whether a confirmed hit was registered for the current lock.
    #[must_use]
    pub const fn combo_hit_confirmed(&self) -> bool {
        self.combo_hit_confirmed
    }

    /// Sets this ability's combo lock at clock time `now`.
    pub fn set_combo_lock(&mut self, now: f32) {
        self.combo_lock_at = Some(now);
        self.combo_hit_confirmed = false;
    }

    /// Registers a confirmed hit against the current lock (no-op without
    /// a lock).
    pub fn confirm_hit(&mut self) {
        if self.combo_lock_at.is_some() {
            self.combo_hit_confirmed = true;
        }
    }

    /// Clears the combo lock and its hit flag.
    pub fn clear_combo_lock(&mut self) {
        self.combo_lock_at = None;
        self.combo_hit_confirmed = false;
    }

    /// Whether the toggle is currently on.
    #[must_use]
    pub const fn is_toggled_on(&self) -> bool {
        self.toggled_on
    }

    /// Flips the toggle on.
    pub fn set_toggled_on(&mut self, on: bool) {
        self.toggled_on = on;
    }

    /// Sequence number of the newest activation.
    #[must_use]
    pub const fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    /// Allocates the next activation sequence number.
    pub fn next_seq(&mut self) -> u64 {
        self.latest_seq += 1;
        self.latest_seq
    }

    /// Marks the given activation as owning a deferred cooldown start.
    pub fn defer_cooldown(&mut self, seq: u64) {
        self.deferred_cooldown_seq = Some(seq);
    }

    /// Activation owning a deferred cooldown start, if any.
    #[must_use]
    pub const fn deferred_cooldown_seq(&self) -> Option<u64> {
        self.deferred_cooldown_seq
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// A malformed definition detail found while assembling a book.
///
/// Configuration errors are reported once and the offending feature
/// degrades to inert; they never halt the caster.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Two definitions share an id; the later one is dropped.
    #[error("duplicate ability id {0}")]
    DuplicateAbility(AbilityId),
    /// A linked cascade names an ability not in the book; the link is
    /// pruned.
    #[error("ability {from} links to unknown ability {to}")]
    DanglingLink {
        /// Ability carrying the link.
        from: AbilityId,
        /// The missing link target.
        to: AbilityId,
    },
    /// A combo window of zero or less can never chain; combo membership
    /// is dropped.
    #[error("ability {0} declares a non-positive combo window")]
    InvalidComboWindow(AbilityId),
    /// A clip that holds no rounds can never fire; the clip is dropped.
    #[error("ability {0} declares a zero-size clip")]
    EmptyClip(AbilityId),
    /// A progress gate outside 0–100 can never trip; it falls back to a
    /// fixed delay.
    #[error("ability {0} declares a progress gate outside 0-100")]
    InvalidProgressGate(AbilityId),
    /// The travel key has no registered strategy; dispatch becomes a
    /// no-op.
    #[error("ability {ability} names unregistered travel strategy '{key}'")]
    UnknownTravelKey {
        /// Ability naming the key.
        ability: AbilityId,
        /// The unregistered key.
        key: String,
    },
}

// =============================================================================
// Ability Book
// =============================================================================

/// One ability's definition plus its runtime record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityEntry {
    /// The immutable definition.
    pub spec: AbilitySpec,
    /// The mutable per-caster state.
    pub runtime: AbilityRuntime,
}

/// Entity-scoped instance table: every ability one caster owns.
///
/// Declaration order is preserved (it decides combo chain order);
/// lookups by id go through a `BTreeMap` so iteration stays
/// deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityBook {
    order: Vec<AbilityId>,
    entries: BTreeMap<AbilityId, AbilityEntry>,
}

impl AbilityBook {
    /// Assembles a book from definitions, sanitizing malformed details.
    ///
    /// Returns the book plus every [`ConfigError`] found. Offending
    /// features are pruned so the rest of the definition stays usable:
    /// duplicate ids are dropped, dangling links removed, degenerate
    /// combo/clip/progress settings disabled.
    #[must_use]
    pub fn build(specs: Vec<AbilitySpec>) -> (Self, Vec<ConfigError>) {
        let mut errors = Vec::new();
        let mut order = Vec::new();
        let mut entries: BTreeMap<AbilityId, AbilityEntry> = BTreeMap::new();

        for mut spec in specs {
            if entries.contains_key(&spec.id) {
                errors.push(ConfigError::DuplicateAbility(spec.id));
                continue;
            }
            if let Some(combo) = spec.combo {
                if combo.window <= 0.0 {
                    errors.push(ConfigError::InvalidComboWindow(spec.id));
                    spec.combo = None;
                }
            }
            if let Some(clip) = &spec.clip {
                if clip.clip_size == 0 {
                    errors.push(ConfigError::EmptyClip(spec.id));
                    spec.clip = None;
                }
            }
            if let InitiateGate::ProgressPct(pct) = spec.timing.gate {
                if !(0.0..=100.0).contains(&pct) {
                    errors.push(ConfigError::InvalidProgressGate(spec.id));
                    spec.timing.gate = InitiateGate::FixedDelay;
                }
            }
            let runtime = AbilityRuntime::for_spec(&spec);
            order.push(spec.id);
            entries.insert(spec.id, AbilityEntry { spec, runtime });
        }

        // Resolve linked cascades now that the member set is known.
        let known: Vec<AbilityId> = entries.keys().copied().collect();
        for entry in entries.values_mut() {
            let from = entry.spec.id;
            entry.spec.linked.retain(|to| {
                let ok = known.contains(to) && *to != from;
                if !ok {
                    errors.push(ConfigError::DanglingLink { from, to: *to });
                }
                ok
            });
        }

        (Self { order, entries }, errors)
    }

    /// Number of abilities in the book.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the book is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ability ids in declaration order.
    #[must_use]
    pub fn declaration_order(&self) -> &[AbilityId] {
        &self.order
    }

    /// Looks up an entry by id.
    #[must_use]
    pub fn entry(&self, id: AbilityId) -> Option<&AbilityEntry> {
        self.entries.get(&id)
    }

    /// Looks up a mutable entry by id.
    #[must_use]
    pub fn entry_mut(&mut self, id: AbilityId) -> Option<&mut AbilityEntry> {
        self.entries.get_mut(&id)
    }

    /// Looks up a definition by id.
    #[must_use]
    pub fn spec(&self, id: AbilityId) -> Option<&AbilitySpec> {
        self.entries.get(&id).map(|e| &e.spec)
    }

    /// Looks up a runtime record by id.
    #[must_use]
    pub fn runtime(&self, id: AbilityId) -> Option<&AbilityRuntime> {
        self.entries.get(&id).map(|e| &e.runtime)
    }

    /// Looks up a mutable runtime record by id.
    #[must_use]
    pub fn runtime_mut(&mut self, id: AbilityId) -> Option<&mut AbilityRuntime> {
        self.entries.get_mut(&id).map(|e| &mut e.runtime)
    }

    /// Combo-flagged abilities bound to `slot`, in declaration order.
    #[must_use]
    pub fn combo_group(&self, slot: TriggerSlot) -> Vec<AbilityId> {
        self.order
            .iter()
            .copied()
            .filter(|id| {
                self.entries
                    .get(id)
                    .is_some_and(|e| e.spec.slot == slot && e.spec.is_combo())
            })
            .collect()
    }

    /// Iterates entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &AbilityEntry> + '_ {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }
}

// =============================================================================
// Tests
// =============================================================================
