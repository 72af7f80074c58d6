//! The acting-entity boundary.
//!
//! The activation core never owns the caster: resource pools, target
//! selection, and world queries are reached through the narrow traits in
//! this module. A host implements [`CasterHost`] (which aggregates the
//! per-concern traits plus the dispatch/presentation/diagnostics
//! boundaries) and hands it to the engine each tick.
//!
//! Handles crossing this boundary are plain [`EntityId`]s resolved by the
//! host; the core holds no world references of its own.

use std::collections::BTreeMap;
use std::fmt;

use bitflags::bitflags;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::dispatch::DispatchAdapter;
use crate::hooks::{Diagnostics, Presentation};

/// Pool name for the default mana resource.
pub const MANA_POOL: &str = "mana";

// =============================================================================
// Identity Types
// =============================================================================

/// Handle to an entity in the host's world.
///
/// The core never allocates these; the host supplies them through the
/// selection and world-query traits, and they are compared and ordered
/// only. Ordering by raw value keeps search results deterministic.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Wraps a raw host identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A gameplay tag carried by world entities and ability definitions.
///
/// Tag-proximity targeting matches these against an ability's declared
/// priority list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag(String);

impl Tag {
    /// Creates a tag from a string.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Tag {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Name of a resource pool on the acting entity (mana, rage, ammo stock).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolId(String);

impl PoolId {
    /// Creates a pool name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    /// The default mana pool.
    #[must_use]
    pub fn mana() -> Self {
        Self::new(MANA_POOL)
    }

    /// Returns the pool name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PoolId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// =============================================================================
// Capability Flags
// =============================================================================

bitflags! {
    /// Momentary capability flags sampled from the acting entity.
    ///
    /// The gate and the phase machine read these at suspension points; the
    /// host keeps them current between ticks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CasterFlags: u8 {
        /// The entity may currently begin activations at all.
        const CAN_ACT = 1 << 0;
        /// The entity is standing on the ground.
        const GROUNDED = 1 << 1;
        /// The entity is airborne.
        const AIRBORNE = 1 << 2;
        /// A blocking hit-reaction is playing.
        const HIT_REACTING = 1 << 3;
        /// The activation trigger input is currently held down.
        const TRIGGER_HELD = 1 << 4;
    }
}

impl Default for CasterFlags {
    fn default() -> Self {
        Self::CAN_ACT | Self::GROUNDED
    }
}

// =============================================================================
// External Interfaces
// =============================================================================

/// Kind of point the engine asks the host to select.
#[derive(Debug, Clone, PartialEq)]
pub enum PointQuery {
    /// A ground/world position chosen by the player or AI.
    World,
    /// The point under the crosshair (ray query against world geometry).
    Crosshair,
    /// The point under the mouse cursor.
    Cursor,
    /// A host-defined selection routine, addressed by key.
    Custom(String),
}

/// Resource pools owned by the acting entity.
pub trait ResourceLedger {
    /// Current value of the named pool (0 for unknown pools).
    fn value(&self, pool: &PoolId) -> f32;

    /// Adjusts the named pool by `delta`, clamping at zero.
    fn adjust(&mut self, pool: &PoolId, delta: f32);
}

/// Target selection state exposed by the acting entity.
pub trait Selection {
    /// The entity's hard-selected target, if any.
    fn current_target(&self) -> Option<EntityId>;

    /// The soft (hover/assist) target, if any.
    fn soft_target(&self) -> Option<EntityId>;

    /// Polls an asynchronous point selection.
    ///
    /// Returns `None` while the selection is still pending; the engine
    /// re-polls at each suspension point.
    fn request_point(&mut self, query: &PointQuery) -> Option<Vec2>;

    /// Whether the caster is facing the given entity.
    fn is_facing(&self, target: EntityId) -> bool;

    /// Distance to the given entity, or `None` if it no longer exists.
    fn distance_to(&self, target: EntityId) -> Option<f32>;
}

/// Spatial queries against the host's world.
pub trait WorldQuery {
    /// Entity handles within `radius` of `center`, sorted by id so search
    /// results are deterministic.
    fn entities_within(&self, center: Vec2, radius: f32) -> Vec<EntityId>;

    /// Gameplay tags of the given entity (empty for unknown handles).
    fn tags_of(&self, id: EntityId) -> Vec<Tag>;

    /// World position of the given entity, if it still exists.
    fn position_of(&self, id: EntityId) -> Option<Vec2>;
}

/// Aggregate host boundary handed to the engine each tick.
///
/// One object implements every external concern the activation core
/// consumes: resources, selection, world queries, dispatch, presentation,
/// and diagnostics, plus the caster's own momentary state.
pub trait CasterHost:
    ResourceLedger + Selection + WorldQuery + DispatchAdapter + Presentation + Diagnostics
{
    /// Handle of the acting entity itself.
    fn caster_id(&self) -> EntityId;

    /// Current world position of the caster.
    fn position(&self) -> Vec2;

    /// Unit vector the caster is facing.
    fn forward(&self) -> Vec2;

    /// Momentary capability flags.
    fn flags(&self) -> CasterFlags;

    /// Entity-wide activation speed adjustment percentage (100 = neutral).
    fn global_speed_pct(&self) -> f32;
}

// =============================================================================
// Stat Pools
// =============================================================================

/// Plain map-backed [`ResourceLedger`] for tests and simple hosts.
///
/// Values clamp at zero on adjustment; pools are created on first write.
///
/// # Example
///
/// ```
/// use runecast_core::caster::{PoolId, ResourceLedger, StatPools};
///
/// let mut pools = StatPools::new();
/// pools.set(PoolId::mana(), 50.0);
/// pools.adjust(&PoolId::mana(), -20.0);
/// assert_eq!(pools.value(&PoolId::mana()), 30.0);
///
/// // Never goes below zero.
/// pools.adjust(&PoolId::mana(), -100.0);
/// assert_eq!(pools.value(&PoolId::mana()), 0.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatPools {
    pools: BTreeMap<PoolId, f32>,
}

impl StatPools {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a pool to an absolute value.
    pub fn set(&mut self, pool: PoolId, value: f32) {
        self.pools.insert(pool, value.max(0.0));
    }
}

impl ResourceLedger for StatPools {
    fn value(&self, pool: &PoolId) -> f32 {
        self.pools.get(pool).copied().unwrap_or(0.0)
    }

    fn adjust(&mut self, pool: &PoolId, delta: f32) {
        let entry = self.pools.entry(pool.clone()).or_insert(0.0);
        *entry = (*entry + delta).max(0.0);
    }
}

// =============================================================================
// Tests
// =============================================================================
