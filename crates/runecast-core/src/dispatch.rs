//! Dispatch boundary: projectiles, ray queries, and travel strategies.
//!
//! The engine never moves spawned objects itself. At dispatch time it builds
//! a fully-resolved [`SpawnRequest`] and hands it to the host's
//! [`DispatchAdapter`], receiving an opaque [`DispatchHandle`] back for
//! lifetime tracking (toggle teardown, deferred cooldowns).
//!
//! How a spawned object travels is a [`TravelStrategy`] looked up by key in
//! a [`TravelRegistry`] when the ability book is assembled, so definitions
//! stay plain data and no name lookup happens during an activation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::caster::EntityId;

// =============================================================================
// Handles & Spawn Requests
// =============================================================================

/// Opaque handle to an object the host spawned on the engine's behalf.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DispatchHandle(u64);

impl DispatchHandle {
    /// Wraps a raw host handle.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for DispatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DispatchHandle({})", self.0)
    }
}

/// How a dispatched object moves once spawned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TravelMotion {
    /// Straight-line flight along the spawn rotation.
    Linear,
    /// Steers toward its target each frame, limited by `turn_rate` rad/s.
    Homing {
        /// Maximum steering rate in radians per second.
        turn_rate: f32,
    },
    /// Ballistic arc under the given gravity.
    Lobbed {
        /// Downward acceleration applied by the host.
        gravity: f32,
    },
    /// No flight at all: resolved as an instantaneous ray query.
    Instant,
}

/// Resolved travel parameters for one spawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TravelSpec {
    /// Motion model the host should drive.
    pub motion: TravelMotion,
    /// Flight speed in units per second (ignored for `Instant`).
    pub speed: f32,
}

/// A fully-resolved spawn handed to the host at dispatch time.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    /// World position to spawn at.
    pub origin: Vec2,
    /// Facing in radians.
    pub rotation: f32,
    /// Motion model and speed.
    pub travel: TravelSpec,
    /// Hard target reference, when the activation resolved one.
    pub target: Option<EntityId>,
    /// Spatial point the spawn is aimed at (includes any scatter offset).
    pub aim_point: Vec2,
}

/// One hit returned by an instantaneous ray query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// The entity struck.
    pub entity: EntityId,
    /// Where the ray struck it.
    pub point: Vec2,
}

/// External collaborator that turns resolved activations into world objects.
pub trait DispatchAdapter {
    /// Spawns a traveling object and returns a handle for lifetime tracking.
    fn spawn_projectile(&mut self, request: &SpawnRequest) -> DispatchHandle;

    /// Performs an instantaneous swept-ray query.
    fn fire_ray(&mut self, origin: Vec2, direction: Vec2, radius: f32, length: f32) -> Vec<RayHit>;

    /// Destroys a previously spawned object (toggle teardown).
    fn despawn(&mut self, handle: DispatchHandle);
}

// =============================================================================
// Travel Strategies
// =============================================================================

/// What a strategy knows about the activation when resolving travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TravelContext {
    /// Spawn origin.
    pub origin: Vec2,
    /// Point the activation is aimed at.
    pub aim_point: Vec2,
    /// Distance from origin to aim point.
    pub distance: f32,
}

/// Pluggable travel resolution, selected by key at configuration time.
pub trait TravelStrategy: Send + Sync {
    /// Resolves the travel parameters for one spawn.
    fn travel(&self, ctx: &TravelContext) -> TravelSpec;
}

/// Straight-line flight at a fixed speed.
#[derive(Debug, Clone, Copy)]
pub struct LinearTravel {
    /// Flight speed in units per second.
    pub speed: f32,
}

impl TravelStrategy for LinearTravel {
    fn travel(&self, _ctx: &TravelContext) -> TravelSpec {
        TravelSpec {
            motion: TravelMotion::Linear,
            speed: self.speed,
        }
    }
}

/// Target-seeking flight with a bounded turn rate.
#[derive(Debug, Clone, Copy)]
pub struct HomingTravel {
    /// Flight speed in units per second.
    pub speed: f32,
    /// Maximum steering rate in radians per second.
    pub turn_rate: f32,
}

impl TravelStrategy for HomingTravel {
    fn travel(&self, _ctx: &TravelContext) -> TravelSpec {
        TravelSpec {
            motion: TravelMotion::Homing {
                turn_rate: self.turn_rate,
            },
            speed: self.speed,
        }
    }
}

/// No flight: the dispatch becomes an instantaneous ray query.
#[derive(Debug, Clone, Copy)]
pub struct InstantRay;

impl TravelStrategy for InstantRay {
    fn travel(&self, _ctx: &TravelContext) -> TravelSpec {
        TravelSpec {
            motion: TravelMotion::Instant,
            speed: 0.0,
        }
    }
}

/// Registry mapping configuration keys to travel strategies.
///
/// Definitions name their travel by key; the driver resolves keys to
/// strategy handles once when the ability book is assembled.
///
/// # Example
///
/// ```
/// use runecast_core::dispatch::{LinearTravel, TravelRegistry};
///
/// let mut registry = TravelRegistry::with_defaults();
/// registry.register("mortar", LinearTravel { speed: 8.0 });
///
/// assert!(registry.resolve("mortar").is_some());
/// assert!(registry.resolve("linear").is_some());
/// assert!(registry.resolve("warp").is_none());
/// ```
#[derive(Clone, Default)]
pub struct TravelRegistry {
    strategies: BTreeMap<String, Arc<dyn TravelStrategy>>,
}

impl TravelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in strategies registered:
    /// `"linear"`, `"homing"`, and `"ray"`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("linear", LinearTravel { speed: 20.0 });
        registry.register(
            "homing",
            HomingTravel {
                speed: 15.0,
                turn_rate: 4.0,
            },
        );
        registry.register("ray", InstantRay);
        registry
    }

    /// Registers a strategy under `key`, replacing any previous entry.
    pub fn register<S: TravelStrategy + 'static>(&mut self, key: &str, strategy: S) {
        self.strategies.insert(key.to_string(), Arc::new(strategy));
    }

    /// Resolves a key to a strategy handle.
    #[must_use]
    pub fn resolve(&self, key: &str) -> Option<Arc<dyn TravelStrategy>> {
        self.strategies.get(key).cloned()
    }
}

impl fmt::Debug for TravelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TravelRegistry")
            .field("keys", &self.strategies.keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
