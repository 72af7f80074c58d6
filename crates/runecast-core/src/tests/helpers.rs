//! Test doubles and definition factories shared by the crate's tests.

use std::collections::BTreeMap;

use glam::Vec2;

use crate::ability::{AbilityId, AbilitySpec, TriggerSlot};
use crate::caster::{
    CasterFlags, CasterHost, EntityId, PointQuery, PoolId, ResourceLedger, Selection, StatPools,
    Tag, WorldQuery,
};
use crate::dispatch::{DispatchAdapter, DispatchHandle, RayHit, SpawnRequest};
use crate::hooks::{Diagnostics, PhaseCue, Presentation};

/// Installs a fmt subscriber with a test writer so activation traces show
/// up in failing test output. Safe to call from every test; only the
/// first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Scriptable implementation of every host-side boundary.
///
/// Fields are public so tests can arrange state directly; calls into the
/// dispatch/presentation/diagnostics boundaries are recorded for
/// assertions.
pub struct TestHost {
    /// Handle of the caster itself.
    pub caster: EntityId,
    /// Caster world position.
    pub pos: Vec2,
    /// Unit facing vector.
    pub facing: Vec2,
    /// Momentary capability flags.
    pub flags: CasterFlags,
    /// Entity-wide speed adjustment percentage.
    pub speed_pct: f32,
    /// Backing resource ledger.
    pub pools: StatPools,
    /// Hard-selected target.
    pub current: Option<EntityId>,
    /// Soft target.
    pub soft: Option<EntityId>,
    /// Answer for point selection queries (`None` = still pending).
    pub point: Option<Vec2>,
    /// World entities: position and tags by handle.
    pub world: BTreeMap<EntityId, (Vec2, Vec<Tag>)>,
    /// Whether the caster counts as facing any target.
    pub facing_target: bool,
    /// Spawn requests received, in order.
    pub spawned: Vec<SpawnRequest>,
    /// Handles returned for those spawns.
    pub spawned_handles: Vec<DispatchHandle>,
    /// Handles destroyed through the adapter.
    pub despawned: Vec<DispatchHandle>,
    /// Ray queries received as (origin, direction).
    pub ray_casts: Vec<(Vec2, Vec2)>,
    /// Canned answer for ray queries.
    pub ray_hits: Vec<RayHit>,
    /// Presentation cues played, in order.
    pub cues: Vec<PhaseCue>,
    /// How many times cues were unwound.
    pub cancelled_cues: u32,
    /// Canned presentation progress percentage.
    pub progress: f32,
    /// Diagnostics lines received.
    pub trace: Vec<String>,
    next_handle: u64,
}

impl TestHost {
    /// A grounded, able caster at the origin facing +X with 100 mana.
    pub fn new() -> Self {
        let mut pools = StatPools::new();
        pools.set(PoolId::mana(), 100.0);
        Self {
            caster: EntityId::new(0),
            pos: Vec2::ZERO,
            facing: Vec2::X,
            flags: CasterFlags::default(),
            speed_pct: 100.0,
            pools,
            current: None,
            soft: None,
            point: None,
            world: BTreeMap::new(),
            facing_target: true,
            spawned: Vec::new(),
            spawned_handles: Vec::new(),
            despawned: Vec::new(),
            ray_casts: Vec::new(),
            ray_hits: Vec::new(),
            cues: Vec::new(),
            cancelled_cues: 0,
            progress: 0.0,
            trace: Vec::new(),
            next_handle: 1,
        }
    }

    /// Places an entity in the world.
    pub fn add_entity(&mut self, id: u64, pos: Vec2, tags: &[&str]) -> EntityId {
        let id = EntityId::new(id);
        self.world
            .insert(id, (pos, tags.iter().map(|t| Tag::new(t)).collect()));
        id
    }
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceLedger for TestHost {
    fn value(&self, pool: &PoolId) -> f32 {
        self.pools.value(pool)
    }

    fn adjust(&mut self, pool: &PoolId, delta: f32) {
        self.pools.adjust(pool, delta);
    }
}

impl Selection for TestHost {
    fn current_target(&self) -> Option<EntityId> {
        self.current
    }

    fn soft_target(&self) -> Option<EntityId> {
        self.soft
    }

    fn request_point(&mut self, _query: &PointQuery) -> Option<Vec2> {
        self.point
    }

    fn is_facing(&self, _target: EntityId) -> bool {
        self.facing_target
    }

    fn distance_to(&self, target: EntityId) -> Option<f32> {
        if target == self.caster {
            return Some(0.0);
        }
        self.world
            .get(&target)
            .map(|(pos, _)| pos.distance(self.pos))
    }
}

impl WorldQuery for TestHost {
    fn entities_within(&self, center: Vec2, radius: f32) -> Vec<EntityId> {
        let mut found: Vec<EntityId> = self
            .world
            .iter()
            .filter(|(_, (pos, _))| pos.distance(center) <= radius)
            .map(|(id, _)| *id)
            .collect();
        found.sort();
        found
    }

    fn tags_of(&self, id: EntityId) -> Vec<Tag> {
        self.world
            .get(&id)
            .map(|(_, tags)| tags.clone())
            .unwrap_or_default()
    }

    fn position_of(&self, id: EntityId) -> Option<Vec2> {
        if id == self.caster {
            return Some(self.pos);
        }
        self.world.get(&id).map(|(pos, _)| *pos)
    }
}

impl DispatchAdapter for TestHost {
    fn spawn_projectile(&mut self, request: &SpawnRequest) -> DispatchHandle {
        let handle = DispatchHandle::new(self.next_handle);
        self.next_handle += 1;
        self.spawned.push(request.clone());
        self.spawned_handles.push(handle);
        handle
    }

    fn fire_ray(&mut self, origin: Vec2, direction: Vec2, _radius: f32, _length: f32) -> Vec<RayHit> {
        self.ray_casts.push((origin, direction));
        self.ray_hits.clone()
    }

    fn despawn(&mut self, handle: DispatchHandle) {
        self.despawned.push(handle);
    }
}

impl Presentation for TestHost {
    fn play_phase_cue(&mut self, cue: PhaseCue, _duration_hint: f32) {
        self.cues.push(cue);
    }

    fn progress_pct(&self) -> f32 {
        self.progress
    }

    fn cancel_cues(&mut self) {
        self.cancelled_cues += 1;
    }
}

impl Diagnostics for TestHost {
    fn note(&mut self, line: &str) {
        self.trace.push(line.to_string());
    }
}

impl CasterHost for TestHost {
    fn caster_id(&self) -> EntityId {
        self.caster
    }

    fn position(&self) -> Vec2 {
        self.pos
    }

    fn forward(&self) -> Vec2 {
        self.facing
    }

    fn flags(&self) -> CasterFlags {
        self.flags
    }

    fn global_speed_pct(&self) -> f32 {
        self.speed_pct
    }
}

// =============================================================================
// Definition Factories
// =============================================================================

/// A free, instant, forward-travel ability: the whole pipeline runs in one
/// update.
pub fn instant_spec(id: u32) -> AbilitySpec {
    AbilitySpec::new(AbilityId::new(id), &format!("instant-{id}"), TriggerSlot::new(0))
}

/// An ability with real preparation and initiation durations.
pub fn timed_spec(id: u32, prepare: f32, initiate: f32) -> AbilitySpec {
    let mut spec = instant_spec(id);
    spec.name = format!("timed-{id}");
    spec.timing.prepare = prepare;
    spec.timing.initiate = initiate;
    spec
}
