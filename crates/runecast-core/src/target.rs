//! Target resolution.
//!
//! Given a declared [`TargetingMode`](crate::ability::TargetingMode) and the
//! caster's current selection state, the resolver produces an object
//! reference, a spatial point, or a structured failure. Point-selection
//! modes poll the host asynchronously: the resolver reports
//! [`ResolveOutcome::Pending`] until the host supplies an answer, and the
//! engine re-polls at each suspension point.
//!
//! Tag-proximity search walks the declared tags in priority order over the
//! entities inside the search radius; candidates may be shuffled first so
//! equally-ranked entities are not always picked in id order. The shuffle
//! uses a seeded RNG, so resolution stays deterministic for a given seed.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use glam::Vec2;

use crate::ability::{TargetingMode, TargetingSettings};
use crate::caster::{EntityId, PointQuery, Selection, WorldQuery};

/// A successfully resolved target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedTarget {
    /// A concrete world entity.
    Entity(EntityId),
    /// A spatial point.
    Point(Vec2),
    /// No fixed target: travel along the caster's facing at dispatch.
    Forward,
}

/// Why resolution failed. Consumed by the gate and diagnostics; never an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveFailure {
    /// No candidate matched the declared mode.
    NoTarget,
    /// A target exists but lies beyond the activation range.
    OutOfRange,
    /// A target exists but the caster is not facing it.
    NotFacing,
}

/// Result of one resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolveOutcome {
    /// Resolution finished.
    Ready(ResolvedTarget),
    /// An asynchronous point selection has not answered yet; poll again
    /// at the next suspension point.
    Pending,
    /// Resolution failed with the given reason.
    Failed(ResolveFailure),
}

/// Stateful resolver; owns the seeded RNG used for shuffle tie-breaks.
#[derive(Debug, Clone)]
pub struct TargetResolver {
    rng: ChaCha8Rng,
}

impl TargetResolver {
    /// Creates a resolver with a deterministic shuffle seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Resolves a target for one activation attempt.
    ///
    /// `caster_id` and `caster_pos` are sampled by the caller before the
    /// borrow so the host is only held once.
    pub fn resolve<H>(
        &mut self,
        settings: &TargetingSettings,
        host: &mut H,
        caster_id: EntityId,
        caster_pos: Vec2,
    ) -> ResolveOutcome
    where
        H: Selection + WorldQuery + ?Sized,
    {
        let outcome = match &settings.mode {
            TargetingMode::Caster => ResolveOutcome::Ready(ResolvedTarget::Entity(caster_id)),
            TargetingMode::Forward => ResolveOutcome::Ready(ResolvedTarget::Forward),
            TargetingMode::Selected => Self::resolve_selected(settings, host),
            TargetingMode::NearestTag => {
                self.resolve_nearest_tag(settings, host, caster_id, caster_pos)
            }
            TargetingMode::World => Self::resolve_point(host, &PointQuery::World),
            TargetingMode::Crosshair => Self::resolve_point(host, &PointQuery::Crosshair),
            TargetingMode::Cursor => Self::resolve_point(host, &PointQuery::Cursor),
            TargetingMode::Custom(key) => {
                Self::resolve_point(host, &PointQuery::Custom(key.clone()))
            }
        };

        // With no target found, a definition may substitute forward travel
        // for this activation only; the declared mode is untouched.
        if settings.no_target_still_travels {
            if let ResolveOutcome::Failed(ResolveFailure::NoTarget) = outcome {
                return ResolveOutcome::Ready(ResolvedTarget::Forward);
            }
        }
        outcome
    }

    fn resolve_selected<H>(settings: &TargetingSettings, host: &H) -> ResolveOutcome
    where
        H: Selection + WorldQuery + ?Sized,
    {
        let target = match host.current_target() {
            Some(t) => Some(t),
            None if settings.allow_soft_target => host.soft_target(),
            None => None,
        };
        let Some(target) = target else {
            return ResolveOutcome::Failed(ResolveFailure::NoTarget);
        };
        let Some(distance) = host.distance_to(target) else {
            return ResolveOutcome::Failed(ResolveFailure::NoTarget);
        };
        if distance > settings.range {
            return ResolveOutcome::Failed(ResolveFailure::OutOfRange);
        }
        if settings.require_facing && !host.is_facing(target) {
            return ResolveOutcome::Failed(ResolveFailure::NotFacing);
        }
        ResolveOutcome::Ready(ResolvedTarget::Entity(target))
    }

    fn resolve_nearest_tag<H>(
        &mut self,
        settings: &TargetingSettings,
        host: &H,
        caster_id: EntityId,
        caster_pos: Vec2,
    ) -> ResolveOutcome
    where
        H: Selection + WorldQuery + ?Sized,
    {
        let mut candidates = host.entities_within(caster_pos, settings.search_radius);
        if settings.shuffle_ties {
            candidates.shuffle(&mut self.rng);
        }

        for tag in &settings.priority_tags {
            for &candidate in &candidates {
                if settings.ignore_self && candidate == caster_id {
                    continue;
                }
                if host.tags_of(candidate).contains(tag) {
                    return ResolveOutcome::Ready(ResolvedTarget::Entity(candidate));
                }
            }
        }
        ResolveOutcome::Failed(ResolveFailure::NoTarget)
    }

    fn resolve_point<H>(host: &mut H, query: &PointQuery) -> ResolveOutcome
    where
        H: Selection + WorldQuery + ?Sized,
    {
        match host.request_point(query) {
            Some(point) => ResolveOutcome::Ready(ResolvedTarget::Point(point)),
            None => ResolveOutcome::Pending,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
