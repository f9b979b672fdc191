//! Job derivation, one module per family
//!
//! Every factory reads world state through the [`StateCache`] and returns
//! capacity-adjusted jobs. Nothing here caches jobs; that is the catalog's
//! concern.

pub mod claim;
pub mod delivery;
pub mod energy;
pub mod labor;
pub mod movement;

use crate::cache::state_cache::StateCache;
use crate::core::config::EngineConfig;
use crate::core::error::Result;
use crate::core::types::ZoneId;
use crate::jobs::capacity::Roster;
use crate::jobs::job::{Job, JobKind};
use crate::memory::zone_state::ZoneState;
use crate::world::entity::Entity;
use crate::world::query::WorldQuery;

/// Read-only inputs shared by all factories during one derivation
pub struct FactoryContext<'a> {
    pub world: &'a dyn WorldQuery,
    pub roster: &'a Roster,
    /// Document of the zone the jobs are derived for, if it has one
    pub zone_state: Option<&'a ZoneState>,
    pub config: &'a EngineConfig,
}

/// Live copies of snapshot entities, dropping any that have gone
///
/// Snapshots decide which objects exist; store contents are always read
/// from the world so a short job TTL sees current quantities.
pub(crate) fn live(ctx: &FactoryContext<'_>, cached: &[Entity]) -> Vec<Entity> {
    cached.iter().filter_map(|entity| ctx.world.resolve(&entity.id)).collect()
}

/// Derive the current job list of one kind for a zone
pub fn derive_jobs(
    kind: JobKind,
    cache: &mut StateCache,
    ctx: &FactoryContext<'_>,
    zone: &ZoneId,
    force: bool,
) -> Result<Vec<Job>> {
    match kind {
        JobKind::Source => energy::source_jobs(cache, ctx, zone, force),
        JobKind::Mineral => energy::mineral_jobs(cache, ctx, zone, force),
        JobKind::Container => energy::container_jobs(cache, ctx, zone, force),
        JobKind::Link => energy::link_jobs(cache, ctx, zone, force),
        JobKind::Backup => energy::backup_jobs(cache, ctx, zone, force),
        JobKind::Pickup => energy::pickup_jobs(cache, ctx, zone, force),
        JobKind::Loot => energy::loot_jobs(cache, ctx, zone, force),
        JobKind::Fill => delivery::fill_jobs(cache, ctx, zone, force),
        JobKind::Store => delivery::store_jobs(cache, ctx, zone, force),
        JobKind::Build => labor::build_jobs(cache, ctx, zone, force),
        JobKind::Repair | JobKind::PriorityRepair => {
            labor::repair_jobs(cache, ctx, zone, force, kind)
        }
        JobKind::Upgrade => labor::upgrade_jobs(cache, ctx, zone, force),
        JobKind::Sign => labor::sign_jobs(cache, ctx, zone, force),
        JobKind::Claim => claim::claim_jobs(cache, ctx, zone, force),
        JobKind::Reserve => claim::reserve_jobs(cache, ctx, zone, force),
        JobKind::AttackController => claim::attack_jobs(cache, ctx, zone, force),
        JobKind::Move => Ok(vec![movement::move_job(zone)]),
    }
}
