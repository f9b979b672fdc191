//! Selection building blocks shared by the role policies
//!
//! Every helper here is read-only with respect to the catalog's contents:
//! nothing marks a job taken, so asking twice in one tick gives the same
//! answer.

use tracing::warn;

use crate::actions::catalog::ActionKind;
use crate::core::config::EngineConfig;
use crate::core::error::Result;
use crate::core::types::{Position, ZoneId};
use crate::jobs::capacity::RosterEntry;
use crate::jobs::catalog::{CatalogView, JobCatalog};
use crate::jobs::job::{Job, JobKind};
use crate::policy::capabilities::{Capability, CapabilitySet, Role};
use crate::world::entity::EntityKind;
use crate::world::query::WorldQuery;

/// Everything a role policy may consult while choosing a job
pub struct SelectionContext<'a> {
    pub catalog: &'a mut JobCatalog,
    pub view: CatalogView<'a>,
    /// The selecting worker as it stands right now
    pub worker: &'a RosterEntry,
    pub capabilities: &'a CapabilitySet,
}

impl<'a> SelectionContext<'a> {
    pub fn new(
        catalog: &'a mut JobCatalog,
        view: CatalogView<'a>,
        worker: &'a RosterEntry,
        capabilities: &'a CapabilitySet,
    ) -> Self {
        Self {
            catalog,
            view,
            worker,
            capabilities,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        self.catalog.config()
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.has(capability)
    }

    /// Jobs of one kind, empty when that kind fails to derive
    ///
    /// A broken family is logged and skipped so the rest of the chain still
    /// gets a say.
    pub fn jobs<P>(
        &mut self,
        zone: &ZoneId,
        kind: JobKind,
        predicate: P,
        force: bool,
    ) -> Result<Vec<Job>>
    where
        P: Fn(&Job) -> bool,
    {
        match self.catalog.get_jobs(&self.view, zone, kind, predicate, force) {
            Ok(jobs) => Ok(jobs),
            Err(err) => {
                warn!(
                    zone = %zone,
                    ?kind,
                    worker = %self.worker.worker,
                    error = %err,
                    "job derivation failed, skipping"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Nearest job of one kind that passes `predicate`
    pub fn nearest_of<P>(
        &mut self,
        zone: &ZoneId,
        kind: JobKind,
        predicate: P,
        force: bool,
    ) -> Result<Option<Job>>
    where
        P: Fn(&Job) -> bool,
    {
        let jobs = self.jobs(zone, kind, predicate, force)?;
        Ok(nearest(self.view.world, &self.worker.pos, jobs))
    }

    /// Relocation directive toward `zone`
    pub fn move_to_zone(&mut self, zone: &ZoneId) -> Result<Option<Job>> {
        Ok(self.jobs(zone, JobKind::Move, |_| true, false)?.into_iter().next())
    }

    pub fn in_zone(&self, zone: &ZoneId) -> bool {
        &self.worker.pos.zone == zone
    }
}

/// Closest job by travel distance; first in list when no distance is known
pub fn nearest(world: &dyn WorldQuery, from: &Position, jobs: Vec<Job>) -> Option<Job> {
    let closest = jobs
        .iter()
        .enumerate()
        .filter_map(|(idx, job)| {
            let pos = job.pos.as_ref()?;
            world.distance(from, pos).map(|d| (d, idx))
        })
        .min_by_key(|(distance, _)| *distance)
        .map_or(0, |(_, idx)| idx);
    jobs.into_iter().nth(closest)
}

fn untaken(job: &Job) -> bool {
    !job.is_taken
}

fn is_fortification(job: &Job) -> bool {
    job.target_entity_kind().is_some_and(|k| k.is_fortification())
}

/// A source job for a worker that harvests
///
/// A source is suitable when what is left of it covers one full window of
/// this worker's extraction. Taken sources are never offered. With
/// closest-source picking enabled the nearest source that still has a free
/// access tile wins, suitable ones first; otherwise the first suitable
/// source, else the first untaken one.
pub fn source_job(ctx: &mut SelectionContext<'_>, zone: &ZoneId) -> Result<Option<Job>> {
    let window = ctx.config().harvest_window(ctx.worker.work_parts);
    let closest = ctx.config().miners_get_closest_source;
    let jobs = ctx.jobs(zone, JobKind::Source, untaken, true)?;
    let suitable: Vec<Job> = jobs.iter().filter(|j| j.energy() >= window).cloned().collect();

    if !closest {
        return Ok(suitable.into_iter().next().or_else(|| jobs.into_iter().next()));
    }

    let pool = if suitable.is_empty() { jobs } else { suitable };
    let world = ctx.view.world;
    let roster = ctx.view.roster;
    let me = ctx.worker.worker;
    let accessible: Vec<Job> = pool
        .into_iter()
        .filter(|job| {
            let tiles = job.pos.as_ref().map_or(0, |pos| world.access_tiles(pos));
            let miners = roster
                .targeting(&job.target, &[ActionKind::Harvest])
                .filter(|entry| entry.worker != me)
                .count() as u32;
            miners < tiles
        })
        .collect();
    Ok(nearest(world, &ctx.worker.pos, accessible))
}

/// Whether the home zone is still short of its wanted miners
fn miners_short(ctx: &SelectionContext<'_>) -> bool {
    let home = &ctx.worker.home_zone;
    let limit = ctx.view.zone_state(home).map_or(0, |s| s.miner_limit);
    (ctx.view.roster.count_role(Role::Miner, home) as u32) < limit
}

/// Whether energy pulled out of storage has somewhere else to go
fn has_spending_outlet(ctx: &mut SelectionContext<'_>, zone: &ZoneId) -> Result<bool> {
    if ctx.capabilities.has_any(&[
        Capability::Build,
        Capability::Repair,
        Capability::WallRepair,
        Capability::Upgrade,
    ]) {
        return Ok(true);
    }
    let fills = ctx.jobs(
        zone,
        JobKind::Fill,
        |j| untaken(j) && j.target_entity_kind() != Some(EntityKind::Link),
        true,
    )?;
    Ok(!fills.is_empty())
}

/// Energy from containers, drops, loot, then storage, as capabilities allow
pub fn energy_job(ctx: &mut SelectionContext<'_>, zone: &ZoneId) -> Result<Option<Job>> {
    let carry = ctx.worker.carry_capacity;
    let worth_a_trip = (carry as f32 * ctx.config().loot_carry_fraction).ceil() as u32;

    if ctx.can(Capability::GetFromContainer) {
        let relaxed = ctx.worker.role == Role::Harvester && miners_short(ctx);
        let found = ctx.nearest_of(
            zone,
            JobKind::Container,
            |j| untaken(j) && (relaxed || j.energy() >= carry),
            false,
        )?;
        if found.is_some() {
            return Ok(found);
        }
    }

    if ctx.can(Capability::GetDroppedEnergy) {
        let found = ctx.nearest_of(
            zone,
            JobKind::Pickup,
            |j| untaken(j) && j.energy() >= worth_a_trip,
            false,
        )?;
        if found.is_some() {
            return Ok(found);
        }
    }

    if ctx.can(Capability::GetLootJobs) {
        let found = ctx.nearest_of(
            zone,
            JobKind::Loot,
            |j| untaken(j) && j.energy() >= worth_a_trip,
            false,
        )?;
        if found.is_some() {
            return Ok(found);
        }
    }

    let from_storage = ctx.can(Capability::GetFromStorage);
    let from_terminal = ctx.can(Capability::GetFromTerminal);
    if (from_storage || from_terminal) && has_spending_outlet(ctx, zone)? {
        let allowed = move |j: &Job| match j.target_entity_kind() {
            Some(EntityKind::Storage) => from_storage,
            Some(EntityKind::Terminal) => from_terminal,
            _ => false,
        };
        return ctx.nearest_of(
            zone,
            JobKind::Backup,
            |j| untaken(j) && allowed(j) && j.energy() >= carry,
            false,
        );
    }

    Ok(None)
}

/// First non-empty step of the worker's delivery chain, nearest within a step
pub fn delivery_job(ctx: &mut SelectionContext<'_>, zone: &ZoneId) -> Result<Option<Job>> {
    delivery_job_where(ctx, zone, |_| true)
}

/// Delivery chain restricted by an extra filter
pub fn delivery_job_where<F>(
    ctx: &mut SelectionContext<'_>,
    zone: &ZoneId,
    extra: F,
) -> Result<Option<Job>>
where
    F: Fn(&Job) -> bool,
{
    for step in ctx.capabilities.delivery_chain() {
        let found = ctx.nearest_of(
            zone,
            step.kind,
            |j| {
                untaken(j)
                    && j.target_entity_kind().is_some_and(|k| step.targets.contains(&k))
                    && extra(j)
            },
            false,
        )?;
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

/// Someone other than this worker is already feeding the controller
fn has_upgrader(ctx: &SelectionContext<'_>, zone: &ZoneId) -> bool {
    ctx.view.roster.entries().iter().any(|entry| {
        entry.worker != ctx.worker.worker
            && ((entry.role == Role::PowerUpgrader && &entry.home_zone == zone)
                || entry.job.as_ref().is_some_and(|job| {
                    job.action == ActionKind::Upgrade
                        && job.pos.as_ref().is_some_and(|p| &p.zone == zone)
                }))
    })
}

/// Labor chain for a worker carrying energy
///
/// 1. upgrade, while nobody else is upgrading
/// 2. priority repair
/// 3. build
/// 4. repair
/// 5. wall and rampart repair
/// 6. upgrade
pub fn labor_job(ctx: &mut SelectionContext<'_>, zone: &ZoneId) -> Result<Option<Job>> {
    let upgrade = ctx.can(Capability::Upgrade);
    let repair = ctx.can(Capability::Repair);
    let walls = ctx.can(Capability::WallRepair);

    if upgrade && !has_upgrader(ctx, zone) {
        let found = ctx.nearest_of(zone, JobKind::Upgrade, untaken, false)?;
        if found.is_some() {
            return Ok(found);
        }
    }

    if repair || walls {
        let found = ctx.nearest_of(
            zone,
            JobKind::PriorityRepair,
            |j| untaken(j) && if is_fortification(j) { walls } else { repair },
            false,
        )?;
        if found.is_some() {
            return Ok(found);
        }
    }

    if ctx.can(Capability::Build) {
        let found = ctx.nearest_of(zone, JobKind::Build, untaken, false)?;
        if found.is_some() {
            return Ok(found);
        }
    }

    if repair {
        let found = ctx.nearest_of(
            zone,
            JobKind::Repair,
            |j| untaken(j) && !is_fortification(j),
            false,
        )?;
        if found.is_some() {
            return Ok(found);
        }
    }

    if walls {
        let found = ctx.nearest_of(
            zone,
            JobKind::Repair,
            |j| untaken(j) && is_fortification(j),
            false,
        )?;
        if found.is_some() {
            return Ok(found);
        }
    }

    if upgrade {
        return ctx.nearest_of(zone, JobKind::Upgrade, untaken, false);
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ObjectId;
    use crate::jobs::job::{JobDetail, JobTarget, TargetKind};
    use crate::world::sim::SimWorld;

    fn job_at(x: u8) -> Job {
        Job::new(
            JobKind::Build,
            JobTarget::Object(ObjectId::new()),
            TargetKind::Entity(EntityKind::ConstructionSite),
            ActionKind::Build,
            JobDetail::Labor,
        )
        .at(Position::new("W1N1", x, 10))
    }

    #[test]
    fn test_nearest_prefers_smaller_distance() {
        let world = SimWorld::new(1);
        let from = Position::new("W1N1", 10, 10);
        let far = job_at(17);
        let near = job_at(13);
        let picked = nearest(&world, &from, vec![far, near.clone()]).unwrap();
        assert_eq!(picked, near);
    }

    #[test]
    fn test_nearest_ties_keep_list_order() {
        let world = SimWorld::new(1);
        let from = Position::new("W1N1", 10, 10);
        let first = job_at(13);
        let second = job_at(7);
        assert_eq!(nearest(&world, &from, vec![first.clone(), second]).unwrap(), first);
    }

    #[test]
    fn test_nearest_without_distance_falls_back_to_first() {
        let world = SimWorld::new(1);
        let from = Position::new("W9N9", 10, 10);
        let first = job_at(40);
        let second = job_at(11);
        assert_eq!(nearest(&world, &from, vec![first.clone(), second]).unwrap(), first);
        assert!(nearest(&world, &from, Vec::new()).is_none());
    }
}
