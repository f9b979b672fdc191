//! Energy acquisition jobs

use std::collections::BTreeMap;

use crate::actions::catalog::ActionKind;
use crate::cache::state_cache::{Category, StateCache};
use crate::core::error::Result;
use crate::core::types::ZoneId;
use crate::jobs::capacity::{adjust_for_in_flight_workers, InFlightContribution};
use crate::jobs::factories::{live, FactoryContext};
use crate::jobs::job::{Job, JobDetail, JobKind, JobTarget, TargetKind};
use crate::world::entity::{Entity, EntityBody, EntityKind, ResourceKind};

fn resources(resource: ResourceKind, amount: u32) -> JobDetail {
    let mut resources = BTreeMap::new();
    resources.insert(resource, amount);
    JobDetail::Energy { resources }
}

fn job_for(kind: JobKind, entity: &Entity, action: ActionKind, detail: JobDetail) -> Job {
    Job::new(
        kind,
        JobTarget::Object(entity.id),
        TargetKind::Entity(entity.kind()),
        action,
        detail,
    )
    .at(entity.pos.clone())
}

/// Withdraw jobs for stores, reduced by the free carry of workers already on the way
fn withdraw_jobs<'e>(
    kind: JobKind,
    entities: impl Iterator<Item = &'e Entity>,
    ctx: &FactoryContext<'_>,
) -> Vec<Job> {
    entities
        .map(|entity| {
            let target = JobTarget::Object(entity.id);
            let adjusted = adjust_for_in_flight_workers(
                entity.energy(),
                &target,
                ctx.roster,
                &[ActionKind::Withdraw],
                InFlightContribution::FreeCarry,
                ctx.config,
            );
            job_for(kind, entity, ActionKind::Withdraw, resources(ResourceKind::Energy, adjusted))
        })
        .collect()
}

/// One job per source, valued at what is left of a regeneration window
///
/// Each miner already assigned is expected to drain
/// `work_parts * harvest_per_work_part * source_regen_ticks`.
pub fn source_jobs(
    cache: &mut StateCache,
    ctx: &FactoryContext<'_>,
    zone: &ZoneId,
    force: bool,
) -> Result<Vec<Job>> {
    let sources = cache.get(ctx.world, zone, Category::Sources, force)?;
    Ok(sources
        .iter()
        .filter_map(|source| match source.body {
            EntityBody::Source { energy_capacity, .. } => Some((source, energy_capacity)),
            _ => None,
        })
        .map(|(source, capacity)| {
            let adjusted = adjust_for_in_flight_workers(
                capacity,
                &JobTarget::Object(source.id),
                ctx.roster,
                &[ActionKind::Harvest],
                InFlightContribution::HarvestWindow,
                ctx.config,
            );
            job_for(
                JobKind::Source,
                source,
                ActionKind::Harvest,
                resources(ResourceKind::Energy, adjusted),
            )
        })
        .collect())
}

/// Mineral deposits; blocked until an extractor stands on them
pub fn mineral_jobs(
    cache: &mut StateCache,
    ctx: &FactoryContext<'_>,
    zone: &ZoneId,
    force: bool,
) -> Result<Vec<Job>> {
    let extractors: Vec<_> = cache
        .get(ctx.world, zone, Category::Structures, force)?
        .iter()
        .filter(|s| s.kind() == EntityKind::Extractor)
        .map(|s| s.pos.clone())
        .collect();

    let minerals = cache.get(ctx.world, zone, Category::Minerals, force)?;
    Ok(minerals
        .iter()
        .filter_map(|mineral| match mineral.body {
            EntityBody::Mineral { resource, amount } => Some((mineral, resource, amount)),
            _ => None,
        })
        .map(|(mineral, resource, amount)| {
            let has_extractor = extractors.contains(&mineral.pos);
            job_for(JobKind::Mineral, mineral, ActionKind::Harvest, resources(resource, amount))
                .blocked(!has_extractor)
        })
        .collect())
}

pub fn container_jobs(
    cache: &mut StateCache,
    ctx: &FactoryContext<'_>,
    zone: &ZoneId,
    force: bool,
) -> Result<Vec<Job>> {
    let minimum = ctx.config.container_minimum_energy;
    let structures = live(ctx, cache.get(ctx.world, zone, Category::Structures, force)?);
    let containers = structures
        .iter()
        .filter(|s| s.kind() == EntityKind::Container && s.energy() > minimum);
    Ok(withdraw_jobs(JobKind::Container, containers, ctx))
}

/// The link next to the controller, when it holds anything worth taking
pub fn link_jobs(
    cache: &mut StateCache,
    ctx: &FactoryContext<'_>,
    zone: &ZoneId,
    force: bool,
) -> Result<Vec<Job>> {
    let Some(link_id) = ctx.zone_state.and_then(|state| state.upgrader_link) else {
        return Ok(Vec::new());
    };
    let minimum = ctx.config.link_minimum_energy;
    let structures = live(ctx, cache.get(ctx.world, zone, Category::Structures, force)?);
    Ok(structures
        .iter()
        .filter(|s| s.id == link_id && s.kind() == EntityKind::Link && s.energy() > minimum)
        .map(|link| {
            let held = resources(ResourceKind::Energy, link.energy());
            job_for(JobKind::Link, link, ActionKind::Withdraw, held)
        })
        .collect())
}

/// Storage and terminal, reported at their live contents
pub fn backup_jobs(
    cache: &mut StateCache,
    ctx: &FactoryContext<'_>,
    zone: &ZoneId,
    force: bool,
) -> Result<Vec<Job>> {
    let structures = live(ctx, cache.get(ctx.world, zone, Category::Structures, force)?);
    Ok(structures
        .iter()
        .filter(|s| matches!(s.kind(), EntityKind::Storage | EntityKind::Terminal))
        .map(|s| {
            let mut held = BTreeMap::new();
            if let Some(store) = s.store() {
                for (resource, amount) in store.iter().filter(|(_, amount)| *amount > 0) {
                    held.insert(resource, amount);
                }
            }
            held.entry(ResourceKind::Energy).or_insert(0);
            job_for(JobKind::Backup, s, ActionKind::Withdraw, JobDetail::Energy { resources: held })
        })
        .collect())
}

/// Dropped piles, less the free carry of workers already heading to them
pub fn pickup_jobs(
    cache: &mut StateCache,
    ctx: &FactoryContext<'_>,
    zone: &ZoneId,
    force: bool,
) -> Result<Vec<Job>> {
    let drops = live(ctx, cache.get(ctx.world, zone, Category::DroppedResources, force)?);
    Ok(drops
        .iter()
        .filter_map(|drop| match drop.body {
            EntityBody::DroppedResource { resource, amount } => Some((drop, resource, amount)),
            _ => None,
        })
        .map(|(drop, resource, amount)| {
            let adjusted = adjust_for_in_flight_workers(
                amount,
                &JobTarget::Object(drop.id),
                ctx.roster,
                &[ActionKind::Pickup],
                InFlightContribution::FreeCarry,
                ctx.config,
            );
            job_for(JobKind::Pickup, drop, ActionKind::Pickup, resources(resource, adjusted))
        })
        .collect())
}

/// Tombstones and ruins holding at least the configured minimum
pub fn loot_jobs(
    cache: &mut StateCache,
    ctx: &FactoryContext<'_>,
    zone: &ZoneId,
    force: bool,
) -> Result<Vec<Job>> {
    let tombstone_minimum = ctx.config.tombstone_minimum_energy;
    let ruin_minimum = ctx.config.ruin_minimum_energy;

    let tombstones: Vec<Entity> =
        live(ctx, cache.get(ctx.world, zone, Category::Tombstones, force)?)
            .into_iter()
        .filter(|t| t.energy() >= tombstone_minimum)
        .collect();
    let ruins = live(ctx, cache.get(ctx.world, zone, Category::Ruins, force)?);
    let loot = tombstones
        .iter()
        .chain(ruins.iter().filter(|r| r.energy() >= ruin_minimum));
    Ok(withdraw_jobs(JobKind::Loot, loot, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::core::types::Position;
    use crate::jobs::capacity::{Roster, RosterEntry};
    use crate::memory::zone_state::ZoneState;
    use crate::policy::capabilities::Role;
    use crate::world::entity::{Store, WorkerBody};
    use crate::world::sim::{structure, SimWorld};

    fn setup() -> (SimWorld, ZoneId) {
        let mut world = SimWorld::new(11);
        let zone = world.add_zone("W1N1");
        world.set_observed(&zone, true);
        (world, zone)
    }

    fn roster_for(world: &SimWorld, assigned: &[(crate::core::types::ObjectId, Job)]) -> Roster {
        Roster::new(
            assigned
                .iter()
                .filter_map(|(id, job)| RosterEntry::from_entity(world.get(id)?, Some(job.clone())))
                .collect(),
        )
    }

    #[test]
    fn test_source_job_subtracts_harvest_windows() {
        let (mut world, zone) = setup();
        world.spawn(
            Position::new(zone.clone(), 10, 10),
            EntityBody::Source { energy: 3000, energy_capacity: 3000 },
        );
        let config = EngineConfig::default();
        let mut cache = StateCache::new(config.ttl.clone());
        let empty = Roster::default();
        let ctx = FactoryContext {
            world: &world,
            roster: &empty,
            zone_state: None,
            config: &config,
        };
        let jobs = source_jobs(&mut cache, &ctx, &zone, false).unwrap();
        assert_eq!(jobs[0].energy(), 3000);

        let miner = world.spawn(
            Position::new(zone.clone(), 11, 10),
            EntityBody::Worker(WorkerBody::new("m", Role::Miner, zone.clone()).with_parts(3, 0, 0)),
        );
        let roster = roster_for(&world, &[(miner, jobs[0].clone())]);
        let ctx = FactoryContext {
            world: &world,
            roster: &roster,
            zone_state: None,
            config: &config,
        };
        let jobs = source_jobs(&mut cache, &ctx, &zone, true).unwrap();
        // 3000 - 3 * 2 * 300
        assert_eq!(jobs[0].energy(), 1200);
    }

    #[test]
    fn test_container_minimum_and_free_carry() {
        let (mut world, zone) = setup();
        world.spawn(
            Position::new(zone.clone(), 5, 5),
            structure(
                EntityKind::Container,
                1000,
                1000,
                Some(Store::new(2000).with(ResourceKind::Energy, 100)),
            ),
        );
        let full = world.spawn(
            Position::new(zone.clone(), 6, 6),
            structure(
                EntityKind::Container,
                1000,
                1000,
                Some(Store::new(2000).with(ResourceKind::Energy, 500)),
            ),
        );
        let config = EngineConfig::default();
        let mut cache = StateCache::new(config.ttl.clone());
        let empty = Roster::default();
        let ctx = FactoryContext {
            world: &world,
            roster: &empty,
            zone_state: None,
            config: &config,
        };
        let jobs = container_jobs(&mut cache, &ctx, &zone, false).unwrap();
        // 100 is not above the minimum
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].target, JobTarget::Object(full));

        let mut body = WorkerBody::new("l", Role::Lorry, zone.clone()).with_parts(0, 10, 0);
        body.store.add(ResourceKind::Energy, 100);
        let lorry = world.spawn(Position::new(zone.clone(), 20, 20), EntityBody::Worker(body));
        let roster = roster_for(&world, &[(lorry, jobs[0].clone())]);
        let ctx = FactoryContext {
            world: &world,
            roster: &roster,
            zone_state: None,
            config: &config,
        };
        let jobs = container_jobs(&mut cache, &ctx, &zone, true).unwrap();
        // 500 - (500 capacity - 100 carried)
        assert_eq!(jobs[0].energy(), 100);
    }

    #[test]
    fn test_mineral_blocked_without_extractor() {
        let (mut world, zone) = setup();
        world.spawn(
            Position::new(zone.clone(), 40, 40),
            EntityBody::Mineral { resource: ResourceKind::Hydrogen, amount: 70_000 },
        );
        let config = EngineConfig::default();
        let mut cache = StateCache::new(config.ttl.clone());
        let roster = Roster::default();
        let ctx = FactoryContext {
            world: &world,
            roster: &roster,
            zone_state: None,
            config: &config,
        };
        let jobs = mineral_jobs(&mut cache, &ctx, &zone, false).unwrap();
        assert!(jobs[0].blocked);
        assert_eq!(jobs[0].resource(ResourceKind::Hydrogen), 70_000);

        world.spawn(
            Position::new(zone.clone(), 40, 40),
            structure(EntityKind::Extractor, 500, 500, None),
        );
        let ctx = FactoryContext {
            world: &world,
            roster: &roster,
            zone_state: None,
            config: &config,
        };
        let jobs = mineral_jobs(&mut cache, &ctx, &zone, true).unwrap();
        assert!(!jobs[0].blocked);
    }

    #[test]
    fn test_link_job_only_for_upgrader_link() {
        let (mut world, zone) = setup();
        let store = || Some(Store::new(800).with(ResourceKind::Energy, 400));
        let upgrader_link = world.spawn(
            Position::new(zone.clone(), 20, 20),
            structure(EntityKind::Link, 1000, 1000, store()),
        );
        world.spawn(
            Position::new(zone.clone(), 30, 30),
            structure(EntityKind::Link, 1000, 1000, store()),
        );
        let config = EngineConfig::default();
        let mut cache = StateCache::new(config.ttl.clone());
        let roster = Roster::default();
        let state = ZoneState {
            upgrader_link: Some(upgrader_link),
            ..ZoneState::default()
        };
        let ctx = FactoryContext {
            world: &world,
            roster: &roster,
            zone_state: Some(&state),
            config: &config,
        };
        let jobs = link_jobs(&mut cache, &ctx, &zone, false).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].target_id(), Some(upgrader_link));

        let ctx = FactoryContext {
            world: &world,
            roster: &roster,
            zone_state: None,
            config: &config,
        };
        assert!(link_jobs(&mut cache, &ctx, &zone, false).unwrap().is_empty());
    }

    #[test]
    fn test_loot_respects_minimums() {
        let (mut world, zone) = setup();
        world.spawn(
            Position::new(zone.clone(), 3, 3),
            EntityBody::Tombstone {
                store: Store::new(500).with(ResourceKind::Energy, 24),
                decays_at: 1000,
            },
        );
        world.spawn(
            Position::new(zone.clone(), 4, 4),
            EntityBody::Ruin { store: Store::new(500).with(ResourceKind::Energy, 300) },
        );
        let config = EngineConfig::default();
        let mut cache = StateCache::new(config.ttl.clone());
        let roster = Roster::default();
        let ctx = FactoryContext {
            world: &world,
            roster: &roster,
            zone_state: None,
            config: &config,
        };
        let jobs = loot_jobs(&mut cache, &ctx, &zone, false).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].target_kind, TargetKind::Entity(EntityKind::Ruin));
        assert_eq!(jobs[0].energy(), 300);
    }
}
