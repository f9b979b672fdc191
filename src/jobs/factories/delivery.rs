//! Delivery jobs: where carried energy goes

use crate::actions::catalog::ActionKind;
use crate::cache::state_cache::{Category, StateCache};
use crate::core::error::Result;
use crate::core::types::ZoneId;
use crate::jobs::capacity::{adjust_for_in_flight_workers, InFlightContribution};
use crate::jobs::factories::{live, FactoryContext};
use crate::jobs::job::{Job, JobDetail, JobKind, JobTarget, TargetKind};
use crate::world::entity::{Entity, EntityKind};

fn transfer_job(kind: JobKind, entity: &Entity, remaining: u32) -> Job {
    Job::new(
        kind,
        JobTarget::Object(entity.id),
        TargetKind::Entity(entity.kind()),
        ActionKind::Transfer,
        JobDetail::Delivery { remaining },
    )
    .at(entity.pos.clone())
}

fn free_capacity(entity: &Entity) -> u32 {
    entity.store().map(|s| s.free_capacity()).unwrap_or(0)
}

/// Spawns, extensions, thirsty towers and sender links
///
/// Spawns and extensions discount energy already being carried to them.
/// Towers and links report their live free space.
pub fn fill_jobs(
    cache: &mut StateCache,
    ctx: &FactoryContext<'_>,
    zone: &ZoneId,
    force: bool,
) -> Result<Vec<Job>> {
    let upgrader_link = ctx.zone_state.and_then(|state| state.upgrader_link);
    let tower_threshold = ctx.config.tower_fill_threshold;
    let structures = live(ctx, cache.get(ctx.world, zone, Category::Structures, force)?);

    let mut jobs = Vec::new();
    for structure in &structures {
        let free = free_capacity(structure);
        if free == 0 {
            continue;
        }
        match structure.kind() {
            EntityKind::Spawn | EntityKind::Extension => {
                let remaining = adjust_for_in_flight_workers(
                    free,
                    &JobTarget::Object(structure.id),
                    ctx.roster,
                    &[ActionKind::Transfer],
                    InFlightContribution::CarriedEnergy,
                    ctx.config,
                );
                jobs.push(transfer_job(JobKind::Fill, structure, remaining));
            }
            EntityKind::Tower => {
                let capacity = structure.store().map(|s| s.capacity()).unwrap_or(0);
                if (structure.energy() as f32) < capacity as f32 * tower_threshold {
                    jobs.push(transfer_job(JobKind::Fill, structure, free));
                }
            }
            EntityKind::Link if Some(structure.id) != upgrader_link => {
                jobs.push(transfer_job(JobKind::Fill, structure, free));
            }
            _ => {}
        }
    }
    Ok(jobs)
}

/// Storage and terminal with room to spare
pub fn store_jobs(
    cache: &mut StateCache,
    ctx: &FactoryContext<'_>,
    zone: &ZoneId,
    force: bool,
) -> Result<Vec<Job>> {
    let structures = live(ctx, cache.get(ctx.world, zone, Category::Structures, force)?);
    Ok(structures
        .iter()
        .filter(|s| matches!(s.kind(), EntityKind::Storage | EntityKind::Terminal))
        .filter(|s| free_capacity(s) > 0)
        .map(|s| transfer_job(JobKind::Store, s, free_capacity(s)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::core::types::Position;
    use crate::jobs::capacity::{Roster, RosterEntry};
    use crate::policy::capabilities::Role;
    use crate::world::entity::{EntityBody, ResourceKind, Store, WorkerBody};
    use crate::world::sim::{structure, SimWorld};

    #[test]
    fn test_fill_jobs_by_kind() {
        let mut world = SimWorld::new(5);
        let zone = world.add_zone("W1N1");
        world.set_observed(&zone, true);
        let at = |x| Position::new("W1N1", x, 10);

        let spawn = world.spawn(
            at(1),
            structure(
                EntityKind::Spawn,
                5000,
                5000,
                Some(Store::new(300).with(ResourceKind::Energy, 100)),
            ),
        );
        world.spawn(
            at(2),
            structure(
                EntityKind::Extension,
                1000,
                1000,
                Some(Store::new(50).with(ResourceKind::Energy, 50)),
            ),
        );
        let thirsty = world.spawn(
            at(3),
            structure(
                EntityKind::Tower,
                3000,
                3000,
                Some(Store::new(1000).with(ResourceKind::Energy, 500)),
            ),
        );
        world.spawn(
            at(4),
            structure(
                EntityKind::Tower,
                3000,
                3000,
                Some(Store::new(1000).with(ResourceKind::Energy, 900)),
            ),
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
        let jobs = fill_jobs(&mut cache, &ctx, &zone, false).unwrap();
        let targets: Vec<_> = jobs.iter().filter_map(|j| j.target_id()).collect();
        assert_eq!(targets, vec![spawn, thirsty]);
        assert_eq!(jobs[0].remaining(), Some(200));
        assert_eq!(jobs[1].remaining(), Some(500));
    }

    #[test]
    fn test_spawn_fill_discounts_carried_energy() {
        let mut world = SimWorld::new(5);
        let zone = world.add_zone("W1N1");
        world.set_observed(&zone, true);
        world.spawn(
            Position::new(zone.clone(), 10, 10),
            structure(EntityKind::Spawn, 5000, 5000, Some(Store::new(300))),
        );
        let mut body = WorkerBody::new("h", Role::Harvester, zone.clone()).with_parts(1, 4, 0);
        body.store.add(ResourceKind::Energy, 200);
        let carrier = world.spawn(Position::new(zone.clone(), 20, 20), EntityBody::Worker(body));

        let config = EngineConfig::default();
        let mut cache = StateCache::new(config.ttl.clone());
        let empty = Roster::default();
        let ctx = FactoryContext {
            world: &world,
            roster: &empty,
            zone_state: None,
            config: &config,
        };
        let jobs = fill_jobs(&mut cache, &ctx, &zone, false).unwrap();

        let entry =
            RosterEntry::from_entity(world.get(&carrier).unwrap(), Some(jobs[0].clone())).unwrap();
        let roster = Roster::new(vec![entry]);
        let ctx = FactoryContext {
            world: &world,
            roster: &roster,
            zone_state: None,
            config: &config,
        };
        let jobs = fill_jobs(&mut cache, &ctx, &zone, true).unwrap();
        assert_eq!(jobs[0].remaining(), Some(100));
    }
}
