//! Claim-family jobs, targeting whole zones listed in the home zone's document

use crate::actions::catalog::ActionKind;
use crate::cache::state_cache::{Category, StateCache};
use crate::core::error::Result;
use crate::core::types::ZoneId;
use crate::jobs::factories::FactoryContext;
use crate::jobs::job::{Job, JobDetail, JobKind, JobTarget, TargetKind};
use crate::world::entity::{ControllerState, Entity, Ownership};

/// Controller of a zone, if we can currently see one
fn controller_of(
    cache: &mut StateCache,
    ctx: &FactoryContext<'_>,
    zone: &ZoneId,
    force: bool,
) -> Result<Option<Entity>> {
    Ok(cache
        .get(ctx.world, zone, Category::Structures, force)?
        .iter()
        .find(|s| s.controller().is_some())
        .cloned())
}

fn zone_job(
    kind: JobKind,
    zone: &ZoneId,
    action: ActionKind,
    remaining: Option<u32>,
    controller: Option<&Entity>,
) -> Job {
    let job = Job::new(
        kind,
        JobTarget::Zone(zone.clone()),
        TargetKind::ZoneName,
        action,
        JobDetail::Claim { remaining },
    );
    match controller {
        Some(c) => job.at(c.pos.clone()),
        None => job,
    }
}

/// Shared walk over one of the home document's zone lists
fn for_listed_zones<F>(
    cache: &mut StateCache,
    ctx: &FactoryContext<'_>,
    zones: &[ZoneId],
    force: bool,
    mut make: F,
) -> Result<Vec<Job>>
where
    F: FnMut(&ZoneId, Option<&Entity>) -> Option<Job>,
{
    let mut jobs = Vec::new();
    for zone in zones {
        if !ctx.world.zone_known(zone) {
            continue;
        }
        let controller = controller_of(cache, ctx, zone, force)?;
        if let Some(job) = make(zone, controller.as_ref()) {
            jobs.push(job);
        }
    }
    Ok(jobs)
}

fn state_of(controller: Option<&Entity>) -> Option<&ControllerState> {
    controller.and_then(|c| c.controller())
}

/// Zones we want to own; skipped once we see them owned by anyone
pub fn claim_jobs(
    cache: &mut StateCache,
    ctx: &FactoryContext<'_>,
    _zone: &ZoneId,
    force: bool,
) -> Result<Vec<Job>> {
    let zones = ctx.zone_state.map(|s| s.claim_zones.clone()).unwrap_or_default();
    for_listed_zones(cache, ctx, &zones, force, |zone, controller| {
        match state_of(controller) {
            Some(state) if state.owner != Ownership::Unowned => None,
            _ => Some(zone_job(JobKind::Claim, zone, ActionKind::Claim, None, controller)),
        }
    })
}

/// Remote zones; `remaining` is how far our reservation is from the target
pub fn reserve_jobs(
    cache: &mut StateCache,
    ctx: &FactoryContext<'_>,
    _zone: &ZoneId,
    force: bool,
) -> Result<Vec<Job>> {
    let zones = ctx.zone_state.map(|s| s.remote_zones.clone()).unwrap_or_default();
    let target = ctx.config.reserve_target_ticks;
    for_listed_zones(cache, ctx, &zones, force, |zone, controller| {
        let held = state_of(controller).map_or(0, |c| c.my_reservation_ticks());
        let remaining = target.saturating_sub(held);
        Some(zone_job(JobKind::Reserve, zone, ActionKind::Reserve, Some(remaining), controller))
    })
}

/// Zones whose controller belongs to someone else, or that we cannot see yet
pub fn attack_jobs(
    cache: &mut StateCache,
    ctx: &FactoryContext<'_>,
    _zone: &ZoneId,
    force: bool,
) -> Result<Vec<Job>> {
    let zones = ctx.zone_state.map(|s| s.attack_zones.clone()).unwrap_or_default();
    for_listed_zones(cache, ctx, &zones, force, |zone, controller| {
        let hostile = match state_of(controller) {
            None => true,
            Some(state) => {
                matches!(state.owner, Ownership::Foreign(_))
                    || state
                        .reservation
                        .as_ref()
                        .is_some_and(|r| matches!(r.owner, Ownership::Foreign(_)))
            }
        };
        hostile.then(|| {
            zone_job(
                JobKind::AttackController,
                zone,
                ActionKind::AttackController,
                None,
                controller,
            )
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::core::types::Position;
    use crate::jobs::capacity::Roster;
    use crate::memory::zone_state::ZoneState;
    use crate::world::entity::{EntityBody, Reservation};
    use crate::world::sim::SimWorld;

    #[test]
    fn test_reserve_remaining_counts_our_ticks() {
        let mut world = SimWorld::new(2);
        let home = world.add_zone("W1N1");
        let remote = world.add_zone("W2N1");
        world.set_observed(&remote, true);
        let mut controller = ControllerState::unowned();
        controller.reservation = Some(Reservation { owner: Ownership::Mine, ticks_to_end: 1200 });
        world.spawn(Position::new(remote.clone(), 20, 20), EntityBody::Controller(controller));

        let state = ZoneState {
            remote_zones: vec![remote.clone()],
            ..ZoneState::default()
        };
        let config = EngineConfig::default();
        let mut cache = StateCache::new(config.ttl.clone());
        let roster = Roster::default();
        let ctx = FactoryContext {
            world: &world,
            roster: &roster,
            zone_state: Some(&state),
            config: &config,
        };
        let jobs = reserve_jobs(&mut cache, &ctx, &home, false).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].target, JobTarget::Zone(remote));
        assert_eq!(jobs[0].remaining(), Some(3800));
    }

    #[test]
    fn test_claim_skips_owned_and_unknown_zones() {
        let mut world = SimWorld::new(2);
        let home = world.add_zone("W1N1");
        let owned = world.add_zone("W2N1");
        let open = world.add_zone("W3N1");
        world.set_observed(&owned, true);
        world.spawn(
            Position::new(owned.clone(), 20, 20),
            EntityBody::Controller(ControllerState::owned(2)),
        );

        let state = ZoneState {
            claim_zones: vec![owned, open.clone(), ZoneId::from("W99N99")],
            ..ZoneState::default()
        };
        let config = EngineConfig::default();
        let mut cache = StateCache::new(config.ttl.clone());
        let roster = Roster::default();
        let ctx = FactoryContext {
            world: &world,
            roster: &roster,
            zone_state: Some(&state),
            config: &config,
        };
        let jobs = claim_jobs(&mut cache, &ctx, &home, false).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].target, JobTarget::Zone(open));
        assert!(jobs[0].pos.is_none());
    }
}
