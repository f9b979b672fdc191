//! Labor jobs: build, repair, upgrade, sign

use crate::actions::catalog::ActionKind;
use crate::cache::state_cache::{Category, StateCache};
use crate::core::error::Result;
use crate::core::types::ZoneId;
use crate::jobs::factories::FactoryContext;
use crate::jobs::job::{Job, JobDetail, JobKind, JobTarget, TargetKind};
use crate::world::entity::{Entity, EntityKind};

fn labor_job(kind: JobKind, entity: &Entity, action: ActionKind) -> Job {
    Job::new(
        kind,
        JobTarget::Object(entity.id),
        TargetKind::Entity(entity.kind()),
        action,
        JobDetail::Labor,
    )
    .at(entity.pos.clone())
}

pub fn build_jobs(
    cache: &mut StateCache,
    ctx: &FactoryContext<'_>,
    zone: &ZoneId,
    force: bool,
) -> Result<Vec<Job>> {
    let sites = cache.get(ctx.world, zone, Category::ConstructionSites, force)?;
    Ok(sites
        .iter()
        .map(|site| labor_job(JobKind::Build, site, ActionKind::Build))
        .collect())
}

/// Structures below a fraction of their hit ceiling
///
/// `JobKind::Repair` uses the repair threshold and `JobKind::PriorityRepair`
/// the priority threshold. Walls and ramparts are measured against the wall
/// limit of the zone's controller level instead of their own maximum.
pub fn repair_jobs(
    cache: &mut StateCache,
    ctx: &FactoryContext<'_>,
    zone: &ZoneId,
    force: bool,
    kind: JobKind,
) -> Result<Vec<Job>> {
    let threshold = match kind {
        JobKind::PriorityRepair => ctx.config.priority_repair_threshold,
        _ => ctx.config.repair_threshold,
    };
    let structures = cache.get(ctx.world, zone, Category::Structures, force)?;
    let level = structures
        .iter()
        .find_map(|s| s.controller())
        .map_or(0, |c| c.level);

    Ok(structures
        .iter()
        .filter_map(|s| s.structure().map(|state| (s, state)))
        .filter(|(s, state)| {
            let ceiling = if s.kind().is_fortification() {
                state.hits_max.min(ctx.config.wall_limit(level))
            } else {
                state.hits_max
            };
            (state.hits as f32) < ceiling as f32 * threshold
        })
        .map(|(s, _)| labor_job(kind, s, ActionKind::Repair))
        .collect())
}

/// Our own controller
pub fn upgrade_jobs(
    cache: &mut StateCache,
    ctx: &FactoryContext<'_>,
    zone: &ZoneId,
    force: bool,
) -> Result<Vec<Job>> {
    let structures = cache.get(ctx.world, zone, Category::Structures, force)?;
    Ok(structures
        .iter()
        .filter(|s| s.controller().is_some_and(|c| c.is_mine()))
        .map(|s| labor_job(JobKind::Upgrade, s, ActionKind::Upgrade))
        .collect())
}

/// Controllers whose sign differs from ours
pub fn sign_jobs(
    cache: &mut StateCache,
    ctx: &FactoryContext<'_>,
    zone: &ZoneId,
    force: bool,
) -> Result<Vec<Job>> {
    let text = ctx.config.signing_text.as_str();
    let structures = cache.get(ctx.world, zone, Category::Structures, force)?;
    Ok(structures
        .iter()
        .filter(|s| s.kind() == EntityKind::Controller)
        .filter(|s| s.controller().is_some_and(|c| c.sign.as_deref() != Some(text)))
        .map(|s| labor_job(JobKind::Sign, s, ActionKind::Sign))
        .collect())
}
