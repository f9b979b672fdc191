//! One assignment policy per civilian role

use crate::cache::state_cache::Category;
use crate::core::error::Result;
use crate::core::types::ObjectId;
use crate::jobs::job::{Job, JobKind, JobTarget};
use crate::policy::capabilities::{Capability, Role};
use crate::policy::select::{self, SelectionContext};
use crate::world::entity::EntityKind;

/// A role's priority chain
pub trait RolePolicy: Send + Sync {
    fn role(&self) -> Role;

    /// Pick at most one job; must not change anything the next call would see
    fn select_job(&self, ctx: &mut SelectionContext<'_>) -> Result<Option<Job>>;

    /// Object to stand on instead of approaching the job target
    fn move_override(
        &self,
        _job: &Job,
        _ctx: &mut SelectionContext<'_>,
    ) -> Result<Option<ObjectId>> {
        Ok(None)
    }
}

/// Static and remote miners
pub struct MinerPolicy {
    role: Role,
}

impl MinerPolicy {
    pub fn new(role: Role) -> Self {
        Self { role }
    }
}

impl RolePolicy for MinerPolicy {
    fn role(&self) -> Role {
        self.role
    }

    fn select_job(&self, ctx: &mut SelectionContext<'_>) -> Result<Option<Job>> {
        if !ctx.can(Capability::HarvestSources) {
            return Ok(None);
        }
        let zone = match self.role {
            Role::RemoteMiner => ctx.worker.target_zone.clone(),
            _ => ctx.worker.home_zone.clone(),
        };
        if !ctx.in_zone(&zone) && !ctx.view.world.is_visible(&zone) {
            return ctx.move_to_zone(&zone);
        }
        select::source_job(ctx, &zone)
    }

    /// The container beside the source, unless another miner already sits on it
    fn move_override(&self, job: &Job, ctx: &mut SelectionContext<'_>) -> Result<Option<ObjectId>> {
        let Some(source_pos) = job.pos.clone() else {
            return Ok(None);
        };
        if job.kind != JobKind::Source {
            return Ok(None);
        }
        let world = ctx.view.world;
        let roster = ctx.view.roster;
        let me = ctx.worker.worker;
        let structures = ctx
            .catalog
            .state_cache_mut()
            .get(world, &source_pos.zone, Category::Structures, false)?;
        Ok(structures
            .iter()
            .filter(|s| s.kind() == EntityKind::Container && s.pos.is_near_to(&source_pos))
            .find(|container| {
                !roster
                    .entries()
                    .iter()
                    .any(|e| e.worker != me && e.role.is_miner() && e.pos == container.pos)
            })
            .map(|container| container.id))
    }
}

pub struct MineralMinerPolicy;

impl RolePolicy for MineralMinerPolicy {
    fn role(&self) -> Role {
        Role::MineralMiner
    }

    fn select_job(&self, ctx: &mut SelectionContext<'_>) -> Result<Option<Job>> {
        let home = ctx.worker.home_zone.clone();
        if ctx.worker.load > 0 {
            return select::delivery_job(ctx, &home);
        }
        if !ctx.can(Capability::HarvestMinerals) {
            return Ok(None);
        }
        ctx.nearest_of(&home, JobKind::Mineral, |j| !j.is_taken, true)
    }
}

/// What an energy-cycling worker does with a full load first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendOrder {
    DeliverFirst,
    LaborFirst,
}

/// Collect energy while empty, spend it while carrying
///
/// Harvesters and lorries deliver first; workers build and repair first.
/// Which links of each chain are live depends on the role's capabilities.
pub struct EnergyCyclePolicy {
    role: Role,
    order: SpendOrder,
}

impl EnergyCyclePolicy {
    pub fn new(role: Role, order: SpendOrder) -> Self {
        Self { role, order }
    }
}

impl RolePolicy for EnergyCyclePolicy {
    fn role(&self) -> Role {
        self.role
    }

    fn select_job(&self, ctx: &mut SelectionContext<'_>) -> Result<Option<Job>> {
        let home = ctx.worker.home_zone.clone();
        if ctx.worker.energy == 0 {
            let found = select::energy_job(ctx, &home)?;
            if found.is_some() || !ctx.can(Capability::HarvestSources) {
                return Ok(found);
            }
            return select::source_job(ctx, &home);
        }

        match self.order {
            SpendOrder::DeliverFirst => match select::delivery_job(ctx, &home)? {
                Some(job) => Ok(Some(job)),
                None => select::labor_job(ctx, &home),
            },
            SpendOrder::LaborFirst => match select::labor_job(ctx, &home)? {
                Some(job) => Ok(Some(job)),
                None => select::delivery_job(ctx, &home),
            },
        }
    }
}

/// Stationary hauler next to storage; only touches adjacent structures
pub struct ManagerPolicy;

impl RolePolicy for ManagerPolicy {
    fn role(&self) -> Role {
        Role::Manager
    }

    fn select_job(&self, ctx: &mut SelectionContext<'_>) -> Result<Option<Job>> {
        let home = ctx.worker.home_zone.clone();
        let here = ctx.worker.pos.clone();
        let adjacent = move |j: &Job| j.pos.as_ref().is_some_and(|p| p.is_near_to(&here));

        if ctx.worker.energy > 0 {
            return select::delivery_job_where(ctx, &home, &adjacent);
        }

        let outlet = ctx
            .jobs(&home, JobKind::Fill, |j| !j.is_taken && adjacent(j), false)?
            .into_iter()
            .next();
        if outlet.is_none() {
            return Ok(None);
        }
        let from_storage = ctx.can(Capability::GetFromStorage);
        let from_terminal = ctx.can(Capability::GetFromTerminal);
        let backups = ctx.jobs(
            &home,
            JobKind::Backup,
            |j| {
                !j.is_taken
                    && adjacent(j)
                    && match j.target_entity_kind() {
                        Some(EntityKind::Storage) => from_storage,
                        Some(EntityKind::Terminal) => from_terminal,
                        _ => false,
                    }
            },
            false,
        )?;
        // storage before terminal
        Ok(backups
            .iter()
            .find(|j| j.target_entity_kind() == Some(EntityKind::Storage))
            .or_else(|| backups.first())
            .cloned())
    }
}

/// Sits at the controller, fed by the upgrader link
pub struct PowerUpgraderPolicy;

impl RolePolicy for PowerUpgraderPolicy {
    fn role(&self) -> Role {
        Role::PowerUpgrader
    }

    fn select_job(&self, ctx: &mut SelectionContext<'_>) -> Result<Option<Job>> {
        let home = ctx.worker.home_zone.clone();
        if ctx.worker.energy > 0 {
            if !ctx.can(Capability::Upgrade) {
                return Ok(None);
            }
            return ctx.nearest_of(&home, JobKind::Upgrade, |_| true, false);
        }
        if ctx.can(Capability::GetFromLink) {
            let found = ctx.nearest_of(&home, JobKind::Link, |j| !j.is_taken, false)?;
            if found.is_some() {
                return Ok(found);
            }
        }
        if ctx.can(Capability::GetFromStorage) {
            return ctx.nearest_of(
                &home,
                JobKind::Backup,
                |j| !j.is_taken && j.target_entity_kind() == Some(EntityKind::Storage),
                false,
            );
        }
        Ok(None)
    }
}

pub struct ClaimerPolicy;

impl RolePolicy for ClaimerPolicy {
    fn role(&self) -> Role {
        Role::Claimer
    }

    fn select_job(&self, ctx: &mut SelectionContext<'_>) -> Result<Option<Job>> {
        let home = ctx.worker.home_zone.clone();
        if ctx.can(Capability::Claim) {
            let found = ctx.nearest_of(&home, JobKind::Claim, |j| !j.is_taken, false)?;
            if found.is_some() {
                return Ok(found);
            }
        }
        if ctx.can(Capability::AttackController) {
            return ctx.nearest_of(&home, JobKind::AttackController, |j| !j.is_taken, false);
        }
        Ok(None)
    }
}

/// Keeps the reservation of its own target zone topped up
pub struct RemoteReserverPolicy;

impl RolePolicy for RemoteReserverPolicy {
    fn role(&self) -> Role {
        Role::RemoteReserver
    }

    fn select_job(&self, ctx: &mut SelectionContext<'_>) -> Result<Option<Job>> {
        if !ctx.can(Capability::Reserve) {
            return Ok(None);
        }
        let home = ctx.worker.home_zone.clone();
        let mine = JobTarget::Zone(ctx.worker.target_zone.clone());
        let jobs = ctx.jobs(&home, JobKind::Reserve, |j| !j.is_taken, false)?;
        Ok(jobs
            .iter()
            .find(|j| j.target == mine)
            .or_else(|| jobs.first())
            .cloned())
    }
}

/// Builds up a newly claimed zone with energy found there
pub struct RemoteColonizerPolicy;

impl RolePolicy for RemoteColonizerPolicy {
    fn role(&self) -> Role {
        Role::RemoteColonizer
    }

    fn select_job(&self, ctx: &mut SelectionContext<'_>) -> Result<Option<Job>> {
        let target = ctx.worker.target_zone.clone();
        if !ctx.in_zone(&target) {
            return ctx.move_to_zone(&target);
        }
        if ctx.worker.energy == 0 {
            let found = select::energy_job(ctx, &target)?;
            if found.is_some() || !ctx.can(Capability::HarvestSources) {
                return Ok(found);
            }
            return select::source_job(ctx, &target);
        }
        select::labor_job(ctx, &target)
    }
}

/// Gathers in a remote zone and hauls home
pub struct RemoteHarvesterPolicy;

impl RolePolicy for RemoteHarvesterPolicy {
    fn role(&self) -> Role {
        Role::RemoteHarvester
    }

    fn select_job(&self, ctx: &mut SelectionContext<'_>) -> Result<Option<Job>> {
        let home = ctx.worker.home_zone.clone();
        let target = ctx.worker.target_zone.clone();
        if ctx.worker.energy > 0 {
            return select::delivery_job(ctx, &home);
        }
        if !ctx.in_zone(&target) {
            return ctx.move_to_zone(&target);
        }
        let found = select::energy_job(ctx, &target)?;
        if found.is_some() || !ctx.can(Capability::HarvestSources) {
            return Ok(found);
        }
        select::source_job(ctx, &target)
    }
}

/// Signs what it finds, then wanders to the next zone nobody has seen
pub struct ScoutPolicy;

impl RolePolicy for ScoutPolicy {
    fn role(&self) -> Role {
        Role::Scout
    }

    fn select_job(&self, ctx: &mut SelectionContext<'_>) -> Result<Option<Job>> {
        let here = ctx.worker.pos.zone.clone();
        if ctx.can(Capability::Sign) {
            let found = ctx.nearest_of(&here, JobKind::Sign, |j| !j.is_taken, false)?;
            if found.is_some() {
                return Ok(found);
            }
        }

        let explored = ctx
            .view
            .zone_state(&ctx.worker.home_zone)
            .map(|s| s.explored_zones.clone())
            .unwrap_or_default();
        let next = ctx
            .view
            .world
            .neighbor_zones(&here)
            .into_iter()
            .find(|zone| zone != &ctx.worker.home_zone && !explored.contains(zone));
        match next {
            Some(zone) => ctx.move_to_zone(&zone),
            None => Ok(None),
        }
    }
}
