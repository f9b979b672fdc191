//! Capacity accounting for workers already committed to a target
//!
//! Factories call [`adjust_for_in_flight_workers`] for every accurate-restore
//! job; readers call [`compute_taken`] whenever they need `is_taken`. The
//! roster is captured at the start of a tick, so decisions made earlier in
//! the same tick are not visible here.

use crate::actions::catalog::ActionKind;
use crate::core::config::EngineConfig;
use crate::core::types::{ObjectId, Position, ZoneId};
use crate::jobs::job::{Job, JobDetail, JobFamily, JobTarget};
use crate::policy::capabilities::Role;
use crate::world::entity::Entity;

/// A friendly worker plus the assignment it committed to in a prior tick
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub worker: ObjectId,
    pub role: Role,
    pub pos: Position,
    pub home_zone: ZoneId,
    pub target_zone: ZoneId,
    pub work_parts: u32,
    pub carry_capacity: u32,
    pub load: u32,
    pub energy: u32,
    pub job: Option<Job>,
}

impl RosterEntry {
    pub fn from_entity(entity: &Entity, job: Option<Job>) -> Option<Self> {
        let body = entity.worker()?;
        Some(Self {
            worker: entity.id,
            role: body.role,
            pos: entity.pos.clone(),
            home_zone: body.home_zone.clone(),
            target_zone: body.target_zone.clone(),
            work_parts: body.work_parts,
            carry_capacity: body.carry_capacity(),
            load: body.load(),
            energy: body.store.energy(),
            job,
        })
    }

    pub fn free_carry(&self) -> u32 {
        self.carry_capacity.saturating_sub(self.load)
    }

    pub fn targets(&self, target: &JobTarget, actions: &[ActionKind]) -> bool {
        self.job
            .as_ref()
            .is_some_and(|job| &job.target == target && actions.contains(&job.action))
    }
}

/// Snapshot of every friendly worker the engine knows about this tick
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn new(mut entries: Vec<RosterEntry>) -> Self {
        entries.sort_by_key(|e| e.worker);
        entries.dedup_by_key(|e| e.worker);
        Self { entries }
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, worker: &ObjectId) -> Option<&RosterEntry> {
        self.entries
            .binary_search_by_key(worker, |e| e.worker)
            .ok()
            .map(|idx| &self.entries[idx])
    }

    /// Workers whose committed job points at `target` with one of `actions`
    pub fn targeting<'a>(
        &'a self,
        target: &'a JobTarget,
        actions: &'a [ActionKind],
    ) -> impl Iterator<Item = &'a RosterEntry> + 'a {
        self.entries.iter().filter(move |e| e.targets(target, actions))
    }

    pub fn count_role(&self, role: Role, zone: &ZoneId) -> usize {
        self.entries
            .iter()
            .filter(|e| e.role == role && &e.home_zone == zone)
            .count()
    }
}

/// How much of a target one in-flight worker is expected to consume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InFlightContribution {
    /// Unused carry space: withdraw and pickup
    FreeCarry,
    /// Energy drained over one regeneration window: harvest
    HarvestWindow,
    /// Energy the worker is carrying to the destination: transfer
    CarriedEnergy,
}

impl InFlightContribution {
    fn of(&self, entry: &RosterEntry, config: &EngineConfig) -> u32 {
        match self {
            InFlightContribution::FreeCarry => entry.free_carry(),
            InFlightContribution::HarvestWindow => config.harvest_window(entry.work_parts),
            InFlightContribution::CarriedEnergy => entry.energy,
        }
    }
}

/// `raw - Σ contribution` over in-flight workers, clamped at zero
pub fn adjust_for_in_flight_workers(
    raw: u32,
    target: &JobTarget,
    roster: &Roster,
    compatible_actions: &[ActionKind],
    contribution: InFlightContribution,
    config: &EngineConfig,
) -> u32 {
    let committed: u64 = roster
        .targeting(target, compatible_actions)
        .map(|entry| contribution.of(entry, config) as u64)
        .sum();
    (raw as u64).saturating_sub(committed) as u32
}

/// Derived `is_taken`; never stored anywhere but the copy handed to a reader
pub fn compute_taken(job: &Job, roster: &Roster) -> bool {
    if job.blocked {
        return true;
    }
    match &job.detail {
        JobDetail::Energy { resources } => resources.values().all(|amount| *amount == 0),
        JobDetail::Delivery { remaining } => *remaining == 0,
        JobDetail::Claim { remaining } => {
            remaining == &Some(0) || roster.targeting(&job.target, &[job.action]).next().is_some()
        }
        JobDetail::Labor | JobDetail::Movement => false,
    }
}

/// Miners a source needs to be drained exactly once per regeneration window
pub fn sufficient_harvesters(
    source_capacity: u32,
    work_parts_per_worker: u32,
    config: &EngineConfig,
) -> u32 {
    let per_worker = config.harvest_window(work_parts_per_worker);
    if per_worker == 0 {
        return 0;
    }
    source_capacity.div_ceil(per_worker)
}

/// Source capacity test used by miners: enough left for one full window
pub fn can_sustain(job: &Job, work_parts: u32, config: &EngineConfig) -> bool {
    job.family() == JobFamily::EnergyAcquisition
        && job.energy() >= config.harvest_window(work_parts)
}
