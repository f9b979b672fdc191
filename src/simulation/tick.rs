//! Tick driver - runs the guard, selection and action for every worker
//!
//! Per tick:
//! zone documents -> roster snapshot -> (per worker) guard -> select -> travel/act -> write back
//!
//! Each worker's turn has its own failure boundary. A fatal error aborts that
//! turn only; the rest of the roster is still evaluated.

use ahash::AHashMap;
use tracing::{debug, error, warn};

use crate::actions::catalog::{handler_for, ActionKind, ActionOutcome};
use crate::cache::state_cache::{Category, StateCache};
use crate::core::config::EngineConfig;
use crate::core::error::{JobError, Result, Severity};
use crate::core::types::{ObjectId, Tick, ZoneId};
use crate::jobs::capacity::{Roster, RosterEntry};
use crate::jobs::catalog::{CatalogView, JobCatalog};
use crate::jobs::job::{JobKind, JobTarget};
use crate::lifecycle::guard::{ClearReason, LifecycleGuard};
use crate::memory::store::ZoneStore;
use crate::memory::zone_state::{Counter, WorkerAssignment, ZonePatch, ZoneState};
use crate::policy::capabilities::{Role, RoleCapabilities};
use crate::policy::registry::{PolicyRegistry, Selection};
use crate::world::query::{World, WorldQuery};

/// Events generated during one tick
///
/// Returned by [`JobEngine::run_tick`] for the driver to display or assert on.
#[derive(Debug, Clone, PartialEq)]
pub enum TickEvent {
    /// A worker committed to a new job
    Assigned {
        worker: ObjectId,
        role: Role,
        kind: JobKind,
        target: JobTarget,
    },
    /// Selection found nothing for this worker
    Idle { worker: ObjectId, role: Role },
    /// The worker reached its job and starts working next tick
    Arrived { worker: ObjectId },
    /// An action was attempted
    Acted {
        worker: ObjectId,
        action: ActionKind,
        outcome: ActionOutcome,
    },
    /// The worker's assignment was dropped
    Cleared { worker: ObjectId, reason: ClearReason },
    /// The worker's turn ended in an error
    Failed {
        worker: ObjectId,
        severity: Severity,
        message: String,
    },
    /// A zone document could not be read; its workers sat this tick out
    ZoneSkipped { zone: ZoneId, message: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: Tick,
    pub workers_evaluated: usize,
    pub events: Vec<TickEvent>,
}

impl TickReport {
    fn new(tick: Tick) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }

    pub fn assigned(&self) -> impl Iterator<Item = (&ObjectId, &JobTarget)> {
        self.events.iter().filter_map(|event| match event {
            TickEvent::Assigned { worker, target, .. } => Some((worker, target)),
            _ => None,
        })
    }

    pub fn cleared(&self) -> impl Iterator<Item = (&ObjectId, ClearReason)> {
        self.events.iter().filter_map(|event| match event {
            TickEvent::Cleared { worker, reason } => Some((worker, *reason)),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &TickEvent> {
        self.events.iter().filter(|event| matches!(event, TickEvent::Failed { .. }))
    }
}

/// Zone documents plus the roster built from them, both fixed for the tick
struct TickSnapshot {
    docs: AHashMap<ZoneId, ZoneState>,
    roster: Roster,
}

pub struct JobEngine<S: ZoneStore> {
    catalog: JobCatalog,
    store: S,
    registry: PolicyRegistry,
    capabilities: RoleCapabilities,
    guard: LifecycleGuard,
    zones: Vec<ZoneId>,
}

impl<S: ZoneStore> JobEngine<S> {
    pub fn new(config: EngineConfig, store: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            catalog: JobCatalog::new(config),
            store,
            registry: PolicyRegistry::default(),
            capabilities: RoleCapabilities::default(),
            guard: LifecycleGuard::new(),
            zones: Vec::new(),
        })
    }

    pub fn with_registry(mut self, registry: PolicyRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_capabilities(mut self, capabilities: RoleCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Zones whose workers this engine drives
    pub fn manage_zone(&mut self, zone: ZoneId) {
        if !self.zones.contains(&zone) {
            self.zones.push(zone);
        }
    }

    pub fn zones(&self) -> &[ZoneId] {
        &self.zones
    }

    pub fn catalog(&self) -> &JobCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut JobCatalog {
        &mut self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn registry_mut(&mut self) -> &mut PolicyRegistry {
        &mut self.registry
    }

    /// What the worker would be assigned right now, without committing it
    pub fn preview_selection<W: WorldQuery>(
        &mut self,
        world: &W,
        worker: &ObjectId,
    ) -> Result<Option<Selection>> {
        let snapshot = self.snapshot(world, &mut TickReport::default());
        let entity = world.resolve(worker).ok_or(JobError::WorkerNotFound(*worker))?;
        let current =
            RosterEntry::from_entity(&entity, None).ok_or(JobError::WorkerNotFound(*worker))?;
        let view = CatalogView::new(world, &snapshot.roster, &snapshot.docs);
        self.registry
            .select_job(&mut self.catalog, view, &current, &self.capabilities)
    }

    /// Evaluate every managed worker once
    pub fn run_tick<W: World>(&mut self, world: &mut W) -> TickReport {
        let mut report = TickReport::new(world.tick());
        let TickSnapshot { mut docs, roster } = self.snapshot(&*world, &mut report);

        let workers: Vec<ObjectId> = roster
            .entries()
            .iter()
            .filter(|entry| !entry.role.is_military())
            .map(|entry| entry.worker)
            .collect();

        for worker in workers {
            report.workers_evaluated += 1;
            if let Err(err) = self.run_worker(world, &roster, &mut docs, worker, &mut report) {
                let severity = err.severity();
                match severity {
                    Severity::Fatal => {
                        error!(worker = %worker, error = %err, "worker turn aborted");
                        if let Some(home) = roster.get(&worker).map(|e| e.home_zone.clone()) {
                            if let Err(store_err) = self.write(
                                &mut docs,
                                &home,
                                ZonePatch::Bump(Counter::FatalErrors),
                            ) {
                                warn!(
                                    zone = %home,
                                    error = %store_err,
                                    "could not record fatal error"
                                );
                            }
                        }
                    }
                    Severity::Informational => debug!(
                        worker = %worker,
                        error = %err,
                        "worker turn ended early"
                    ),
                    Severity::Recoverable => {
                        debug!(worker = %worker, error = %err, "worker skipped");
                        continue;
                    }
                }
                report.events.push(TickEvent::Failed {
                    worker,
                    severity,
                    message: err.to_string(),
                });
            }
        }

        debug!(
            tick = report.tick,
            workers = report.workers_evaluated,
            assigned = report.assigned().count(),
            "tick complete"
        );
        report
    }

    /// Read documents, retire assignments of dead workers, build the roster
    fn snapshot<W: WorldQuery + ?Sized>(
        &mut self,
        world: &W,
        report: &mut TickReport,
    ) -> TickSnapshot {
        let mut docs = AHashMap::new();
        for zone in &self.zones {
            match self.store.read_zone_memory(zone) {
                Ok(state) => {
                    docs.insert(zone.clone(), state);
                }
                Err(err) => {
                    warn!(zone = %zone, error = %err, "skipping zone with unreadable document");
                    report.events.push(TickEvent::ZoneSkipped {
                        zone: zone.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        let zones = self.zones.clone();
        for zone in &zones {
            let dead: Vec<ObjectId> = docs
                .get(zone)
                .map(|state| {
                    state
                        .assignments
                        .iter()
                        .map(|a| a.worker)
                        .filter(|id| world.resolve(id).is_none())
                        .collect()
                })
                .unwrap_or_default();
            for worker in dead {
                debug!(
                    worker = %worker,
                    zone = %zone,
                    "retiring assignment of a worker that no longer exists"
                );
                if let Err(err) = self.write(&mut docs, zone, ZonePatch::ClearAssignment(worker)) {
                    warn!(zone = %zone, error = %err, "could not retire assignment");
                }
            }
        }

        let roster = collect_roster(self.catalog.state_cache_mut(), world, &zones, &docs);
        TickSnapshot { docs, roster }
    }

    fn run_worker<W: World>(
        &mut self,
        world: &mut W,
        roster: &Roster,
        docs: &mut AHashMap<ZoneId, ZoneState>,
        id: ObjectId,
        report: &mut TickReport,
    ) -> Result<()> {
        let entity = world.resolve(&id).ok_or(JobError::WorkerNotFound(id))?;
        let current = RosterEntry::from_entity(&entity, None).ok_or(JobError::WorkerNotFound(id))?;
        if entity.worker().is_some_and(|body| body.spawning) {
            return Ok(());
        }
        let home = current.home_zone.clone();
        let mut assignment = docs
            .get(&home)
            .and_then(|state| state.assignment(&id))
            .cloned()
            .unwrap_or_else(|| WorkerAssignment::new(id));
        let before = assignment.clone();

        // a worker whose target vanished idles this tick and selects next tick
        if let Some(reason) = self.guard.check(&*world, &mut assignment) {
            self.note_cleared(docs, &home, id, reason, report)?;
            return self.persist(docs, &home, &before, assignment);
        }

        let mut assigned = false;
        if assignment.is_idle() {
            let view = CatalogView::new(&*world, roster, &*docs);
            match self
                .registry
                .select_job(&mut self.catalog, view, &current, &self.capabilities)?
            {
                Some(selection) => {
                    // an unperformable pairing fails the turn before anything is committed
                    handler_for(selection.job.target_kind, selection.job.action)?;
                    report.events.push(TickEvent::Assigned {
                        worker: id,
                        role: current.role,
                        kind: selection.job.kind,
                        target: selection.job.target.clone(),
                    });
                    assignment.commit(selection.job);
                    assignment.move_target_override = selection.move_target_override;
                    assigned = true;
                }
                None => report.events.push(TickEvent::Idle {
                    worker: id,
                    role: current.role,
                }),
            }
        }

        if let Some(job) = assignment.job.clone() {
            let mut act = assignment.is_working;
            if !act {
                if self.guard.has_arrived(&*world, &entity, &assignment) {
                    assignment.is_working = true;
                    act = true;
                } else if let Some(goal) = self.guard.move_target(&assignment) {
                    match world.move_to(&id, &goal.target, goal.range) {
                        Ok(()) => {
                            let arrived = world
                                .resolve(&id)
                                .is_some_and(|moved| {
                                    self.guard.has_arrived(&*world, &moved, &assignment)
                                });
                            if arrived {
                                assignment.is_working = true;
                                report.events.push(TickEvent::Arrived { worker: id });
                            }
                        }
                        Err(JobError::TargetLost(_)) | Err(JobError::UnknownZone(_)) => {
                            if let Some(reason) = self.guard.abandon(&mut assignment) {
                                self.note_cleared(docs, &home, id, reason, report)?;
                            }
                        }
                        Err(err) => return Err(err),
                    }
                }
            }

            if act {
                let handler = handler_for(job.target_kind, job.action)?;
                match world.perform(&id, handler, &job.target) {
                    Ok(outcome) => {
                        report.events.push(TickEvent::Acted {
                            worker: id,
                            action: job.action,
                            outcome,
                        });
                        if let Some(reason) = self.guard.record_outcome(&mut assignment, outcome) {
                            self.note_cleared(docs, &home, id, reason, report)?;
                            if let (JobKind::Move, ClearReason::Completed, JobTarget::Zone(zone)) =
                                (job.kind, reason, &job.target)
                            {
                                self.write(docs, &home, ZonePatch::MarkExplored(zone.clone()))?;
                            }
                        }
                    }
                    Err(JobError::TargetLost(_)) | Err(JobError::UnknownZone(_)) => {
                        if let Some(reason) = self.guard.abandon(&mut assignment) {
                            self.note_cleared(docs, &home, id, reason, report)?;
                        }
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        self.persist(docs, &home, &before, assignment)?;
        if assigned {
            self.write(docs, &home, ZonePatch::Bump(Counter::JobsAssigned))?;
        }
        Ok(())
    }

    /// Write the assignment back if the turn changed it
    fn persist(
        &mut self,
        docs: &mut AHashMap<ZoneId, ZoneState>,
        home: &ZoneId,
        before: &WorkerAssignment,
        assignment: WorkerAssignment,
    ) -> Result<()> {
        if &assignment == before {
            return Ok(());
        }
        let patch = if assignment.is_idle() {
            ZonePatch::ClearAssignment(assignment.worker)
        } else {
            ZonePatch::SetAssignment(assignment)
        };
        self.write(docs, home, patch)
    }

    fn note_cleared(
        &mut self,
        docs: &mut AHashMap<ZoneId, ZoneState>,
        home: &ZoneId,
        worker: ObjectId,
        reason: ClearReason,
        report: &mut TickReport,
    ) -> Result<()> {
        report.events.push(TickEvent::Cleared { worker, reason });
        self.write(docs, home, ZonePatch::Bump(Counter::AssignmentsCleared))?;
        if matches!(reason, ClearReason::TargetLost | ClearReason::UnknownZone) {
            debug!(worker = %worker, ?reason, "target disappeared, assignment abandoned");
            self.write(docs, home, ZonePatch::Bump(Counter::TargetsLost))?;
        }
        Ok(())
    }

    /// Persist a patch and mirror it into this tick's documents
    fn write(
        &mut self,
        docs: &mut AHashMap<ZoneId, ZoneState>,
        zone: &ZoneId,
        patch: ZonePatch,
    ) -> Result<()> {
        self.store.write_zone_memory(zone, patch.clone())?;
        if let Some(state) = docs.get_mut(zone) {
            state.apply(patch);
        }
        Ok(())
    }
}

/// Workers of the managed zones, wherever the roster snapshots place them
///
/// Scans each managed zone, the zones it sends workers into and the zones
/// its scouts have explored. Workers holding an assignment are added even
/// when no snapshot lists them yet.
fn collect_roster<W: WorldQuery + ?Sized>(
    cache: &mut StateCache,
    world: &W,
    zones: &[ZoneId],
    docs: &AHashMap<ZoneId, ZoneState>,
) -> Roster {
    let mut scan: Vec<ZoneId> = Vec::new();
    for zone in zones {
        let Some(state) = docs.get(zone) else {
            continue;
        };
        for candidate in std::iter::once(zone)
            .chain(state.dependent_zones())
            .chain(state.explored_zones.iter())
        {
            if !scan.contains(candidate) {
                scan.push(candidate.clone());
            }
        }
    }

    let job_of = |id: &ObjectId, home: &ZoneId| {
        docs.get(home)
            .and_then(|state| state.assignment(id))
            .and_then(|a| a.job.clone())
    };

    let mut entries = Vec::new();
    for zone in &scan {
        let workers = match cache.get(world, zone, Category::FriendlyRoster, false) {
            Ok(workers) => workers,
            Err(err) => {
                warn!(zone = %zone, error = %err, "could not read friendly roster");
                continue;
            }
        };
        for entity in workers {
            let Some(body) = entity.worker() else {
                continue;
            };
            if !docs.contains_key(&body.home_zone) {
                continue;
            }
            if let Some(entry) = RosterEntry::from_entity(
                entity,
                job_of(&entity.id, &body.home_zone),
            ) {
                entries.push(entry);
            }
        }
    }

    for (home, state) in docs {
        for assignment in &state.assignments {
            if entries.iter().any(|e: &RosterEntry| e.worker == assignment.worker) {
                continue;
            }
            if let Some(entry) = world
                .resolve(&assignment.worker)
                .and_then(|entity| {
                    RosterEntry::from_entity(&entity, job_of(&assignment.worker, home))
                })
            {
                entries.push(entry);
            }
        }
    }

    Roster::new(entries)
}
