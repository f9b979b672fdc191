//! Per-zone persistent document

use serde::{Deserialize, Serialize};

use crate::core::types::{ObjectId, ZoneId};
use crate::jobs::job::Job;

/// A worker's current job and travel state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerAssignment {
    pub worker: ObjectId,
    pub job: Option<Job>,
    /// In range of the target and acting on it
    pub is_working: bool,
    /// Tile-occupying object to stand on instead of approaching the target
    pub move_target_override: Option<ObjectId>,
}

impl WorkerAssignment {
    pub fn new(worker: ObjectId) -> Self {
        Self {
            worker,
            job: None,
            is_working: false,
            move_target_override: None,
        }
    }

    pub fn commit(&mut self, job: Job) {
        self.job = Some(job);
        self.is_working = false;
        self.move_target_override = None;
    }

    /// Drop the job; a no-op on an idle assignment
    pub fn clear(&mut self) {
        self.job = None;
        self.is_working = false;
        self.move_target_override = None;
    }

    pub fn is_idle(&self) -> bool {
        self.job.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Counter {
    JobsAssigned,
    AssignmentsCleared,
    TargetsLost,
    FatalErrors,
}

/// Operational counters, kept for observability only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneCounters {
    pub jobs_assigned: u64,
    pub assignments_cleared: u64,
    pub targets_lost: u64,
    pub fatal_errors: u64,
}

impl ZoneCounters {
    pub fn bump(&mut self, counter: Counter) {
        let slot = match counter {
            Counter::JobsAssigned => &mut self.jobs_assigned,
            Counter::AssignmentsCleared => &mut self.assignments_cleared,
            Counter::TargetsLost => &mut self.targets_lost,
            Counter::FatalErrors => &mut self.fatal_errors,
        };
        *slot += 1;
    }
}

/// Everything the engine remembers about a zone between ticks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneState {
    /// Assignments of workers whose home is this zone
    pub assignments: Vec<WorkerAssignment>,
    /// Miners this zone wants; harvesters relax their container rule below it
    pub miner_limit: u32,
    pub claim_zones: Vec<ZoneId>,
    pub remote_zones: Vec<ZoneId>,
    pub attack_zones: Vec<ZoneId>,
    /// Link next to the controller, filled by managers and drained by upgraders
    pub upgrader_link: Option<ObjectId>,
    /// Zones a scout has already visited
    pub explored_zones: Vec<ZoneId>,
    pub counters: ZoneCounters,
}

/// A single write against a zone document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZonePatch {
    SetAssignment(WorkerAssignment),
    ClearAssignment(ObjectId),
    Bump(Counter),
    MarkExplored(ZoneId),
}

impl ZoneState {
    pub fn assignment(&self, worker: &ObjectId) -> Option<&WorkerAssignment> {
        self.assignments.iter().find(|a| &a.worker == worker)
    }

    /// Zones this zone sends workers into
    pub fn dependent_zones(&self) -> impl Iterator<Item = &ZoneId> {
        self.claim_zones
            .iter()
            .chain(self.remote_zones.iter())
            .chain(self.attack_zones.iter())
    }

    pub fn apply(&mut self, patch: ZonePatch) {
        match patch {
            ZonePatch::SetAssignment(assignment) => {
                match self.assignments.iter_mut().find(|a| a.worker == assignment.worker) {
                    Some(existing) => *existing = assignment,
                    None => self.assignments.push(assignment),
                }
            }
            ZonePatch::ClearAssignment(worker) => {
                self.assignments.retain(|a| a.worker != worker);
            }
            ZonePatch::Bump(counter) => self.counters.bump(counter),
            ZonePatch::MarkExplored(zone) => {
                if !self.explored_zones.contains(&zone) {
                    self.explored_zones.push(zone);
                }
            }
        }
    }
}
