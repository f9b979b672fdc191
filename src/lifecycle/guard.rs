//! Per-worker job lifecycle
//!
//! ```text
//! IDLE --select--> EN_ROUTE --in range--> WORKING --success|empty|full--> IDLE
//!                     |                      |
//!                     +-----target lost------+-----------------------> IDLE
//! ```
//!
//! A worker knocked out of range keeps its target and walks again; it never
//! switches target without passing through IDLE.

use serde::{Deserialize, Serialize};

use crate::actions::catalog::ActionOutcome;
use crate::jobs::job::JobTarget;
use crate::memory::zone_state::WorkerAssignment;
use crate::world::entity::Entity;
use crate::world::query::WorldQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Idle,
    EnRoute,
    Working,
}

impl JobPhase {
    pub fn of(assignment: &WorkerAssignment) -> Self {
        match (&assignment.job, assignment.is_working) {
            (None, _) => JobPhase::Idle,
            (Some(_), false) => JobPhase::EnRoute,
            (Some(_), true) => JobPhase::Working,
        }
    }
}

/// Why an assignment was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearReason {
    /// The target object no longer resolves
    TargetLost,
    /// The destination zone is not part of the world
    UnknownZone,
    /// Source or worker store ran dry
    Empty,
    /// Destination or worker store filled up
    Full,
    /// One-shot action done
    Completed,
}

/// Where a worker should be heading and how close it must get
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveTarget {
    pub target: JobTarget,
    pub range: u32,
}

/// Validates held jobs and applies action outcomes to assignments
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleGuard;

impl LifecycleGuard {
    pub fn new() -> Self {
        Self
    }

    /// Pre-work check: clears the assignment if its target is gone
    ///
    /// Zone targets only need the zone to exist.
    pub fn check(
        &self,
        world: &dyn WorldQuery,
        assignment: &mut WorkerAssignment,
    ) -> Option<ClearReason> {
        let target = assignment.job.as_ref().map(|job| job.target.clone())?;
        let reason = match target {
            JobTarget::Object(id) if world.resolve(&id).is_none() => ClearReason::TargetLost,
            JobTarget::Zone(zone) if !world.zone_known(&zone) => ClearReason::UnknownZone,
            _ => return None,
        };
        assignment.clear();
        Some(reason)
    }

    /// Apply the result of one action attempt
    pub fn record_outcome(
        &self,
        assignment: &mut WorkerAssignment,
        outcome: ActionOutcome,
    ) -> Option<ClearReason> {
        let continuous = assignment.job.as_ref()?.action.is_continuous();
        let reason = match outcome {
            ActionOutcome::Success if continuous => return None,
            ActionOutcome::Success => ClearReason::Completed,
            ActionOutcome::Empty => ClearReason::Empty,
            ActionOutcome::Full => ClearReason::Full,
            ActionOutcome::NotInRange => {
                assignment.is_working = false;
                return None;
            }
            ActionOutcome::Tired => return None,
        };
        assignment.clear();
        Some(reason)
    }

    /// Abandon the job because its target vanished mid-action
    pub fn abandon(&self, assignment: &mut WorkerAssignment) -> Option<ClearReason> {
        assignment.job.as_ref()?;
        assignment.clear();
        Some(ClearReason::TargetLost)
    }

    /// The override object at range 0, else the job target at its action range
    pub fn move_target(&self, assignment: &WorkerAssignment) -> Option<MoveTarget> {
        let job = assignment.job.as_ref()?;
        Some(match assignment.move_target_override {
            Some(id) => MoveTarget {
                target: JobTarget::Object(id),
                range: 0,
            },
            None => MoveTarget {
                target: job.target.clone(),
                range: job.action.range(),
            },
        })
    }

    /// Whether `worker` stands close enough to start working
    pub fn has_arrived(
        &self,
        world: &dyn WorldQuery,
        worker: &Entity,
        assignment: &WorkerAssignment,
    ) -> bool {
        let Some(job) = assignment.job.as_ref() else {
            return false;
        };
        if let Some(spot) = assignment.move_target_override.and_then(|id| world.resolve(&id)) {
            return worker.pos == spot.pos;
        }
        let range = job.action.range();
        match &job.target {
            JobTarget::Object(id) => world
                .resolve(id)
                .and_then(|target| world.distance(&worker.pos, &target.pos))
                .is_some_and(|d| d <= range),
            JobTarget::Zone(zone) => {
                worker.zone() == zone
                    && (range == 0
                        || job
                            .pos
                            .as_ref()
                            .map_or(true, |pos| {
                                world.distance(&worker.pos, pos).is_some_and(|d| d <= range)
                            }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::catalog::ActionKind;
    use crate::core::types::{ObjectId, Position};
    use crate::jobs::job::{Job, JobDetail, JobKind, TargetKind};
    use crate::world::entity::{EntityBody, EntityKind, ResourceKind, WorkerBody};
    use crate::world::sim::SimWorld;
    use crate::policy::capabilities::Role;

    fn holding(job: Job) -> WorkerAssignment {
        let mut assignment = WorkerAssignment::new(ObjectId::new());
        assignment.commit(job);
        assignment
    }

    fn pickup(target: ObjectId) -> Job {
        Job::new(
            JobKind::Pickup,
            JobTarget::Object(target),
            TargetKind::Entity(EntityKind::DroppedResource),
            ActionKind::Pickup,
            JobDetail::Labor,
        )
    }

    fn harvest(target: ObjectId) -> Job {
        Job::new(
            JobKind::Source,
            JobTarget::Object(target),
            TargetKind::Entity(EntityKind::Source),
            ActionKind::Harvest,
            JobDetail::Labor,
        )
    }

    #[test]
    fn test_phase_follows_assignment() {
        let mut assignment = WorkerAssignment::new(ObjectId::new());
        assert_eq!(JobPhase::of(&assignment), JobPhase::Idle);
        assignment.commit(pickup(ObjectId::new()));
        assert_eq!(JobPhase::of(&assignment), JobPhase::EnRoute);
        assignment.is_working = true;
        assert_eq!(JobPhase::of(&assignment), JobPhase::Working);
    }

    #[test]
    fn test_lost_target_clears_assignment() {
        let mut world = SimWorld::new(4);
        let zone = world.add_zone("W1N1");
        let drop = world.spawn(
            Position::new(zone, 5, 5),
            EntityBody::DroppedResource { resource: ResourceKind::Energy, amount: 50 },
        );
        let guard = LifecycleGuard::new();
        let mut assignment = holding(pickup(drop));
        assert_eq!(guard.check(&world, &mut assignment), None);

        world.remove(&drop);
        assert_eq!(guard.check(&world, &mut assignment), Some(ClearReason::TargetLost));
        assert_eq!(JobPhase::of(&assignment), JobPhase::Idle);
        // clearing twice is harmless
        assert_eq!(guard.check(&world, &mut assignment), None);
    }

    #[test]
    fn test_outcomes() {
        let guard = LifecycleGuard::new();

        let mut continuous = holding(harvest(ObjectId::new()));
        continuous.is_working = true;
        assert_eq!(guard.record_outcome(&mut continuous, ActionOutcome::Success), None);
        assert_eq!(guard.record_outcome(&mut continuous, ActionOutcome::Tired), None);
        assert_eq!(JobPhase::of(&continuous), JobPhase::Working);
        assert_eq!(guard.record_outcome(&mut continuous, ActionOutcome::NotInRange), None);
        assert_eq!(JobPhase::of(&continuous), JobPhase::EnRoute);
        assert_eq!(
            guard.record_outcome(&mut continuous, ActionOutcome::Full),
            Some(ClearReason::Full)
        );
        assert!(continuous.is_idle());

        let mut one_shot = holding(pickup(ObjectId::new()));
        assert_eq!(
            guard.record_outcome(&mut one_shot, ActionOutcome::Success),
            Some(ClearReason::Completed)
        );

        let mut dry = holding(pickup(ObjectId::new()));
        assert_eq!(guard.record_outcome(&mut dry, ActionOutcome::Empty), Some(ClearReason::Empty));
    }

    #[test]
    fn test_arrival_respects_action_range() {
        let mut world = SimWorld::new(4);
        let zone = world.add_zone("W1N1");
        let source = world.spawn(
            Position::new(zone.clone(), 10, 10),
            EntityBody::Source { energy: 3000, energy_capacity: 3000 },
        );
        let worker = world.spawn(
            Position::new(zone.clone(), 12, 10),
            EntityBody::Worker(WorkerBody::new("m", Role::Miner, zone.clone()).with_parts(2, 0, 0)),
        );
        let guard = LifecycleGuard::new();
        let assignment = holding(harvest(source));
        assert!(!guard.has_arrived(&world, world.get(&worker).unwrap(), &assignment));

        world.get_mut(&worker).unwrap().pos = Position::new(zone, 11, 11);
        assert!(guard.has_arrived(&world, world.get(&worker).unwrap(), &assignment));
        assert_eq!(guard.move_target(&assignment).unwrap().range, 1);
    }
}
