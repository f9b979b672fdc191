//! Job records offered to workers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::actions::catalog::ActionKind;
use crate::core::config::{Ttl, TtlTable};
use crate::core::types::{ObjectId, Position, ZoneId};
use crate::world::entity::{EntityKind, ResourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobFamily {
    EnergyAcquisition,
    Delivery,
    Labor,
    Claim,
    Movement,
}

/// What a job points at: a world object, or a whole zone by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobTarget {
    Object(ObjectId),
    Zone(ZoneId),
}

impl JobTarget {
    pub fn object(&self) -> Option<ObjectId> {
        match self {
            JobTarget::Object(id) => Some(*id),
            JobTarget::Zone(_) => None,
        }
    }
}

impl fmt::Display for JobTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobTarget::Object(id) => write!(f, "{}", id),
            JobTarget::Zone(zone) => write!(f, "zone {}", zone),
        }
    }
}

/// Kind of the thing a job targets, used as the dispatch key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Entity(EntityKind),
    ZoneName,
}

/// Whether capacity accounts for workers already heading to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorePolicy {
    Accurate,
    NoRestore,
}

/// One cached job list per kind, each with its own staleness window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Source,
    Mineral,
    Container,
    Link,
    Backup,
    Pickup,
    Loot,
    Fill,
    Store,
    Build,
    Repair,
    PriorityRepair,
    Upgrade,
    Sign,
    Claim,
    Reserve,
    AttackController,
    Move,
}

impl JobKind {
    pub const CACHED: [JobKind; 17] = [
        JobKind::Source,
        JobKind::Mineral,
        JobKind::Container,
        JobKind::Link,
        JobKind::Backup,
        JobKind::Pickup,
        JobKind::Loot,
        JobKind::Fill,
        JobKind::Store,
        JobKind::Build,
        JobKind::Repair,
        JobKind::PriorityRepair,
        JobKind::Upgrade,
        JobKind::Sign,
        JobKind::Claim,
        JobKind::Reserve,
        JobKind::AttackController,
    ];

    pub fn family(&self) -> JobFamily {
        match self {
            JobKind::Source
            | JobKind::Mineral
            | JobKind::Container
            | JobKind::Link
            | JobKind::Backup
            | JobKind::Pickup
            | JobKind::Loot => JobFamily::EnergyAcquisition,
            JobKind::Fill | JobKind::Store => JobFamily::Delivery,
            JobKind::Build
            | JobKind::Repair
            | JobKind::PriorityRepair
            | JobKind::Upgrade
            | JobKind::Sign => JobFamily::Labor,
            JobKind::Claim | JobKind::Reserve | JobKind::AttackController => JobFamily::Claim,
            JobKind::Move => JobFamily::Movement,
        }
    }

    /// Staleness window of the cached list; movement jobs are never cached
    pub fn ttl(&self, table: &TtlTable) -> Option<Ttl> {
        let ttl = match self {
            JobKind::Source => table.source_jobs,
            JobKind::Mineral => table.mineral_jobs,
            JobKind::Container => table.container_jobs,
            JobKind::Link => table.link_jobs,
            JobKind::Backup => table.backup_jobs,
            JobKind::Pickup => table.pickup_jobs,
            JobKind::Loot => table.loot_jobs,
            JobKind::Fill => table.fill_jobs,
            JobKind::Store => table.store_jobs,
            JobKind::Build => table.build_jobs,
            JobKind::Repair => table.repair_jobs,
            JobKind::PriorityRepair => table.priority_repair_jobs,
            JobKind::Upgrade => table.upgrade_jobs,
            JobKind::Sign => table.sign_jobs,
            JobKind::Claim => table.claim_jobs,
            JobKind::Reserve => table.reserve_jobs,
            JobKind::AttackController => table.attack_jobs,
            JobKind::Move => return None,
        };
        Some(ttl)
    }

    /// Delivery restore policy depends on the destination; see the fill factory
    pub fn restore_policy(&self) -> RestorePolicy {
        match self {
            JobKind::Source
            | JobKind::Container
            | JobKind::Pickup
            | JobKind::Loot
            | JobKind::Fill => RestorePolicy::Accurate,
            _ => RestorePolicy::NoRestore,
        }
    }
}

/// Family-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobDetail {
    /// Remaining quantity per resource, capacity-adjusted
    Energy { resources: BTreeMap<ResourceKind, u32> },
    /// Free space at the destination, capacity-adjusted
    Delivery { remaining: u32 },
    Labor,
    Claim { remaining: Option<u32> },
    Movement,
}

/// A derived unit of work
///
/// Jobs are values: recomputed on every refresh and never persisted beyond
/// the worker assignment that copies one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub kind: JobKind,
    pub target: JobTarget,
    pub target_kind: TargetKind,
    pub action: ActionKind,
    /// Where the target stood when the job was derived
    pub pos: Option<Position>,
    /// Set when the target cannot accept work regardless of capacity
    pub blocked: bool,
    pub is_taken: bool,
    pub detail: JobDetail,
}

impl Job {
    pub fn new(
        kind: JobKind,
        target: JobTarget,
        target_kind: TargetKind,
        action: ActionKind,
        detail: JobDetail,
    ) -> Self {
        Self {
            kind,
            target,
            target_kind,
            action,
            pos: None,
            blocked: false,
            is_taken: false,
            detail,
        }
    }

    pub fn at(mut self, pos: Position) -> Self {
        self.pos = Some(pos);
        self
    }

    pub fn blocked(mut self, blocked: bool) -> Self {
        self.blocked = blocked;
        self
    }

    pub fn family(&self) -> JobFamily {
        match self.detail {
            JobDetail::Energy { .. } => JobFamily::EnergyAcquisition,
            JobDetail::Delivery { .. } => JobFamily::Delivery,
            JobDetail::Labor => JobFamily::Labor,
            JobDetail::Claim { .. } => JobFamily::Claim,
            JobDetail::Movement => JobFamily::Movement,
        }
    }

    pub fn target_id(&self) -> Option<ObjectId> {
        self.target.object()
    }

    /// Energy left after adjustment, zero for non-energy jobs
    pub fn energy(&self) -> u32 {
        self.resource(ResourceKind::Energy)
    }

    pub fn resource(&self, resource: ResourceKind) -> u32 {
        match &self.detail {
            JobDetail::Energy { resources } => resources.get(&resource).copied().unwrap_or(0),
            _ => 0,
        }
    }

    /// Sum of all capacity-adjusted resources
    pub fn total_resources(&self) -> u32 {
        match &self.detail {
            JobDetail::Energy { resources } => resources.values().sum(),
            _ => 0,
        }
    }

    pub fn remaining(&self) -> Option<u32> {
        match &self.detail {
            JobDetail::Delivery { remaining } => Some(*remaining),
            JobDetail::Claim { remaining } => *remaining,
            _ => None,
        }
    }

    /// Same target and action, ignoring capacity figures
    pub fn same_work(&self, other: &Job) -> bool {
        self.target == other.target && self.action == other.action
    }

    pub fn target_entity_kind(&self) -> Option<EntityKind> {
        match self.target_kind {
            TargetKind::Entity(kind) => Some(kind),
            TargetKind::ZoneName => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_follows_detail() {
        let job = Job::new(
            JobKind::Fill,
            JobTarget::Object(ObjectId::new()),
            TargetKind::Entity(EntityKind::Spawn),
            ActionKind::Transfer,
            JobDetail::Delivery { remaining: 300 },
        );
        assert_eq!(job.family(), JobFamily::Delivery);
        assert_eq!(job.kind.family(), JobFamily::Delivery);
        assert_eq!(job.remaining(), Some(300));
        assert_eq!(job.energy(), 0);
    }

    #[test]
    fn test_movement_is_never_cached() {
        let table = TtlTable::default();
        assert!(JobKind::Move.ttl(&table).is_none());
        assert!(JobKind::Upgrade.ttl(&table).unwrap().is_sticky());
        assert_eq!(JobKind::Container.ttl(&table).unwrap().raw(), 5);
        assert!(!JobKind::CACHED.contains(&JobKind::Move));
    }

    #[test]
    fn test_job_serializes_to_json() {
        let mut resources = BTreeMap::new();
        resources.insert(ResourceKind::Energy, 1200);
        let job = Job::new(
            JobKind::Source,
            JobTarget::Object(ObjectId::new()),
            TargetKind::Entity(EntityKind::Source),
            ActionKind::Harvest,
            JobDetail::Energy { resources },
        )
        .at(Position::new("W1N1", 10, 12));

        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
        assert_eq!(back.energy(), 1200);
    }
}
