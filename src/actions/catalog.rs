//! Action definitions and the execution dispatch table

use serde::{Deserialize, Serialize};

use crate::core::error::{JobError, Result};
use crate::jobs::job::{JobFamily, TargetKind};
use crate::world::entity::EntityKind;

/// What a worker does to a job's target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Harvest,
    Withdraw,
    Pickup,
    Transfer,
    Build,
    Repair,
    Upgrade,
    Sign,
    Claim,
    Reserve,
    AttackController,
    Move,
}

impl ActionKind {
    pub fn family(&self) -> JobFamily {
        match self {
            ActionKind::Harvest | ActionKind::Withdraw | ActionKind::Pickup => {
                JobFamily::EnergyAcquisition
            }
            ActionKind::Transfer => JobFamily::Delivery,
            ActionKind::Build | ActionKind::Repair | ActionKind::Upgrade | ActionKind::Sign => {
                JobFamily::Labor
            }
            ActionKind::Claim | ActionKind::Reserve | ActionKind::AttackController => {
                JobFamily::Claim
            }
            ActionKind::Move => JobFamily::Movement,
        }
    }

    /// Tiles from the target at which the action can be performed
    pub fn range(&self) -> u32 {
        match self {
            ActionKind::Build | ActionKind::Repair | ActionKind::Upgrade => 3,
            ActionKind::Move => 0,
            _ => 1,
        }
    }

    /// Continuous actions keep their job after a successful tick
    pub fn is_continuous(&self) -> bool {
        matches!(
            self,
            ActionKind::Harvest
                | ActionKind::Build
                | ActionKind::Repair
                | ActionKind::Upgrade
                | ActionKind::Reserve
        )
    }
}

/// Concrete behaviour selected for a `(target kind, action)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionHandler {
    HarvestSource,
    HarvestMineral,
    Withdraw,
    Pickup,
    Transfer,
    Build,
    Repair,
    Upgrade,
    Sign,
    Claim,
    Reserve,
    AttackController,
    MoveToZone,
}

use ActionHandler as H;
use ActionKind as A;
use EntityKind as E;

const fn row(
    kind: EntityKind,
    action: ActionKind,
    handler: ActionHandler,
) -> (TargetKind, ActionKind, ActionHandler) {
    (TargetKind::Entity(kind), action, handler)
}

/// Every legal `(target kind, action)` pairing
static DISPATCH: &[(TargetKind, ActionKind, ActionHandler)] = &[
    row(E::Source, A::Harvest, H::HarvestSource),
    row(E::Mineral, A::Harvest, H::HarvestMineral),
    row(E::Container, A::Withdraw, H::Withdraw),
    row(E::Link, A::Withdraw, H::Withdraw),
    row(E::Storage, A::Withdraw, H::Withdraw),
    row(E::Terminal, A::Withdraw, H::Withdraw),
    row(E::Tombstone, A::Withdraw, H::Withdraw),
    row(E::Ruin, A::Withdraw, H::Withdraw),
    row(E::DroppedResource, A::Pickup, H::Pickup),
    row(E::Spawn, A::Transfer, H::Transfer),
    row(E::Extension, A::Transfer, H::Transfer),
    row(E::Tower, A::Transfer, H::Transfer),
    row(E::Link, A::Transfer, H::Transfer),
    row(E::Storage, A::Transfer, H::Transfer),
    row(E::Terminal, A::Transfer, H::Transfer),
    row(E::ConstructionSite, A::Build, H::Build),
    row(E::Spawn, A::Repair, H::Repair),
    row(E::Extension, A::Repair, H::Repair),
    row(E::Tower, A::Repair, H::Repair),
    row(E::Container, A::Repair, H::Repair),
    row(E::Link, A::Repair, H::Repair),
    row(E::Storage, A::Repair, H::Repair),
    row(E::Terminal, A::Repair, H::Repair),
    row(E::Extractor, A::Repair, H::Repair),
    row(E::Road, A::Repair, H::Repair),
    row(E::Wall, A::Repair, H::Repair),
    row(E::Rampart, A::Repair, H::Repair),
    row(E::Controller, A::Upgrade, H::Upgrade),
    row(E::Controller, A::Sign, H::Sign),
    (TargetKind::ZoneName, A::Claim, H::Claim),
    (TargetKind::ZoneName, A::Reserve, H::Reserve),
    (TargetKind::ZoneName, A::AttackController, H::AttackController),
    (TargetKind::ZoneName, A::Move, H::MoveToZone),
];

/// Look up the handler for a pairing; unknown pairs are programmer errors
pub fn handler_for(target: TargetKind, action: ActionKind) -> Result<ActionHandler> {
    DISPATCH
        .iter()
        .find(|(t, a, _)| *t == target && *a == action)
        .map(|(_, _, h)| *h)
        .ok_or(match target {
            TargetKind::Entity(kind) => JobError::BadTarget { kind, action },
            TargetKind::ZoneName => JobError::BadTarget { kind: EntityKind::Controller, action },
        })
}

/// Result of attempting an action for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Success,
    NotInRange,
    /// The source or the worker's own store ran dry
    Empty,
    /// The destination or the worker's own store is full
    Full,
    /// Target is temporarily unable to act (extractor cooldown)
    Tired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_known_pairs() {
        assert_eq!(
            handler_for(TargetKind::Entity(E::Source), A::Harvest).unwrap(),
            H::HarvestSource
        );
        assert_eq!(
            handler_for(TargetKind::Entity(E::Tombstone), A::Withdraw).unwrap(),
            H::Withdraw
        );
        assert_eq!(handler_for(TargetKind::ZoneName, A::Move).unwrap(), H::MoveToZone);
    }

    #[test]
    fn test_dispatch_rejects_unknown_pairs() {
        let err = handler_for(TargetKind::Entity(E::Source), A::Transfer).unwrap_err();
        assert!(matches!(
            err,
            JobError::BadTarget { kind: E::Source, action: A::Transfer }
        ));
    }

    #[test]
    fn test_action_ranges() {
        assert_eq!(A::Harvest.range(), 1);
        assert_eq!(A::Upgrade.range(), 3);
        assert_eq!(A::Move.range(), 0);
    }

    #[test]
    fn test_continuous_actions() {
        assert!(A::Harvest.is_continuous());
        assert!(A::Repair.is_continuous());
        assert!(!A::Withdraw.is_continuous());
        assert!(!A::Claim.is_continuous());
    }
}
