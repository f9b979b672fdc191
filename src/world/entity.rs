//! Tagged world entities
//!
//! Every object the catalog can target is an [`Entity`] whose [`EntityBody`]
//! carries the kind-specific state. Callers branch on [`EntityKind`] rather
//! than probing the body shape.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{ObjectId, Position, Tick, ZoneId};
use crate::policy::capabilities::Role;

/// Carry capacity contributed by each carry part
pub const CARRY_CAPACITY_PER_PART: u32 = 50;

/// Type of resource a store can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Energy,
    Hydrogen,
    Oxygen,
    Utrium,
    Keanium,
    Lemergium,
    Zynthium,
    Catalyst,
}

/// Resources held by a structure, worker, tombstone or ruin
///
/// All resource kinds share one total capacity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Store {
    amounts: AHashMap<ResourceKind, u32>,
    capacity: u32,
}

impl Store {
    pub fn new(capacity: u32) -> Self {
        Self {
            amounts: AHashMap::new(),
            capacity,
        }
    }

    /// Builder used when seeding worlds; ignores capacity so tests can overfill
    pub fn with(mut self, resource: ResourceKind, amount: u32) -> Self {
        self.amounts.insert(resource, amount);
        self
    }

    pub fn get(&self, resource: ResourceKind) -> u32 {
        self.amounts.get(&resource).copied().unwrap_or(0)
    }

    pub fn energy(&self) -> u32 {
        self.get(ResourceKind::Energy)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn total(&self) -> u32 {
        self.amounts.values().sum()
    }

    pub fn free_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.total())
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn is_full(&self) -> bool {
        self.free_capacity() == 0
    }

    /// Try to add resources, returns amount actually added
    pub fn add(&mut self, resource: ResourceKind, amount: u32) -> u32 {
        let added = amount.min(self.free_capacity());
        if added > 0 {
            *self.amounts.entry(resource).or_insert(0) += added;
        }
        added
    }

    /// Try to remove resources, returns amount actually removed
    pub fn remove(&mut self, resource: ResourceKind, amount: u32) -> u32 {
        match self.amounts.get_mut(&resource) {
            Some(current) => {
                let removed = amount.min(*current);
                *current -= removed;
                removed
            }
            None => 0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        self.amounts.iter().map(|(k, v)| (*k, *v))
    }
}

/// Discriminant of an entity, used for dispatch and cache categorisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Source,
    Mineral,
    Spawn,
    Extension,
    Tower,
    Container,
    Link,
    Storage,
    Terminal,
    Extractor,
    Road,
    Wall,
    Rampart,
    Controller,
    ConstructionSite,
    Tombstone,
    Ruin,
    DroppedResource,
    Worker,
    Hostile,
}

impl EntityKind {
    pub const STRUCTURES: [EntityKind; 12] = [
        EntityKind::Spawn,
        EntityKind::Extension,
        EntityKind::Tower,
        EntityKind::Container,
        EntityKind::Link,
        EntityKind::Storage,
        EntityKind::Terminal,
        EntityKind::Extractor,
        EntityKind::Road,
        EntityKind::Wall,
        EntityKind::Rampart,
        EntityKind::Controller,
    ];

    pub fn is_structure(&self) -> bool {
        matches!(
            self,
            EntityKind::Spawn
                | EntityKind::Extension
                | EntityKind::Tower
                | EntityKind::Container
                | EntityKind::Link
                | EntityKind::Storage
                | EntityKind::Terminal
                | EntityKind::Extractor
                | EntityKind::Road
                | EntityKind::Wall
                | EntityKind::Rampart
                | EntityKind::Controller
        )
    }

    /// Walls and ramparts are repaired against the controller-level limit
    pub fn is_fortification(&self) -> bool {
        matches!(self, EntityKind::Wall | EntityKind::Rampart)
    }
}

/// Who holds a controller or reservation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ownership {
    Unowned,
    Mine,
    Foreign(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub owner: Ownership,
    pub ticks_to_end: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerState {
    pub level: u8,
    pub owner: Ownership,
    pub reservation: Option<Reservation>,
    pub sign: Option<String>,
    pub progress: u32,
}

impl ControllerState {
    pub fn unowned() -> Self {
        Self {
            level: 0,
            owner: Ownership::Unowned,
            reservation: None,
            sign: None,
            progress: 0,
        }
    }

    pub fn owned(level: u8) -> Self {
        Self {
            level,
            owner: Ownership::Mine,
            ..Self::unowned()
        }
    }

    pub fn is_mine(&self) -> bool {
        self.owner == Ownership::Mine
    }

    /// Ticks of our own reservation left, zero when unreserved or reserved by someone else
    pub fn my_reservation_ticks(&self) -> u32 {
        match &self.reservation {
            Some(r) if r.owner == Ownership::Mine => r.ticks_to_end,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureState {
    pub hits: u32,
    pub hits_max: u32,
    pub store: Option<Store>,
    /// Ticks until the structure can act again (extractors, links)
    pub cooldown: u32,
}

/// Friendly worker body and identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerBody {
    pub name: String,
    pub role: Role,
    pub home_zone: ZoneId,
    pub target_zone: ZoneId,
    pub work_parts: u32,
    pub carry_parts: u32,
    pub claim_parts: u32,
    pub store: Store,
    pub spawning: bool,
}

impl WorkerBody {
    pub fn new(name: impl Into<String>, role: Role, home_zone: ZoneId) -> Self {
        Self {
            name: name.into(),
            role,
            target_zone: home_zone.clone(),
            home_zone,
            work_parts: 0,
            carry_parts: 0,
            claim_parts: 0,
            store: Store::new(0),
            spawning: false,
        }
    }

    pub fn with_parts(mut self, work: u32, carry: u32, claim: u32) -> Self {
        self.work_parts = work;
        self.carry_parts = carry;
        self.claim_parts = claim;
        let mut store = Store::new(carry * CARRY_CAPACITY_PER_PART);
        for (kind, amount) in self.store.iter() {
            store.add(kind, amount);
        }
        self.store = store;
        self
    }

    pub fn with_target_zone(mut self, zone: ZoneId) -> Self {
        self.target_zone = zone;
        self
    }

    pub fn carry_capacity(&self) -> u32 {
        self.store.capacity()
    }

    pub fn load(&self) -> u32 {
        self.store.total()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityBody {
    Source { energy: u32, energy_capacity: u32 },
    Mineral { resource: ResourceKind, amount: u32 },
    Structure { kind: EntityKind, state: StructureState },
    Controller(ControllerState),
    ConstructionSite { structure: EntityKind, progress: u32, progress_total: u32 },
    Tombstone { store: Store, decays_at: Tick },
    Ruin { store: Store },
    DroppedResource { resource: ResourceKind, amount: u32 },
    Worker(WorkerBody),
    Hostile { owner: String, attack_parts: u32 },
}

/// A world object snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: ObjectId,
    pub pos: Position,
    pub body: EntityBody,
}

impl Entity {
    pub fn new(pos: Position, body: EntityBody) -> Self {
        Self {
            id: ObjectId::new(),
            pos,
            body,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match &self.body {
            EntityBody::Source { .. } => EntityKind::Source,
            EntityBody::Mineral { .. } => EntityKind::Mineral,
            EntityBody::Structure { kind, .. } => *kind,
            EntityBody::Controller(_) => EntityKind::Controller,
            EntityBody::ConstructionSite { .. } => EntityKind::ConstructionSite,
            EntityBody::Tombstone { .. } => EntityKind::Tombstone,
            EntityBody::Ruin { .. } => EntityKind::Ruin,
            EntityBody::DroppedResource { .. } => EntityKind::DroppedResource,
            EntityBody::Worker(_) => EntityKind::Worker,
            EntityBody::Hostile { .. } => EntityKind::Hostile,
        }
    }

    pub fn zone(&self) -> &ZoneId {
        &self.pos.zone
    }

    /// Resource store, for the kinds that have one
    pub fn store(&self) -> Option<&Store> {
        match &self.body {
            EntityBody::Structure { state, .. } => state.store.as_ref(),
            EntityBody::Tombstone { store, .. } | EntityBody::Ruin { store } => Some(store),
            EntityBody::Worker(w) => Some(&w.store),
            _ => None,
        }
    }

    pub fn store_mut(&mut self) -> Option<&mut Store> {
        match &mut self.body {
            EntityBody::Structure { state, .. } => state.store.as_mut(),
            EntityBody::Tombstone { store, .. } | EntityBody::Ruin { store } => Some(store),
            EntityBody::Worker(w) => Some(&mut w.store),
            _ => None,
        }
    }

    pub fn structure(&self) -> Option<&StructureState> {
        match &self.body {
            EntityBody::Structure { state, .. } => Some(state),
            _ => None,
        }
    }

    pub fn controller(&self) -> Option<&ControllerState> {
        match &self.body {
            EntityBody::Controller(c) => Some(c),
            _ => None,
        }
    }

    pub fn worker(&self) -> Option<&WorkerBody> {
        match &self.body {
            EntityBody::Worker(w) => Some(w),
            _ => None,
        }
    }

    pub fn worker_mut(&mut self) -> Option<&mut WorkerBody> {
        match &mut self.body {
            EntityBody::Worker(w) => Some(w),
            _ => None,
        }
    }

    /// Energy available to take from this entity
    pub fn energy(&self) -> u32 {
        match &self.body {
            EntityBody::Source { energy, .. } => *energy,
            EntityBody::DroppedResource { resource: ResourceKind::Energy, amount } => *amount,
            _ => self.store().map(|s| s.energy()).unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_add_remove() {
        let mut store = Store::new(50);

        assert_eq!(store.add(ResourceKind::Energy, 30), 30);
        assert_eq!(store.energy(), 30);

        // Can't exceed capacity
        assert_eq!(store.add(ResourceKind::Hydrogen, 30), 20);
        assert_eq!(store.total(), 50);
        assert!(store.is_full());

        assert_eq!(store.remove(ResourceKind::Energy, 40), 30);
        assert_eq!(store.energy(), 0);
        assert_eq!(store.free_capacity(), 30);
    }

    #[test]
    fn test_worker_capacity_from_carry_parts() {
        let body = WorkerBody::new("w", Role::Harvester, ZoneId::from("W1N1")).with_parts(1, 4, 0);
        assert_eq!(body.carry_capacity(), 200);
        assert_eq!(body.load(), 0);
    }

    #[test]
    fn test_entity_kind_dispatch() {
        let pos = Position::new("W1N1", 5, 5);
        let source = Entity::new(
            pos.clone(),
            EntityBody::Source { energy: 3000, energy_capacity: 3000 },
        );
        assert_eq!(source.kind(), EntityKind::Source);
        assert_eq!(source.energy(), 3000);

        let tower = Entity::new(
            pos,
            EntityBody::Structure {
                kind: EntityKind::Tower,
                state: StructureState {
                    hits: 3000,
                    hits_max: 3000,
                    store: Some(Store::new(1000).with(ResourceKind::Energy, 400)),
                    cooldown: 0,
                },
            },
        );
        assert_eq!(tower.kind(), EntityKind::Tower);
        assert!(tower.kind().is_structure());
        assert_eq!(tower.energy(), 400);
    }

    #[test]
    fn test_reservation_ticks_only_count_ours() {
        let mut controller = ControllerState::unowned();
        controller.reservation = Some(Reservation {
            owner: Ownership::Foreign("rival".into()),
            ticks_to_end: 3000,
        });
        assert_eq!(controller.my_reservation_ticks(), 0);
        controller.reservation = Some(Reservation {
            owner: Ownership::Mine,
            ticks_to_end: 1200,
        });
        assert_eq!(controller.my_reservation_ticks(), 1200);
    }
}
