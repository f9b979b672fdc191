//! Deterministic in-memory world used by tests and the demo driver

use ahash::{AHashMap, AHashSet};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use crate::actions::catalog::{ActionHandler, ActionOutcome};
use crate::core::error::{JobError, Result};
use crate::core::types::{ObjectId, Position, Tick, ZoneId};
use crate::jobs::job::JobTarget;
use crate::world::entity::{
    ControllerState, Entity, EntityBody, EntityKind, Ownership, Reservation, ResourceKind, Store,
    StructureState,
};
use crate::world::query::{ActionExecutor, MovementExecutor, WorldQuery};

/// Energy harvested per work part per tick
pub const HARVEST_POWER: u32 = 2;
/// Mineral units harvested per work part per tick
pub const MINERAL_HARVEST_POWER: u32 = 1;
/// Construction progress per work part per tick (costs the same in energy)
pub const BUILD_POWER: u32 = 5;
/// Hits restored per work part per tick (costs one energy per part)
pub const REPAIR_POWER: u32 = 100;
pub const UPGRADE_POWER: u32 = 1;
pub const EXTRACTOR_COOLDOWN: u32 = 5;
pub const SOURCE_REGEN_TICKS: u64 = 300;
pub const RESERVATION_MAX: u32 = 5_000;
/// Reservation ticks gained per claim part per tick
pub const RESERVE_POWER: u32 = 1;
/// Reservation ticks removed per claim part by an attack
pub const ATTACK_CONTROLLER_POWER: u32 = 300;

#[derive(Debug, Clone, Default)]
struct SimZone {
    neighbors: Vec<ZoneId>,
    walls: AHashSet<(u8, u8)>,
    observed: bool,
}

/// In-memory world implementing the query, movement and action contracts
pub struct SimWorld {
    tick: Tick,
    rng: ChaCha8Rng,
    zones: AHashMap<ZoneId, SimZone>,
    entities: AHashMap<ObjectId, Entity>,
    /// Insertion order, so queries are stable across runs with the same seed
    order: Vec<ObjectId>,
    sign_text: String,
}

impl SimWorld {
    pub fn new(seed: u64) -> Self {
        Self {
            tick: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            zones: AHashMap::new(),
            entities: AHashMap::new(),
            order: Vec::new(),
            sign_text: String::new(),
        }
    }

    pub fn with_sign_text(mut self, text: impl Into<String>) -> Self {
        self.sign_text = text.into();
        self
    }

    pub fn add_zone(&mut self, zone: impl Into<ZoneId>) -> ZoneId {
        let zone = zone.into();
        self.zones.entry(zone.clone()).or_default();
        zone
    }

    /// Make two zones neighbours of each other
    pub fn connect(&mut self, a: &ZoneId, b: &ZoneId) {
        for (from, to) in [(a, b), (b, a)] {
            let entry = self.zones.entry(from.clone()).or_default();
            if !entry.neighbors.contains(to) {
                entry.neighbors.push(to.clone());
            }
        }
    }

    /// Grant observation of a zone even without a worker inside it
    pub fn set_observed(&mut self, zone: &ZoneId, observed: bool) {
        self.zones.entry(zone.clone()).or_default().observed = observed;
    }

    pub fn add_terrain_wall(&mut self, pos: &Position) {
        self.zones
            .entry(pos.zone.clone())
            .or_default()
            .walls
            .insert((pos.x, pos.y));
    }

    pub fn set_tick(&mut self, tick: Tick) {
        self.tick = tick;
    }

    pub fn spawn(&mut self, pos: Position, body: EntityBody) -> ObjectId {
        let id = ObjectId(Uuid::from_u128(self.rng.gen()));
        self.add_zone(pos.zone.clone());
        self.entities.insert(id, Entity { id, pos, body });
        self.order.push(id);
        id
    }

    pub fn remove(&mut self, id: &ObjectId) -> Option<Entity> {
        let removed = self.entities.remove(id)?;
        self.order.retain(|other| other != id);
        Some(removed)
    }

    pub fn get(&self, id: &ObjectId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &ObjectId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }

    /// Advance the clock: decay loot, tick cooldowns, regenerate sources
    pub fn advance(&mut self) {
        self.tick += 1;
        let now = self.tick;

        let decayed: Vec<ObjectId> = self
            .iter()
            .filter(|e| {
                matches!(e.body, EntityBody::Tombstone { decays_at, .. } if decays_at <= now)
            })
            .map(|e| e.id)
            .collect();
        for id in decayed {
            self.remove(&id);
        }

        for entity in self.entities.values_mut() {
            match &mut entity.body {
                EntityBody::Structure { state, .. } => {
                    state.cooldown = state.cooldown.saturating_sub(1);
                }
                EntityBody::Source { energy, energy_capacity } if now % SOURCE_REGEN_TICKS == 0 => {
                    *energy = *energy_capacity;
                }
                EntityBody::Controller(controller) => {
                    if let Some(reservation) = &mut controller.reservation {
                        reservation.ticks_to_end = reservation.ticks_to_end.saturating_sub(1);
                    }
                }
                _ => {}
            }
        }
    }

    fn target_position(&self, target: &JobTarget) -> Result<Option<Position>> {
        match target {
            JobTarget::Object(id) => self
                .entities
                .get(id)
                .map(|e| Some(e.pos.clone()))
                .ok_or(JobError::TargetLost(*id)),
            JobTarget::Zone(zone) => {
                if !self.zones.contains_key(zone) {
                    return Err(JobError::UnknownZone(zone.clone()));
                }
                Ok(self.controller_in(zone).map(|c| c.pos.clone()))
            }
        }
    }

    fn controller_in(&self, zone: &ZoneId) -> Option<&Entity> {
        self.iter()
            .find(|e| e.zone() == zone && e.kind() == EntityKind::Controller)
    }

    fn entity_at(&self, pos: &Position, kind: EntityKind) -> Option<ObjectId> {
        self.iter()
            .find(|e| &e.pos == pos && e.kind() == kind)
            .map(|e| e.id)
    }

    fn worker_entity(&self, worker: &ObjectId) -> Result<&Entity> {
        self.entities
            .get(worker)
            .filter(|e| e.worker().is_some())
            .ok_or(JobError::WorkerNotFound(*worker))
    }

    /// Drop energy on a tile, merging with an existing pile
    fn drop_energy(&mut self, pos: &Position, amount: u32) {
        if amount == 0 {
            return;
        }
        if let Some(id) = self.entity_at(pos, EntityKind::DroppedResource) {
            if let Some(Entity {
                body: EntityBody::DroppedResource { amount: pile, .. },
                ..
            }) = self.entities.get_mut(&id)
            {
                *pile += amount;
                return;
            }
        }
        self.spawn(
            pos.clone(),
            EntityBody::DroppedResource {
                resource: ResourceKind::Energy,
                amount,
            },
        );
    }

    fn take_worker_energy(&mut self, worker: &ObjectId, amount: u32) -> u32 {
        self.entities
            .get_mut(worker)
            .and_then(|e| e.store_mut())
            .map(|store| store.remove(ResourceKind::Energy, amount))
            .unwrap_or(0)
    }

    fn give_worker(&mut self, worker: &ObjectId, resource: ResourceKind, amount: u32) -> u32 {
        self.entities
            .get_mut(worker)
            .and_then(|e| e.store_mut())
            .map(|store| store.add(resource, amount))
            .unwrap_or(0)
    }

    fn harvest_source(&mut self, worker: &Entity, target: ObjectId) -> Result<ActionOutcome> {
        let body = worker.worker().ok_or(JobError::WorkerNotFound(worker.id))?;
        let available = match self.entities.get(&target).map(|e| &e.body) {
            Some(EntityBody::Source { energy, .. }) => *energy,
            _ => return Err(JobError::TargetLost(target)),
        };
        if available == 0 {
            return Ok(ActionOutcome::Empty);
        }
        let mined = available.min(body.work_parts * HARVEST_POWER);
        if let Some(Entity {
            body: EntityBody::Source { energy, .. },
            ..
        }) = self.entities.get_mut(&target)
        {
            *energy -= mined;
        }

        let carries = body.carry_capacity() > 0;
        let kept = self.give_worker(&worker.id, ResourceKind::Energy, mined);
        let mut overflow = mined - kept;
        if overflow > 0 {
            if let Some(container) = self.entity_at(&worker.pos, EntityKind::Container) {
                if let Some(store) = self.entities.get_mut(&container).and_then(|e| e.store_mut()) {
                    overflow -= store.add(ResourceKind::Energy, overflow);
                }
            }
            self.drop_energy(&worker.pos.clone(), overflow);
        }

        let full = self
            .entities
            .get(&worker.id)
            .and_then(|e| e.store())
            .is_some_and(|s| s.is_full());
        if carries && full {
            Ok(ActionOutcome::Full)
        } else {
            Ok(ActionOutcome::Success)
        }
    }

    fn harvest_mineral(&mut self, worker: &Entity, target: ObjectId) -> Result<ActionOutcome> {
        let body = worker.worker().ok_or(JobError::WorkerNotFound(worker.id))?;
        let (resource, available, pos) = match self.entities.get(&target) {
            Some(Entity {
                body: EntityBody::Mineral { resource, amount },
                pos,
                ..
            }) => (*resource, *amount, pos.clone()),
            _ => return Err(JobError::TargetLost(target)),
        };
        let extractor = self.entity_at(&pos, EntityKind::Extractor);
        let ready = extractor
            .and_then(|id| self.entities.get(&id))
            .and_then(|e| e.structure())
            .is_some_and(|s| s.cooldown == 0);
        if !ready {
            return Ok(ActionOutcome::Tired);
        }
        if available == 0 {
            return Ok(ActionOutcome::Empty);
        }
        let mined = available.min(body.work_parts * MINERAL_HARVEST_POWER);
        let kept = self.give_worker(&worker.id, resource, mined);
        if kept == 0 {
            return Ok(ActionOutcome::Full);
        }
        if let Some(Entity {
            body: EntityBody::Mineral { amount, .. },
            ..
        }) = self.entities.get_mut(&target)
        {
            *amount -= kept;
        }
        let extractor_body = extractor
            .and_then(|id| self.entities.get_mut(&id))
            .map(|e| &mut e.body);
        if let Some(EntityBody::Structure { state, .. }) = extractor_body {
            state.cooldown = EXTRACTOR_COOLDOWN;
        }
        Ok(ActionOutcome::Success)
    }

    fn withdraw(&mut self, worker: &Entity, target: ObjectId) -> Result<ActionOutcome> {
        let free = worker.store().map(|s| s.free_capacity()).unwrap_or(0);
        let available = self
            .entities
            .get(&target)
            .ok_or(JobError::TargetLost(target))?
            .energy();
        if available == 0 {
            return Ok(ActionOutcome::Empty);
        }
        if free == 0 {
            return Ok(ActionOutcome::Full);
        }
        let amount = available.min(free);
        let taken = self
            .entities
            .get_mut(&target)
            .and_then(|e| e.store_mut())
            .map(|store| store.remove(ResourceKind::Energy, amount))
            .unwrap_or(0);
        self.give_worker(&worker.id, ResourceKind::Energy, taken);
        Ok(ActionOutcome::Success)
    }

    fn pickup(&mut self, worker: &Entity, target: ObjectId) -> Result<ActionOutcome> {
        let free = worker.store().map(|s| s.free_capacity()).unwrap_or(0);
        let (resource, available) = match self.entities.get(&target).map(|e| &e.body) {
            Some(EntityBody::DroppedResource { resource, amount }) => (*resource, *amount),
            _ => return Err(JobError::TargetLost(target)),
        };
        if free == 0 {
            return Ok(ActionOutcome::Full);
        }
        let taken = self.give_worker(&worker.id, resource, available.min(free));
        if taken >= available {
            self.remove(&target);
        } else if let Some(Entity {
            body: EntityBody::DroppedResource { amount, .. },
            ..
        }) = self.entities.get_mut(&target)
        {
            *amount -= taken;
        }
        Ok(ActionOutcome::Success)
    }

    /// Energy goes anywhere; other resources only into storage and terminals
    fn transfer(&mut self, worker: &Entity, target: ObjectId) -> Result<ActionOutcome> {
        let destination = self.entities.get(&target).ok_or(JobError::TargetLost(target))?;
        let free = destination.store().map(|s| s.free_capacity()).unwrap_or(0);
        let accepts_any = matches!(destination.kind(), EntityKind::Storage | EntityKind::Terminal);
        let carried = worker.store().and_then(|store| {
            let energy = store.energy();
            if energy > 0 {
                return Some((ResourceKind::Energy, energy));
            }
            store.iter().find(|(resource, amount)| {
                *amount > 0 && (accepts_any || *resource == ResourceKind::Energy)
            })
        });
        let Some((resource, amount)) = carried else {
            return Ok(ActionOutcome::Empty);
        };
        if free == 0 {
            return Ok(ActionOutcome::Full);
        }
        let moved = self
            .entities
            .get_mut(&target)
            .and_then(|e| e.store_mut())
            .map(|store| store.add(resource, amount))
            .unwrap_or(0);
        if let Some(store) = self.entities.get_mut(&worker.id).and_then(|e| e.store_mut()) {
            store.remove(resource, moved);
        }
        Ok(ActionOutcome::Success)
    }

    fn build(&mut self, worker: &Entity, target: ObjectId) -> Result<ActionOutcome> {
        let body = worker.worker().ok_or(JobError::WorkerNotFound(worker.id))?;
        let carried = body.store.energy();
        if carried == 0 {
            return Ok(ActionOutcome::Empty);
        }
        let effort = carried.min(body.work_parts * BUILD_POWER);
        let site = self.entities.get_mut(&target).ok_or(JobError::TargetLost(target))?;
        let finished = match &mut site.body {
            EntityBody::ConstructionSite {
                structure,
                progress,
                progress_total,
            } => {
                *progress = (*progress + effort).min(*progress_total);
                (*progress >= *progress_total).then_some(*structure)
            }
            _ => return Err(JobError::TargetLost(target)),
        };
        self.take_worker_energy(&worker.id, effort);

        if let Some(kind) = finished {
            if let Some(site) = self.remove(&target) {
                let state = StructureState {
                    hits: 1_000,
                    hits_max: 1_000,
                    store: None,
                    cooldown: 0,
                };
                self.spawn(site.pos, EntityBody::Structure { kind, state });
            }
        }
        Ok(ActionOutcome::Success)
    }

    fn repair(&mut self, worker: &Entity, target: ObjectId) -> Result<ActionOutcome> {
        let body = worker.worker().ok_or(JobError::WorkerNotFound(worker.id))?;
        let carried = body.store.energy();
        if carried == 0 {
            return Ok(ActionOutcome::Empty);
        }
        let parts = carried.min(body.work_parts);
        let state = match self.entities.get_mut(&target).map(|e| &mut e.body) {
            Some(EntityBody::Structure { state, .. }) => state,
            _ => return Err(JobError::TargetLost(target)),
        };
        if state.hits >= state.hits_max {
            return Ok(ActionOutcome::Full);
        }
        state.hits = (state.hits + parts * REPAIR_POWER).min(state.hits_max);
        self.take_worker_energy(&worker.id, parts);
        Ok(ActionOutcome::Success)
    }

    fn upgrade(&mut self, worker: &Entity, target: ObjectId) -> Result<ActionOutcome> {
        let body = worker.worker().ok_or(JobError::WorkerNotFound(worker.id))?;
        let carried = body.store.energy();
        if carried == 0 {
            return Ok(ActionOutcome::Empty);
        }
        let spent = carried.min(body.work_parts * UPGRADE_POWER);
        match self.entities.get_mut(&target).map(|e| &mut e.body) {
            Some(EntityBody::Controller(controller)) if controller.is_mine() => {
                controller.progress += spent;
            }
            Some(EntityBody::Controller(_)) => return Ok(ActionOutcome::Empty),
            _ => return Err(JobError::TargetLost(target)),
        }
        self.take_worker_energy(&worker.id, spent);
        Ok(ActionOutcome::Success)
    }

    fn sign(&mut self, target: ObjectId) -> Result<ActionOutcome> {
        let text = self.sign_text.clone();
        match self.entities.get_mut(&target).map(|e| &mut e.body) {
            Some(EntityBody::Controller(controller)) => {
                controller.sign = Some(text);
                Ok(ActionOutcome::Success)
            }
            _ => Err(JobError::TargetLost(target)),
        }
    }

    fn controller_action(
        &mut self,
        worker: &Entity,
        handler: ActionHandler,
        zone: &ZoneId,
    ) -> Result<ActionOutcome> {
        let body = worker.worker().ok_or(JobError::WorkerNotFound(worker.id))?;
        if body.claim_parts == 0 {
            return Ok(ActionOutcome::Empty);
        }
        let claim_parts = body.claim_parts;
        let controller_id = match self.controller_in(zone) {
            Some(c) if c.pos.is_near_to(&worker.pos) => c.id,
            Some(_) => return Ok(ActionOutcome::NotInRange),
            None => return Ok(ActionOutcome::Empty),
        };
        let controller = match self.entities.get_mut(&controller_id).map(|e| &mut e.body) {
            Some(EntityBody::Controller(c)) => c,
            _ => return Err(JobError::TargetLost(controller_id)),
        };

        match handler {
            ActionHandler::Claim => {
                if controller.owner != Ownership::Unowned {
                    return Ok(ActionOutcome::Full);
                }
                *controller = ControllerState::owned(1);
            }
            ActionHandler::Reserve => {
                let reservation = controller.reservation.get_or_insert(Reservation {
                    owner: Ownership::Mine,
                    ticks_to_end: 0,
                });
                if reservation.owner != Ownership::Mine {
                    return Ok(ActionOutcome::Full);
                }
                if reservation.ticks_to_end >= RESERVATION_MAX {
                    return Ok(ActionOutcome::Full);
                }
                reservation.ticks_to_end =
                    (reservation.ticks_to_end + claim_parts * RESERVE_POWER).min(RESERVATION_MAX);
            }
            ActionHandler::AttackController => {
                match &mut controller.reservation {
                    Some(r) if r.owner != Ownership::Mine => {
                        r.ticks_to_end = r
                            .ticks_to_end
                            .saturating_sub(claim_parts * ATTACK_CONTROLLER_POWER);
                        if r.ticks_to_end == 0 {
                            controller.reservation = None;
                        }
                    }
                    _ if matches!(controller.owner, Ownership::Foreign(_)) => {
                        controller.level = controller.level.saturating_sub(1);
                        if controller.level == 0 {
                            controller.owner = Ownership::Unowned;
                        }
                    }
                    _ => return Ok(ActionOutcome::Empty),
                }
            }
            _ => return Err(JobError::TargetLost(controller_id)),
        }
        Ok(ActionOutcome::Success)
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new(0)
    }
}

fn handler_range(handler: ActionHandler) -> u32 {
    match handler {
        ActionHandler::Build | ActionHandler::Repair | ActionHandler::Upgrade => 3,
        ActionHandler::MoveToZone => 0,
        _ => 1,
    }
}

impl WorldQuery for SimWorld {
    fn tick(&self) -> Tick {
        self.tick
    }

    fn is_visible(&self, zone: &ZoneId) -> bool {
        let Some(sim_zone) = self.zones.get(zone) else {
            return false;
        };
        sim_zone.observed
            || self.iter().any(|e| {
                e.zone() == zone
                    && match &e.body {
                        EntityBody::Worker(_) => true,
                        EntityBody::Controller(c) => c.is_mine(),
                        _ => false,
                    }
            })
    }

    fn zone_known(&self, zone: &ZoneId) -> bool {
        self.zones.contains_key(zone)
    }

    fn find_entities(
        &self,
        zone: &ZoneId,
        kind: EntityKind,
        filter: Option<&dyn Fn(&Entity) -> bool>,
    ) -> Vec<Entity> {
        self.iter()
            .filter(|e| e.zone() == zone && e.kind() == kind)
            .filter(|e| filter.map_or(true, |f| f(e)))
            .cloned()
            .collect()
    }

    fn resolve(&self, id: &ObjectId) -> Option<Entity> {
        self.entities.get(id).cloned()
    }

    fn distance(&self, from: &Position, to: &Position) -> Option<u32> {
        from.range_to(to)
    }

    fn access_tiles(&self, pos: &Position) -> u32 {
        let walls = self.zones.get(&pos.zone).map(|z| &z.walls);
        pos.neighbors()
            .filter(|tile| !walls.is_some_and(|w| w.contains(&(tile.x, tile.y))))
            .count() as u32
    }

    fn neighbor_zones(&self, zone: &ZoneId) -> Vec<ZoneId> {
        self.zones
            .get(zone)
            .map(|z| z.neighbors.clone())
            .unwrap_or_default()
    }
}

impl MovementExecutor for SimWorld {
    fn move_to(&mut self, worker: &ObjectId, target: &JobTarget, range: u32) -> Result<()> {
        let from = self.worker_entity(worker)?.pos.clone();
        let target_zone = match target {
            JobTarget::Object(id) => {
                self.entities.get(id).ok_or(JobError::TargetLost(*id))?.pos.zone.clone()
            }
            JobTarget::Zone(zone) => zone.clone(),
        };

        let next = if from.zone != target_zone {
            // one zone hop per tick, arriving at the centre
            if !self.zones.contains_key(&target_zone) {
                return Err(JobError::UnknownZone(target_zone));
            }
            Position::new(target_zone, 25, 25)
        } else if matches!(target, JobTarget::Zone(_)) && range == 0 {
            return Ok(());
        } else {
            match self.target_position(target)? {
                Some(goal) if !from.in_range_to(&goal, range) => from.step_toward(&goal),
                _ => return Ok(()),
            }
        };

        if let Some(entity) = self.entities.get_mut(worker) {
            entity.pos = next;
        }
        Ok(())
    }
}

impl ActionExecutor for SimWorld {
    fn perform(
        &mut self,
        worker: &ObjectId,
        handler: ActionHandler,
        target: &JobTarget,
    ) -> Result<ActionOutcome> {
        let actor = self.worker_entity(worker)?.clone();

        let id = match target {
            JobTarget::Zone(zone) => {
                if !self.zones.contains_key(zone) {
                    return Err(JobError::UnknownZone(zone.clone()));
                }
                if actor.zone() != zone {
                    return Ok(ActionOutcome::NotInRange);
                }
                return match handler {
                    ActionHandler::MoveToZone => Ok(ActionOutcome::Success),
                    _ => self.controller_action(&actor, handler, zone),
                };
            }
            JobTarget::Object(id) => *id,
        };

        let target_pos = self.entities.get(&id).ok_or(JobError::TargetLost(id))?.pos.clone();
        if !actor.pos.in_range_to(&target_pos, handler_range(handler)) {
            return Ok(ActionOutcome::NotInRange);
        }

        match handler {
            ActionHandler::HarvestSource => self.harvest_source(&actor, id),
            ActionHandler::HarvestMineral => self.harvest_mineral(&actor, id),
            ActionHandler::Withdraw => self.withdraw(&actor, id),
            ActionHandler::Pickup => self.pickup(&actor, id),
            ActionHandler::Transfer => self.transfer(&actor, id),
            ActionHandler::Build => self.build(&actor, id),
            ActionHandler::Repair => self.repair(&actor, id),
            ActionHandler::Upgrade => self.upgrade(&actor, id),
            ActionHandler::Sign => self.sign(id),
            ActionHandler::Claim
            | ActionHandler::Reserve
            | ActionHandler::AttackController
            | ActionHandler::MoveToZone => Err(JobError::TargetLost(id)),
        }
    }
}

/// Structure state helper for seeding worlds
pub fn structure(kind: EntityKind, hits: u32, hits_max: u32, store: Option<Store>) -> EntityBody {
    EntityBody::Structure {
        kind,
        state: StructureState {
            hits,
            hits_max,
            store,
            cooldown: 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::capabilities::Role;
    use crate::world::entity::WorkerBody;

    fn zone() -> ZoneId {
        ZoneId::from("W1N1")
    }

    fn worker(world: &mut SimWorld, x: u8, y: u8, work: u32, carry: u32) -> ObjectId {
        let body = WorkerBody::new("w", Role::Harvester, zone()).with_parts(work, carry, 0);
        world.spawn(Position::new(zone(), x, y), EntityBody::Worker(body))
    }

    #[test]
    fn test_same_seed_same_ids() {
        let mut a = SimWorld::new(7);
        let mut b = SimWorld::new(7);
        let pos = Position::new("W1N1", 1, 1);
        let body = EntityBody::Source { energy: 10, energy_capacity: 10 };
        assert_eq!(a.spawn(pos.clone(), body.clone()), b.spawn(pos, body));
    }

    #[test]
    fn test_visibility_follows_workers() {
        let mut world = SimWorld::new(1);
        world.add_zone(zone());
        assert!(!world.is_visible(&zone()));
        worker(&mut world, 10, 10, 1, 1);
        assert!(world.is_visible(&zone()));
    }

    #[test]
    fn test_move_steps_until_in_range() {
        let mut world = SimWorld::new(1);
        let w = worker(&mut world, 10, 10, 1, 1);
        let source = world.spawn(
            Position::new(zone(), 14, 10),
            EntityBody::Source { energy: 3000, energy_capacity: 3000 },
        );
        let target = JobTarget::Object(source);
        for _ in 0..5 {
            world.move_to(&w, &target, 1).unwrap();
        }
        assert_eq!(world.get(&w).unwrap().pos.x, 13);
    }

    #[test]
    fn test_harvest_fills_worker_then_reports_full() {
        let mut world = SimWorld::new(1);
        let w = worker(&mut world, 10, 10, 5, 1);
        let source = world.spawn(
            Position::new(zone(), 11, 10),
            EntityBody::Source { energy: 3000, energy_capacity: 3000 },
        );
        let target = JobTarget::Object(source);
        // 10 energy per tick into a 50 capacity store
        for _ in 0..4 {
            assert_eq!(
                world.perform(&w, ActionHandler::HarvestSource, &target).unwrap(),
                ActionOutcome::Success
            );
        }
        assert_eq!(
            world.perform(&w, ActionHandler::HarvestSource, &target).unwrap(),
            ActionOutcome::Full
        );
        assert_eq!(world.get(&w).unwrap().energy(), 50);
    }

    #[test]
    fn test_miner_overflow_goes_into_container() {
        let mut world = SimWorld::new(1);
        let w = worker(&mut world, 10, 10, 5, 0);
        let container = world.spawn(
            Position::new(zone(), 10, 10),
            structure(EntityKind::Container, 250_000, 250_000, Some(Store::new(2000))),
        );
        let source = world.spawn(
            Position::new(zone(), 11, 10),
            EntityBody::Source { energy: 3000, energy_capacity: 3000 },
        );
        let outcome = world
            .perform(&w, ActionHandler::HarvestSource, &JobTarget::Object(source))
            .unwrap();
        assert_eq!(outcome, ActionOutcome::Success);
        assert_eq!(world.get(&container).unwrap().energy(), 10);
    }

    #[test]
    fn test_transfer_reports_full_destination() {
        let mut world = SimWorld::new(1);
        let w = worker(&mut world, 10, 10, 1, 2);
        world.give_worker(&w, ResourceKind::Energy, 100);
        let spawn = world.spawn(
            Position::new(zone(), 10, 11),
            structure(
                EntityKind::Spawn,
                5000,
                5000,
                Some(Store::new(300).with(ResourceKind::Energy, 300)),
            ),
        );
        let outcome = world
            .perform(&w, ActionHandler::Transfer, &JobTarget::Object(spawn))
            .unwrap();
        assert_eq!(outcome, ActionOutcome::Full);
    }

    #[test]
    fn test_perform_on_missing_target() {
        let mut world = SimWorld::new(1);
        let w = worker(&mut world, 10, 10, 1, 1);
        let gone = ObjectId::new();
        let err = world.perform(&w, ActionHandler::Withdraw, &JobTarget::Object(gone)).unwrap_err();
        assert!(matches!(err, JobError::TargetLost(id) if id == gone));
    }

    #[test]
    fn test_tombstones_decay() {
        let mut world = SimWorld::new(1);
        let id = world.spawn(
            Position::new(zone(), 5, 5),
            EntityBody::Tombstone {
                store: Store::new(500).with(ResourceKind::Energy, 200),
                decays_at: 2,
            },
        );
        world.advance();
        assert!(world.get(&id).is_some());
        world.advance();
        assert!(world.get(&id).is_none());
    }
}
