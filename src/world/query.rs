//! Narrow contracts between the engine and the world it drives

use crate::actions::catalog::{ActionHandler, ActionOutcome};
use crate::core::error::Result;
use crate::core::types::{ObjectId, Position, Tick, ZoneId};
use crate::jobs::job::JobTarget;
use crate::world::entity::{Entity, EntityKind};

/// Read access to world state
///
/// The engine never inspects the world except through this trait.
pub trait WorldQuery {
    fn tick(&self) -> Tick;

    /// Whether anything of ours can currently observe the zone
    fn is_visible(&self, zone: &ZoneId) -> bool;

    /// Whether the zone exists at all, visible or not
    fn zone_known(&self, zone: &ZoneId) -> bool;

    fn find_entities(
        &self,
        zone: &ZoneId,
        kind: EntityKind,
        filter: Option<&dyn Fn(&Entity) -> bool>,
    ) -> Vec<Entity>;

    fn resolve(&self, id: &ObjectId) -> Option<Entity>;

    /// Travel distance between two tiles, `None` when it cannot be computed
    fn distance(&self, from: &Position, to: &Position) -> Option<u32>;

    /// Walkable tiles adjacent to `pos`
    fn access_tiles(&self, pos: &Position) -> u32;

    /// Zones bordering `zone`
    fn neighbor_zones(&self, zone: &ZoneId) -> Vec<ZoneId>;
}

/// Path execution, owned by the world
pub trait MovementExecutor {
    /// Move `worker` one step toward being within `range` of `target`
    fn move_to(&mut self, worker: &ObjectId, target: &JobTarget, range: u32) -> Result<()>;
}

/// Action execution, owned by the world
pub trait ActionExecutor {
    fn perform(
        &mut self,
        worker: &ObjectId,
        handler: ActionHandler,
        target: &JobTarget,
    ) -> Result<ActionOutcome>;
}

/// Everything the tick driver needs from a world
pub trait World: WorldQuery + MovementExecutor + ActionExecutor {}

impl<T: WorldQuery + MovementExecutor + ActionExecutor> World for T {}
