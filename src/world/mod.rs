//! World entities and the contracts the engine drives them through

pub mod entity;
pub mod query;
pub mod sim;

pub use entity::{Entity, EntityBody, EntityKind, ResourceKind, Store, WorkerBody};
pub use query::{ActionExecutor, MovementExecutor, World, WorldQuery};
pub use sim::SimWorld;
