//! Zone documents that persist between ticks

pub mod store;
pub mod zone_state;

pub use store::{InMemoryZoneStore, ZoneStore};
pub use zone_state::{Counter, WorkerAssignment, ZoneCounters, ZonePatch, ZoneState};
