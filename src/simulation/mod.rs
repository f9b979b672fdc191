pub mod tick;

pub use tick::{JobEngine, TickEvent, TickReport};
