pub mod catalog;

pub use catalog::{handler_for, ActionHandler, ActionKind, ActionOutcome};
