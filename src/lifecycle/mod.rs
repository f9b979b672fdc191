pub mod guard;

pub use guard::{ClearReason, JobPhase, LifecycleGuard, MoveTarget};
