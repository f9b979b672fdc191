//! Job assignment: role priority chains over the catalog

pub mod capabilities;
pub mod registry;
pub mod roles;
pub mod select;

pub use capabilities::{Capability, CapabilitySet, Role, RoleCapabilities};
pub use registry::{PolicyRegistry, Selection};
pub use roles::RolePolicy;
pub use select::SelectionContext;
