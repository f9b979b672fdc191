//! Job model, capacity accounting, factories and the catalog

pub mod capacity;
pub mod catalog;
pub mod factories;
pub mod job;

pub use capacity::{
    adjust_for_in_flight_workers, compute_taken, InFlightContribution, Roster, RosterEntry,
};
pub use catalog::{CatalogView, JobCatalog};
pub use job::{Job, JobDetail, JobFamily, JobKind, JobTarget, RestorePolicy, TargetKind};
