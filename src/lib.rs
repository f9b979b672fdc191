//! Colony Jobs - job catalog and assignment engine for zone-bound worker units

pub mod actions;
pub mod cache;
pub mod core;
pub mod jobs;
pub mod lifecycle;
pub mod memory;
pub mod policy;
pub mod simulation;
pub mod world;
