//! Cached world-state snapshots

pub mod state_cache;

pub use state_cache::{CachedCategory, Category, StateCache};
