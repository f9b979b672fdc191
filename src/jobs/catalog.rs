//! Job catalog: cached, filtered job lists per zone and kind

use ahash::AHashMap;
use tracing::debug;

use crate::cache::state_cache::StateCache;
use crate::core::config::{EngineConfig, Ttl};
use crate::core::error::Result;
use crate::core::types::{Tick, ZoneId};
use crate::jobs::capacity::{compute_taken, Roster};
use crate::jobs::factories::{self, movement, FactoryContext};
use crate::jobs::job::{Job, JobFamily, JobKind, JobTarget};
use crate::memory::zone_state::ZoneState;
use crate::world::query::WorldQuery;

/// Per-tick inputs the catalog reads but does not own
#[derive(Clone, Copy)]
pub struct CatalogView<'a> {
    pub world: &'a dyn WorldQuery,
    pub roster: &'a Roster,
    pub zones: &'a AHashMap<ZoneId, ZoneState>,
}

impl<'a> CatalogView<'a> {
    pub fn new(
        world: &'a dyn WorldQuery,
        roster: &'a Roster,
        zones: &'a AHashMap<ZoneId, ZoneState>,
    ) -> Self {
        Self { world, roster, zones }
    }

    pub fn zone_state(&self, zone: &ZoneId) -> Option<&'a ZoneState> {
        self.zones.get(zone)
    }

    /// Whether a job's target still exists
    pub fn target_exists(&self, target: &JobTarget) -> bool {
        match target {
            JobTarget::Object(id) => self.world.resolve(id).is_some(),
            JobTarget::Zone(zone) => self.world.zone_known(zone),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedJobs {
    jobs: Vec<Job>,
    last_refreshed: Tick,
    ttl: Ttl,
}

pub struct JobCatalog {
    state: StateCache,
    lists: AHashMap<(ZoneId, JobKind), CachedJobs>,
    config: EngineConfig,
    derivations: u64,
}

impl JobCatalog {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            state: StateCache::new(config.ttl.clone()),
            lists: AHashMap::new(),
            config,
            derivations: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state_cache(&self) -> &StateCache {
        &self.state
    }

    pub fn state_cache_mut(&mut self) -> &mut StateCache {
        &mut self.state
    }

    /// Number of job-list derivations performed so far
    pub fn derivation_count(&self) -> u64 {
        self.derivations
    }

    /// Jobs of one kind in `zone` that match `predicate`
    ///
    /// The list is re-derived when forced or when its TTL has run out; jobs
    /// whose target no longer resolves are dropped and `is_taken` is
    /// recomputed against the roster on every read.
    pub fn get_jobs<P>(
        &mut self,
        view: &CatalogView<'_>,
        zone: &ZoneId,
        kind: JobKind,
        predicate: P,
        force: bool,
    ) -> Result<Vec<Job>>
    where
        P: Fn(&Job) -> bool,
    {
        let Some(ttl) = kind.ttl(&self.config.ttl) else {
            let job = movement::move_job(zone);
            return Ok(if predicate(&job) { vec![job] } else { Vec::new() });
        };

        if !view.world.is_visible(zone) {
            return Ok(Vec::new());
        }

        let now = view.world.tick();
        let key = (zone.clone(), kind);
        let stale = self
            .lists
            .get(&key)
            .map_or(true, |cached| cached.ttl.is_stale(cached.last_refreshed, now));

        if force || stale {
            let ctx = FactoryContext {
                world: view.world,
                roster: view.roster,
                zone_state: view.zone_state(zone),
                config: &self.config,
            };
            let jobs = factories::derive_jobs(kind, &mut self.state, &ctx, zone, force)?;
            debug!(zone = %zone, ?kind, count = jobs.len(), tick = now, "derived jobs");
            self.derivations += 1;
            self.lists.insert(
                key.clone(),
                CachedJobs {
                    jobs,
                    last_refreshed: now,
                    ttl,
                },
            );
        }

        let Some(cached) = self.lists.get(&key) else {
            return Ok(Vec::new());
        };
        Ok(cached
            .jobs
            .iter()
            .filter(|job| view.target_exists(&job.target))
            .map(|job| {
                let mut job = job.clone();
                job.is_taken = compute_taken(&job, view.roster);
                job
            })
            .filter(|job| predicate(job))
            .collect())
    }

    /// Jobs of every kind in a family, concatenated in kind order
    pub fn get_family<P>(
        &mut self,
        view: &CatalogView<'_>,
        zone: &ZoneId,
        family: JobFamily,
        predicate: P,
        force: bool,
    ) -> Result<Vec<Job>>
    where
        P: Fn(&Job) -> bool,
    {
        let mut jobs = Vec::new();
        for kind in JobKind::CACHED.iter().filter(|k| k.family() == family) {
            jobs.extend(self.get_jobs(view, zone, *kind, &predicate, force)?);
        }
        if family == JobFamily::Movement {
            jobs.extend(self.get_jobs(view, zone, JobKind::Move, &predicate, force)?);
        }
        Ok(jobs)
    }

    /// Drop every cached list and snapshot for a zone
    pub fn invalidate_zone(&mut self, zone: &ZoneId) {
        self.lists.retain(|(z, _), _| z != zone);
        self.state.invalidate_zone(zone);
    }
}
