//! Per-zone, per-category snapshots of world entities

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::{Ttl, TtlTable};
use crate::core::error::{JobError, Result};
use crate::core::types::{Tick, ZoneId};
use crate::world::entity::{Entity, EntityKind};
use crate::world::query::WorldQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Structures,
    Sources,
    Minerals,
    ConstructionSites,
    Tombstones,
    Ruins,
    DroppedResources,
    FriendlyRoster,
    HostileRoster,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Structures,
        Category::Sources,
        Category::Minerals,
        Category::ConstructionSites,
        Category::Tombstones,
        Category::Ruins,
        Category::DroppedResources,
        Category::FriendlyRoster,
        Category::HostileRoster,
    ];

    /// Entity kinds a snapshot of this category may contain
    pub fn kinds(&self) -> &'static [EntityKind] {
        match self {
            Category::Structures => &EntityKind::STRUCTURES,
            Category::Sources => &[EntityKind::Source],
            Category::Minerals => &[EntityKind::Mineral],
            Category::ConstructionSites => &[EntityKind::ConstructionSite],
            Category::Tombstones => &[EntityKind::Tombstone],
            Category::Ruins => &[EntityKind::Ruin],
            Category::DroppedResources => &[EntityKind::DroppedResource],
            Category::FriendlyRoster => &[EntityKind::Worker],
            Category::HostileRoster => &[EntityKind::Hostile],
        }
    }

    pub fn ttl(&self, table: &TtlTable) -> Ttl {
        match self {
            Category::Structures => table.structures,
            Category::Sources => table.sources,
            Category::Minerals => table.minerals,
            Category::ConstructionSites => table.construction_sites,
            Category::Tombstones => table.tombstones,
            Category::Ruins => table.ruins,
            Category::DroppedResources => table.dropped_resources,
            Category::FriendlyRoster => table.friendly_roster,
            Category::HostileRoster => table.hostile_roster,
        }
    }
}

/// A snapshot plus the tick it was taken at
#[derive(Debug, Clone)]
pub struct CachedCategory<T> {
    pub zone: ZoneId,
    pub category: Category,
    pub data: T,
    pub last_refreshed: Tick,
    pub ttl: Ttl,
}

impl<T> CachedCategory<T> {
    pub fn is_stale(&self, now: Tick) -> bool {
        self.ttl.is_stale(self.last_refreshed, now)
    }
}

/// World-state cache; a refresh replaces a category's snapshot wholesale
#[derive(Debug, Clone, Default)]
pub struct StateCache {
    entries: AHashMap<(ZoneId, Category), CachedCategory<Vec<Entity>>>,
    ttl: TtlTable,
    refreshes: u64,
}

impl StateCache {
    pub fn new(ttl: TtlTable) -> Self {
        Self {
            entries: AHashMap::new(),
            ttl,
            refreshes: 0,
        }
    }

    /// Snapshot of `category` in `zone`, recomputed when stale or forced
    ///
    /// Zones we cannot observe yield an empty slice and are not cached; an
    /// empty result means "no data", not "nothing there".
    pub fn get<W: WorldQuery + ?Sized>(
        &mut self,
        world: &W,
        zone: &ZoneId,
        category: Category,
        force: bool,
    ) -> Result<&[Entity]> {
        if !world.is_visible(zone) {
            debug!(zone = %zone, ?category, "no vision, returning empty snapshot");
            return Ok(&[]);
        }

        let now = world.tick();
        let key = (zone.clone(), category);
        let stale = self.entries.get(&key).map_or(true, |entry| entry.is_stale(now));

        if force || stale {
            let data = Self::collect(world, zone, category)?;
            debug!(zone = %zone, ?category, count = data.len(), tick = now, "refreshed category");
            self.refreshes += 1;
            self.entries.insert(
                key.clone(),
                CachedCategory {
                    zone: zone.clone(),
                    category,
                    data,
                    last_refreshed: now,
                    ttl: category.ttl(&self.ttl),
                },
            );
        }

        Ok(self
            .entries
            .get(&key)
            .map(|entry| entry.data.as_slice())
            .unwrap_or(&[]))
    }

    fn collect<W: WorldQuery + ?Sized>(
        world: &W,
        zone: &ZoneId,
        category: Category,
    ) -> Result<Vec<Entity>> {
        let kinds = category.kinds();
        let mut data = Vec::new();
        for kind in kinds {
            for entity in world.find_entities(zone, *kind, None) {
                if !kinds.contains(&entity.kind()) {
                    return Err(JobError::UnexpectedEntity {
                        category,
                        kind: entity.kind(),
                    });
                }
                data.push(entity);
            }
        }
        Ok(data)
    }

    /// Cached entry metadata, if any
    pub fn entry(&self, zone: &ZoneId, category: Category) -> Option<&CachedCategory<Vec<Entity>>> {
        self.entries.get(&(zone.clone(), category))
    }

    pub fn invalidate(&mut self, zone: &ZoneId, category: Category) {
        self.entries.remove(&(zone.clone(), category));
    }

    pub fn invalidate_zone(&mut self, zone: &ZoneId) {
        self.entries.retain(|(z, _), _| z != zone);
    }

    /// Number of recomputations performed so far
    pub fn refresh_count(&self) -> u64 {
        self.refreshes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Position;
    use crate::world::entity::EntityBody;
    use crate::world::sim::SimWorld;

    fn world_with_source() -> (SimWorld, ZoneId) {
        let mut world = SimWorld::new(3);
        let zone = world.add_zone("W1N1");
        world.set_observed(&zone, true);
        world.spawn(
            Position::new(zone.clone(), 10, 10),
            EntityBody::Source { energy: 3000, energy_capacity: 3000 },
        );
        (world, zone)
    }

    #[test]
    fn test_category_kinds_cover_structures() {
        assert!(Category::Structures.kinds().contains(&EntityKind::Controller));
        assert!(!Category::Structures.kinds().contains(&EntityKind::Hostile));
    }

    #[test]
    fn test_ttl_window_respected() {
        let (mut world, zone) = world_with_source();
        let mut cache = StateCache::new(TtlTable::default());
        world.set_tick(100);
        cache.get(&world, &zone, Category::Structures, false).unwrap();
        assert_eq!(cache.refresh_count(), 1);

        world.set_tick(149);
        cache.get(&world, &zone, Category::Structures, false).unwrap();
        assert_eq!(cache.refresh_count(), 1);

        world.set_tick(151);
        cache.get(&world, &zone, Category::Structures, false).unwrap();
        assert_eq!(cache.refresh_count(), 2);
        assert_eq!(cache.entry(&zone, Category::Structures).unwrap().last_refreshed, 151);
    }

    #[test]
    fn test_sticky_category_only_refreshes_when_forced() {
        let (mut world, zone) = world_with_source();
        let mut cache = StateCache::new(TtlTable::default());
        assert_eq!(cache.get(&world, &zone, Category::Sources, false).unwrap().len(), 1);

        world.spawn(
            Position::new(zone.clone(), 30, 30),
            EntityBody::Source { energy: 3000, energy_capacity: 3000 },
        );
        world.set_tick(100_000);
        assert_eq!(cache.get(&world, &zone, Category::Sources, false).unwrap().len(), 1);
        assert_eq!(cache.get(&world, &zone, Category::Sources, true).unwrap().len(), 2);
    }

    #[test]
    fn test_unobserved_zone_is_empty_and_uncached() {
        let (mut world, zone) = world_with_source();
        world.set_observed(&zone, false);
        let mut cache = StateCache::new(TtlTable::default());
        assert!(cache.get(&world, &zone, Category::Sources, false).unwrap().is_empty());
        assert!(cache.entry(&zone, Category::Sources).is_none());
        assert_eq!(cache.refresh_count(), 0);
    }
}
