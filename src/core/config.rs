//! Engine configuration with documented constants
//!
//! Every staleness window and threshold the catalog uses is collected here.
//! The table can be overridden from a TOML document; anything omitted keeps
//! its default.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{JobError, Result};
use crate::core::types::Tick;

/// Staleness window for a cached category, in ticks
///
/// `-1` is sticky: the entry never expires on its own and is only replaced by
/// a forced refresh. Zero would refresh every tick for no benefit and is
/// rejected, as is anything below `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Ttl(i64);

impl Ttl {
    pub const STICKY: Ttl = Ttl(-1);

    pub fn from_raw(raw: i64) -> Result<Self> {
        if raw == -1 || raw > 0 {
            Ok(Self(raw))
        } else {
            Err(JobError::InvalidTtl(raw))
        }
    }

    /// Only for compile-time defaults; `n` must be positive
    const fn ticks(n: u32) -> Self {
        Self(n as i64)
    }

    pub fn raw(&self) -> i64 {
        self.0
    }

    pub fn is_sticky(&self) -> bool {
        self.0 == -1
    }

    /// Stale when strictly more than `ttl` ticks have passed since the refresh
    pub fn is_stale(&self, last_refreshed: Tick, now: Tick) -> bool {
        if self.is_sticky() {
            return false;
        }
        now.saturating_sub(last_refreshed) > self.0 as u64
    }
}

impl TryFrom<i64> for Ttl {
    type Error = JobError;

    fn try_from(raw: i64) -> Result<Self> {
        Ttl::from_raw(raw)
    }
}

impl From<Ttl> for i64 {
    fn from(ttl: Ttl) -> i64 {
        ttl.0
    }
}

/// Staleness windows for world-state categories and for derived job lists
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlTable {
    // === WORLD STATE CATEGORIES ===
    pub structures: Ttl,
    /// Sources never move or disappear, so they are fetched once
    pub sources: Ttl,
    pub minerals: Ttl,
    pub construction_sites: Ttl,
    pub tombstones: Ttl,
    pub ruins: Ttl,
    pub dropped_resources: Ttl,
    /// Must stay within 3..=20; longer windows hide freshly spawned workers
    pub friendly_roster: Ttl,
    pub hostile_roster: Ttl,

    // === ENERGY ACQUISITION JOBS ===
    pub source_jobs: Ttl,
    pub mineral_jobs: Ttl,
    /// Short: container contents drive double assignment
    pub container_jobs: Ttl,
    pub link_jobs: Ttl,
    pub backup_jobs: Ttl,
    pub pickup_jobs: Ttl,
    pub loot_jobs: Ttl,

    // === DELIVERY JOBS ===
    pub fill_jobs: Ttl,
    pub store_jobs: Ttl,

    // === LABOR JOBS ===
    pub build_jobs: Ttl,
    pub repair_jobs: Ttl,
    pub priority_repair_jobs: Ttl,
    pub upgrade_jobs: Ttl,
    pub sign_jobs: Ttl,

    // === CLAIM JOBS ===
    pub claim_jobs: Ttl,
    pub reserve_jobs: Ttl,
    pub attack_jobs: Ttl,
}

impl Default for TtlTable {
    fn default() -> Self {
        Self {
            structures: Ttl::ticks(50),
            sources: Ttl::STICKY,
            minerals: Ttl::STICKY,
            construction_sites: Ttl::ticks(50),
            tombstones: Ttl::ticks(50),
            ruins: Ttl::ticks(50),
            dropped_resources: Ttl::ticks(50),
            friendly_roster: Ttl::ticks(3),
            hostile_roster: Ttl::ticks(1),

            source_jobs: Ttl::ticks(50),
            mineral_jobs: Ttl::ticks(50),
            container_jobs: Ttl::ticks(5),
            link_jobs: Ttl::ticks(50),
            backup_jobs: Ttl::ticks(5),
            pickup_jobs: Ttl::ticks(50),
            loot_jobs: Ttl::ticks(50),

            fill_jobs: Ttl::ticks(10),
            store_jobs: Ttl::ticks(50),

            build_jobs: Ttl::ticks(10),
            repair_jobs: Ttl::ticks(10),
            priority_repair_jobs: Ttl::ticks(10),
            upgrade_jobs: Ttl::STICKY,
            sign_jobs: Ttl::ticks(50),

            claim_jobs: Ttl::ticks(1),
            reserve_jobs: Ttl::ticks(1),
            attack_jobs: Ttl::ticks(1),
        }
    }
}

/// Configuration for the job catalog and assignment engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ttl: TtlTable,

    // === HARVEST MODEL ===
    /// Energy extracted per active work part per tick
    ///
    /// A worker's extraction rate is `harvest_per_work_part * work_parts`.
    pub harvest_per_work_part: u32,

    /// Ticks a source takes to regenerate to full capacity
    ///
    /// An assigned miner is expected to drain `rate * source_regen_ticks`
    /// over one window, which is what the in-flight adjustment subtracts.
    pub source_regen_ticks: u32,

    /// Pick the nearest accessible source instead of the first suitable one
    pub miners_get_closest_source: bool,

    // === ENERGY THRESHOLDS ===
    /// Containers at or below this are not worth a trip
    pub container_minimum_energy: u32,
    pub link_minimum_energy: u32,
    pub tombstone_minimum_energy: u32,
    pub ruin_minimum_energy: u32,

    /// Loot and drops must cover this fraction of a worker's carry capacity
    pub loot_carry_fraction: f32,

    // === REPAIR ===
    /// Structures below this fraction of their hit limit get a repair job
    pub repair_threshold: f32,
    /// Structures below this fraction get a priority repair job
    pub priority_repair_threshold: f32,
    /// Wall and rampart hit limit per controller level (index = level)
    pub wall_limits: Vec<u32>,

    // === DELIVERY ===
    /// Towers are refilled once they drop below this fraction
    pub tower_fill_threshold: f32,

    // === CLAIMING ===
    /// Reservation ticks a reserver aims to keep on a remote controller
    pub reserve_target_ticks: u32,
    /// Text written when signing controllers
    pub signing_text: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ttl: TtlTable::default(),

            harvest_per_work_part: 2,
            source_regen_ticks: 300,
            miners_get_closest_source: true,

            container_minimum_energy: 100,
            link_minimum_energy: 1,
            tombstone_minimum_energy: 25,
            ruin_minimum_energy: 25,
            loot_carry_fraction: 0.6,

            repair_threshold: 0.9,
            priority_repair_threshold: 0.3,
            wall_limits: vec![
                0, 6_250, 12_500, 25_000, 50_000, 100_000, 200_000, 400_000, 1_000_000,
            ],

            tower_fill_threshold: 0.8,

            reserve_target_ticks: 5_000,
            signing_text: "colony territory - workers only".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document, filling omitted keys with defaults, and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let roster = self.ttl.friendly_roster.raw();
        if !(3..=20).contains(&roster) {
            return Err(JobError::InvalidConfig(format!(
                "friendly_roster TTL ({}) must be between 3 and 20",
                roster
            )));
        }

        if self.priority_repair_threshold >= self.repair_threshold {
            return Err(JobError::InvalidConfig(format!(
                "priority_repair_threshold ({}) should be < repair_threshold ({})",
                self.priority_repair_threshold, self.repair_threshold
            )));
        }

        if self.repair_threshold > 1.0 || self.tower_fill_threshold > 1.0 {
            return Err(JobError::InvalidConfig(
                "Thresholds are fractions and must be <= 1.0".into(),
            ));
        }

        if !(self.loot_carry_fraction > 0.0 && self.loot_carry_fraction <= 1.0) {
            return Err(JobError::InvalidConfig(format!(
                "loot_carry_fraction ({}) must be in (0, 1]",
                self.loot_carry_fraction
            )));
        }

        if self.harvest_per_work_part == 0 || self.source_regen_ticks == 0 {
            return Err(JobError::InvalidConfig("Harvest model rates must be positive".into()));
        }

        if self.wall_limits.len() != 9 {
            return Err(JobError::InvalidConfig(format!(
                "wall_limits needs one entry per controller level 0..=8, got {}",
                self.wall_limits.len()
            )));
        }

        Ok(())
    }

    /// Wall and rampart hit ceiling for a controller level
    pub fn wall_limit(&self, controller_level: u8) -> u32 {
        let idx = (controller_level as usize).min(self.wall_limits.len().saturating_sub(1));
        self.wall_limits.get(idx).copied().unwrap_or(0)
    }

    /// Energy one worker drains from a source over a regeneration window
    /// Saturates instead of wrapping for oversized configured rates
    pub fn harvest_window(&self, work_parts: u32) -> u32 {
        work_parts
            .saturating_mul(self.harvest_per_work_part)
            .saturating_mul(self.source_regen_ticks)
    }
}
