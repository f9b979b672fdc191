//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Width and height of every zone, in tiles
pub const ZONE_SIZE: u8 = 50;

/// Unique identifier for world objects (sources, structures, workers, loot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Name of a zone, e.g. "W1N1"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneId(pub String);

impl ZoneId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Simulation tick counter
pub type Tick = u64;

/// A tile inside a zone
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub zone: ZoneId,
    pub x: u8,
    pub y: u8,
}

impl Position {
    pub fn new(zone: impl Into<ZoneId>, x: u8, y: u8) -> Self {
        Self {
            zone: zone.into(),
            x: x.min(ZONE_SIZE - 1),
            y: y.min(ZONE_SIZE - 1),
        }
    }

    /// Chebyshev range to another tile, `None` when the tiles are in different zones
    pub fn range_to(&self, other: &Position) -> Option<u32> {
        if self.zone != other.zone {
            return None;
        }
        let dx = (self.x as i32 - other.x as i32).unsigned_abs();
        let dy = (self.y as i32 - other.y as i32).unsigned_abs();
        Some(dx.max(dy))
    }

    pub fn in_range_to(&self, other: &Position, range: u32) -> bool {
        self.range_to(other).is_some_and(|r| r <= range)
    }

    pub fn is_near_to(&self, other: &Position) -> bool {
        self.in_range_to(other, 1)
    }

    /// The up to eight tiles surrounding this one that lie inside the zone
    pub fn neighbors(&self) -> impl Iterator<Item = Position> + '_ {
        (-1i32..=1).flat_map(move |dy| {
            (-1i32..=1).filter_map(move |dx| {
                if dx == 0 && dy == 0 {
                    return None;
                }
                let x = self.x as i32 + dx;
                let y = self.y as i32 + dy;
                let limit = ZONE_SIZE as i32;
                if x < 0 || y < 0 || x >= limit || y >= limit {
                    return None;
                }
                Some(Position {
                    zone: self.zone.clone(),
                    x: x as u8,
                    y: y as u8,
                })
            })
        })
    }

    /// One tile closer to `target` along both axes (same zone only)
    pub fn step_toward(&self, target: &Position) -> Position {
        let step = |from: u8, to: u8| match from.cmp(&to) {
            std::cmp::Ordering::Less => from + 1,
            std::cmp::Ordering::Greater => from - 1,
            std::cmp::Ordering::Equal => from,
        };
        Position {
            zone: self.zone.clone(),
            x: step(self.x, target.x),
            y: step(self.y, target.y),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {},{}]", self.zone, self.x, self.y)
    }
}
