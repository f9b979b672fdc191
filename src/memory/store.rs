//! Zone document store

use ahash::AHashMap;

use crate::core::error::{JobError, Result};
use crate::core::types::ZoneId;
use crate::memory::zone_state::{ZonePatch, ZoneState};

/// Key-value store of zone documents, last write wins
pub trait ZoneStore {
    /// The zone's document, or a default one if nothing was written yet
    fn read_zone_memory(&self, zone: &ZoneId) -> Result<ZoneState>;

    fn write_zone_memory(&mut self, zone: &ZoneId, patch: ZonePatch) -> Result<()>;
}

/// Store keeping each zone document as serialized JSON
#[derive(Debug, Clone, Default)]
pub struct InMemoryZoneStore {
    documents: AHashMap<ZoneId, String>,
    writes: u64,
}

impl InMemoryZoneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a whole document, used to seed zones
    pub fn put(&mut self, zone: &ZoneId, state: &ZoneState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        self.documents.insert(zone.clone(), json);
        self.writes += 1;
        Ok(())
    }

    /// Raw document text, if the zone has one
    pub fn raw(&self, zone: &ZoneId) -> Option<&str> {
        self.documents.get(zone).map(String::as_str)
    }

    /// Overwrite a document with arbitrary text; reads of it will fail to parse
    pub fn put_raw(&mut self, zone: &ZoneId, text: impl Into<String>) {
        self.documents.insert(zone.clone(), text.into());
    }

    pub fn write_count(&self) -> u64 {
        self.writes
    }

    pub fn zones(&self) -> impl Iterator<Item = &ZoneId> {
        self.documents.keys()
    }
}

impl ZoneStore for InMemoryZoneStore {
    fn read_zone_memory(&self, zone: &ZoneId) -> Result<ZoneState> {
        match self.documents.get(zone) {
            Some(json) => serde_json::from_str(json)
                .map_err(|e| JobError::Store(format!("zone {} document is corrupt: {}", zone, e))),
            None => Ok(ZoneState::default()),
        }
    }

    fn write_zone_memory(&mut self, zone: &ZoneId, patch: ZonePatch) -> Result<()> {
        let mut state = self.read_zone_memory(zone)?;
        state.apply(patch);
        self.put(zone, &state)
    }
}
