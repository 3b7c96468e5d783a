//! Signature-keyed storage for computed layouts.
//!
//! A record is reused only while the set of clustered entity IDs is exactly
//! the one it was computed for and the grid geometry is unchanged. Records
//! hold IDs and coordinates only, so nicknames, images and live counts always
//! come from the latest fetch.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{GridGeometry, LayoutConfig};
use crate::ir::Entity;
use crate::layout::{ChainGroup, DashboardLayout, PositionEntry, canvas_for_positions};

/// Slot key the dashboard page has always used for its stored layout.
pub const LAYOUT_CACHE_KEY: &str = "layout_v2";
pub const SIGNATURE_SEPARATOR: &str = "|";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache slot I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("cache record could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Sorted, deduplicated, pipe-joined IDs of the entities that have at least
/// one group. Unclustered entities never affect it.
pub fn signature(entities: &[Entity]) -> String {
    let mut ids: Vec<&str> = entities
        .iter()
        .filter(|entity| entity.is_grouped())
        .map(|entity| entity.id.as_str())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids.join(SIGNATURE_SEPARATOR)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub signature: String,
    pub geometry: GridGeometry,
    pub positions: Vec<PositionEntry>,
    pub chain: Vec<ChainGroup>,
}

#[derive(Serialize)]
struct CacheRecordRef<'a> {
    signature: &'a str,
    geometry: GridGeometry,
    positions: &'a [PositionEntry],
    chain: &'a [ChainGroup],
}

impl CacheRecord {
    /// Decode a stored record and accept it only for `signature` laid out
    /// with `geometry`.
    pub fn decode_for(raw: &str, signature: &str, geometry: &GridGeometry) -> Option<Self> {
        let record: CacheRecord = match serde_json::from_str(raw) {
            Ok(record) => record,
            Err(err) => {
                debug!(error = %err, "discarding unreadable layout cache record");
                return None;
            }
        };
        if record.signature != signature {
            debug!("layout cache signature mismatch");
            return None;
        }
        if record.geometry != *geometry {
            debug!("layout cache geometry mismatch");
            return None;
        }
        Some(record)
    }

    pub fn encode(
        signature: &str,
        geometry: GridGeometry,
        positions: &[PositionEntry],
        chain: &[ChainGroup],
    ) -> Result<String, CacheError> {
        let record = CacheRecordRef {
            signature,
            geometry,
            positions,
            chain,
        };
        Ok(serde_json::to_string(&record)?)
    }

    /// Rebuild a layout, re-measuring the canvas from the stored rows.
    pub fn into_layout(self, config: &LayoutConfig) -> DashboardLayout {
        let canvas = canvas_for_positions(&self.positions, config);
        DashboardLayout {
            positions: self.positions,
            chain: self.chain,
            canvas,
        }
    }
}

/// A single-writer string slot, such as a browser's local storage.
pub trait KeyValueSlot {
    /// Unreadable values are reported as absent.
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), CacheError>;
}

impl<S: KeyValueSlot + ?Sized> KeyValueSlot for &mut S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), CacheError> {
        (**self).set(key, value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    values: HashMap<String, String>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut slot = Self::new();
        slot.values.insert(key.into(), value.into());
        slot
    }
}

impl KeyValueSlot for MemorySlot {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), CacheError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueSlot for FileSlot {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "layout cache file unreadable");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }
}

/// Layout cache over one slot key. Last write wins.
#[derive(Debug, Clone)]
pub struct LayoutCache<S> {
    slot: S,
    key: String,
}

impl<S: KeyValueSlot> LayoutCache<S> {
    pub fn new(slot: S) -> Self {
        Self::with_key(slot, LAYOUT_CACHE_KEY)
    }

    pub fn with_key(slot: S, key: impl Into<String>) -> Self {
        Self {
            slot,
            key: key.into(),
        }
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    /// The stored record for `signature` under `config`, or `None` on any
    /// kind of miss.
    pub fn load(&self, signature: &str, config: &LayoutConfig) -> Option<CacheRecord> {
        let Some(raw) = self.slot.get(&self.key) else {
            debug!(key = %self.key, "layout cache empty");
            return None;
        };
        CacheRecord::decode_for(&raw, signature, &config.geometry())
    }

    pub fn save(
        &mut self,
        signature: &str,
        config: &LayoutConfig,
        positions: &[PositionEntry],
        chain: &[ChainGroup],
    ) -> Result<(), CacheError> {
        let encoded = CacheRecord::encode(signature, config.geometry(), positions, chain)?;
        self.slot.set(&self.key, &encoded)
    }

    /// Save a computed layout, logging instead of failing.
    pub fn store(&mut self, signature: &str, config: &LayoutConfig, layout: &DashboardLayout) {
        if let Err(err) = self.save(signature, config, &layout.positions, &layout.chain) {
            warn!(key = %self.key, error = %err, "failed to save layout cache");
        }
    }
}
