//! Per-song sync offset persistence.
//!
//! The sync engine only holds the offset of the song currently loaded. Hosts
//! that want to remember offsets across sessions keep them in an
//! [`OffsetStore`] keyed by a song identifier of their choosing.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Storage for per-song offsets in seconds
pub trait OffsetStore {
    /// Stored offset for `song_id`, if any
    fn get(&self, song_id: &str) -> Option<f64>;

    /// Store an offset for `song_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset is not finite or cannot be persisted.
    fn set(&mut self, song_id: &str, offset: f64) -> Result<()>;

    /// Forget the offset for `song_id`, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the change cannot be persisted.
    fn remove(&mut self, song_id: &str) -> Result<Option<f64>>;
}

/// In-memory offsets, lost when dropped
#[derive(Debug, Clone, Default)]
pub struct MemoryOffsetStore {
    offsets: HashMap<String, f64>,
}

impl MemoryOffsetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OffsetStore for MemoryOffsetStore {
    fn get(&self, song_id: &str) -> Option<f64> {
        self.offsets.get(song_id).copied()
    }

    fn set(&mut self, song_id: &str, offset: f64) -> Result<()> {
        validate_offset(song_id, offset)?;
        self.offsets.insert(song_id.to_string(), offset);
        Ok(())
    }

    fn remove(&mut self, song_id: &str) -> Result<Option<f64>> {
        Ok(self.offsets.remove(song_id))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OffsetFile {
    #[serde(default)]
    offsets: BTreeMap<String, f64>,
}

/// Offsets persisted as a JSON file, rewritten on every change
#[derive(Debug)]
pub struct JsonOffsetStore {
    path: PathBuf,
    file: OffsetFile,
}

impl JsonOffsetStore {
    /// Open the store at `path`. A missing file starts an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let file = if path.exists() {
            let content = fs::read_to_string(&path)?;
            let file: OffsetFile = serde_json::from_str(&content)?;
            debug!("Loaded {} offset(s) from {:?}", file.offsets.len(), path);
            file
        } else {
            OffsetFile::default()
        };

        Ok(Self { path, file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.file)?;
        fs::write(&self.path, content)?;
        info!("Saved offsets to {:?}", self.path);
        Ok(())
    }
}

impl OffsetStore for JsonOffsetStore {
    fn get(&self, song_id: &str) -> Option<f64> {
        self.file.offsets.get(song_id).copied()
    }

    fn set(&mut self, song_id: &str, offset: f64) -> Result<()> {
        validate_offset(song_id, offset)?;
        self.file.offsets.insert(song_id.to_string(), offset);
        self.save()
    }

    fn remove(&mut self, song_id: &str) -> Result<Option<f64>> {
        let previous = self.file.offsets.remove(song_id);
        if previous.is_some() {
            self.save()?;
        }
        Ok(previous)
    }
}

fn validate_offset(song_id: &str, offset: f64) -> Result<()> {
    if offset.is_finite() {
        Ok(())
    } else {
        Err(CoreError::InvalidOffset {
            song_id: song_id.to_string(),
            offset,
        })
    }
}
