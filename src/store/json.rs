//! JSON snapshot store.
//!
//! Persists the whole snapshot as one pretty-printed JSON document, the
//! shape the original browser build kept in local storage. Writes go
//! through a temp file and rename so a crash mid-save never leaves a
//! truncated snapshot behind.

use crate::store::{ClinicSnapshot, StateStore};
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Snapshot store persisting to a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store writing to `path`. The file is created on first
    /// save, not here.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// The file this store reads and writes.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn load(&mut self) -> Result<Option<ClinicSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read snapshot {}", self.path.display()))?;
        let snapshot = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse snapshot {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    fn save(&mut self, snapshot: &ClinicSnapshot) -> Result<()> {
        let text =
            serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)
            .with_context(|| format!("Failed to write snapshot {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace snapshot {}", self.path.display()))?;
        Ok(())
    }
}
