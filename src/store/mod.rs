//! Persistence port for the clinic core.
//!
//! The state machine never talks to a storage medium directly: it is
//! constructed with a boxed [`StateStore`] and replays the contract
//! "load once at startup, save the full snapshot after every successful
//! mutation". Backends decide what durable means — an in-memory store for
//! tests, a SQLite file, or a JSON snapshot file.

mod json;
mod sqlite;

pub use json::JsonFileStore;
pub use sqlite::SqliteStore;

use crate::models::{ClinicLog, Patient, Session, Token, Visit};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// The persisted shape: exactly the four collections plus the session.
///
/// Logs are kept newest-first, the same order the core holds them in
/// memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicSnapshot {
    pub patients: Vec<Patient>,
    pub tokens: Vec<Token>,
    pub visits: Vec<Visit>,
    pub logs: Vec<ClinicLog>,
    #[serde(default)]
    pub session: Session,
}

/// Load-at-startup / save-on-mutation contract.
///
/// `load` returning `Ok(None)` means no snapshot has ever been written;
/// the core seeds its starter dataset in that case. There is no schema
/// migration or versioning.
pub trait StateStore {
    /// Reads the last persisted snapshot, if any.
    fn load(&mut self) -> Result<Option<ClinicSnapshot>>;

    /// Replaces the persisted snapshot with `snapshot`.
    fn save(&mut self, snapshot: &ClinicSnapshot) -> Result<()>;
}

/// In-process store with no durability, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Option<ClinicSnapshot>,
}

impl MemoryStore {
    /// A store that has never been written to; loading from it seeds the
    /// starter dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with `snapshot`, e.g. `ClinicSnapshot::default()`
    /// for a completely empty clinic.
    pub fn with_snapshot(snapshot: ClinicSnapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
        }
    }

    /// The last snapshot saved, if any.
    pub fn last_saved(&self) -> Option<&ClinicSnapshot> {
        self.snapshot.as_ref()
    }
}

impl StateStore for MemoryStore {
    fn load(&mut self) -> Result<Option<ClinicSnapshot>> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, snapshot: &ClinicSnapshot) -> Result<()> {
        self.snapshot = Some(snapshot.clone());
        Ok(())
    }
}
