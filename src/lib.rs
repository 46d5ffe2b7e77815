//! Core state machine for a single-clinic front desk.
//!
//! This crate owns the workflow that turns a walk-in patient into a billed
//! consultation: patient registration, a sequential token queue
//! (waiting → in-progress → completed), one visit record per token, and the
//! derived audit log and invoice figures. The presentation layer is a
//! separate collaborator; it calls the operations on [`ClinicState`] and
//! renders the snapshots it gets back. Persistence is injected through the
//! [`store::StateStore`] port — in-memory, SQLite, or a JSON snapshot file.

pub mod billing;
pub mod error;
pub mod models;
pub mod state;
pub mod store;

pub use error::{ClinicError, ClinicResult};
pub use models::{
    ClinicLog, Gender, Patient, Session, Token, TokenStatus, UserRole, Visit, VisitRecord,
};
pub use state::{ClinicState, StateOptions, TokenIssue, VisitDetails};
pub use store::{ClinicSnapshot, JsonFileStore, MemoryStore, SqliteStore, StateStore};
