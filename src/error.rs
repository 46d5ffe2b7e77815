//! Failure types for clinic operations.
//!
//! Every mutating operation reports its outcome synchronously through
//! `ClinicError`; nothing is retried internally and there is no fatal path.

use thiserror::Error;

/// Typed failures surfaced by `ClinicState` operations.
#[derive(Debug, Error)]
pub enum ClinicError {
    /// Malformed input to registration or visit completion.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced patient or token does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A visit record already exists for this token number.
    #[error("a visit record already exists for token #{0}")]
    DuplicateVisit(u32),

    /// The injected store failed to load or save the snapshot.
    #[error("storage failure")]
    Storage(#[from] anyhow::Error),
}

/// Convenience alias used throughout the crate.
pub type ClinicResult<T> = Result<T, ClinicError>;
