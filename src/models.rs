//! Data models for ClinicFlow.
//!
//! Everything the clinic core persists lives here: patients, queue tokens,
//! visit records, the audit log, and the current session. Serde spellings
//! match the snapshot format exactly (`in-progress`, `receptionist`, ...),
//! so these types double as the persisted schema.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

/// A registered patient. Immutable once created; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    /// The patient's unique ID.
    pub id: Uuid,
    /// The patient's full name.
    pub name: String,
    /// The patient's age in years.
    pub age: u8,
    /// The patient's gender.
    pub gender: Gender,
    /// Contact phone number.
    pub contact: String,
}

/// Patient gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
            Gender::Other => write!(f, "Other"),
        }
    }
}

/// Lifecycle state of a queue token.
///
/// `Completed` is terminal: a token gets there only as a side effect of its
/// visit record being saved, and never leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
    #[serde(rename = "waiting")]
    Waiting,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenStatus::Waiting => write!(f, "waiting"),
            TokenStatus::InProgress => write!(f, "in-progress"),
            TokenStatus::Completed => write!(f, "completed"),
        }
    }
}

/// One queue ticket linking a patient to a position in the consultation
/// sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// The token's unique ID.
    pub id: Uuid,
    /// Sequential ticket number, unique among all tokens ever issued.
    pub token_number: u32,
    /// The patient this ticket was issued to.
    pub patient_id: Uuid,
    /// Snapshot of the patient's name at issue time, not a live join.
    pub patient_name: String,
    /// Current lifecycle state.
    pub status: TokenStatus,
    /// When the ticket was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
    /// Set when a doctor starts the consultation ("Dr. <name>").
    pub consulting_doctor: Option<String>,
}

impl Token {
    /// Whether this token still occupies the queue (waiting or in-progress).
    pub fn is_active(&self) -> bool {
        self.status != TokenStatus::Completed
    }
}

/// The clinical record produced when a consultation is completed.
///
/// At most one visit exists per token number; visits are immutable once
/// saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visit {
    /// The visit's unique ID.
    pub id: Uuid,
    /// The patient who was seen.
    pub patient_id: Uuid,
    /// The token this visit closes.
    pub token_number: u32,
    /// When the record was saved.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// Presenting symptoms.
    pub symptoms: String,
    /// Doctor's diagnosis.
    pub diagnosis: String,
    /// Prescription text.
    pub prescription: String,
    /// Fee charged for the consultation, before tax.
    pub consultation_fee: f64,
    /// Snapshot of the acting doctor's display name ("Dr. <name>").
    pub doctor_name: String,
}

/// The acting user's capability class, used for log attribution only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Receptionist,
    Doctor,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Receptionist => write!(f, "receptionist"),
            UserRole::Doctor => write!(f, "doctor"),
        }
    }
}

/// Append-only audit entry. Never mutated or deleted; read newest-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicLog {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Role of the actor that triggered the entry.
    pub role: UserRole,
    /// Short label, e.g. "Token Issued".
    pub action: String,
    /// Free-text description.
    pub details: String,
}

/// The current front-desk session: who is operating the terminal.
///
/// Populated by login, cleared by logout. Persisted alongside the
/// collections so a reload restores the signed-in user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub role: Option<UserRole>,
    pub name: Option<String>,
}

impl Session {
    /// Whether anyone is currently signed in.
    pub fn is_active(&self) -> bool {
        self.role.is_some()
    }
}

/// A visit joined with its patient and token context, as the billing and
/// records views consume it.
#[derive(Debug, Clone)]
pub struct VisitRecord {
    pub visit: Visit,
    pub patient: Patient,
    pub token: Option<Token>,
}
