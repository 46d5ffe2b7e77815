//! SQLite-backed snapshot store.
//!
//! One table per collection plus a `meta` table for the session and the
//! initialized flag. Saving rewrites the whole snapshot inside a single
//! transaction; loading reads it back in insertion order. Enum fields are
//! stored as their snapshot spellings and matched back with a typed
//! `match`, rejecting unknown values.

use crate::models::{ClinicLog, Gender, Patient, Session, Token, TokenStatus, UserRole, Visit};
use crate::store::{ClinicSnapshot, StateStore};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

/// Snapshot store persisting to a SQLite database file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be executed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open clinic database")?;
        let schema = include_str!("schema.sql");
        conn.execute_batch(schema)
            .context("Failed to execute schema")?;
        Ok(Self { conn })
    }

    /// Opens a throwaway in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let schema = include_str!("schema.sql");
        conn.execute_batch(schema)
            .context("Failed to execute schema")?;
        Ok(Self { conn })
    }

    fn meta_value(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = ?", params![key], |row| {
                row.get(0)
            })
            .optional()
            .context("Failed to read meta table")?;
        Ok(value)
    }

    fn load_patients(&self) -> Result<Vec<Patient>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, age, gender, contact FROM patients ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok(Patient {
                id: parse_uuid(row.get::<_, String>(0)?, 0)?,
                name: row.get(1)?,
                age: row.get(2)?,
                gender: match &*row.get::<_, String>(3)? {
                    "Male" => Gender::Male,
                    "Female" => Gender::Female,
                    "Other" => Gender::Other,
                    _ => {
                        return Err(rusqlite::Error::InvalidColumnType(
                            3,
                            String::from("Invalid gender value"),
                            rusqlite::types::Type::Text,
                        ))
                    }
                },
                contact: row.get(4)?,
            })
        })?;
        let mut patients = Vec::new();
        for patient in rows {
            patients.push(patient?);
        }
        Ok(patients)
    }

    fn load_tokens(&self) -> Result<Vec<Token>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, token_number, patient_id, patient_name, status, issued_at, \
             consulting_doctor FROM tokens ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Token {
                id: parse_uuid(row.get::<_, String>(0)?, 0)?,
                token_number: row.get(1)?,
                patient_id: parse_uuid(row.get::<_, String>(2)?, 2)?,
                patient_name: row.get(3)?,
                status: match &*row.get::<_, String>(4)? {
                    "waiting" => TokenStatus::Waiting,
                    "in-progress" => TokenStatus::InProgress,
                    "completed" => TokenStatus::Completed,
                    _ => {
                        return Err(rusqlite::Error::InvalidColumnType(
                            4,
                            String::from("Invalid token status"),
                            rusqlite::types::Type::Text,
                        ))
                    }
                },
                issued_at: parse_timestamp(row.get::<_, String>(5)?, 5)?,
                consulting_doctor: row.get(6)?,
            })
        })?;
        let mut tokens = Vec::new();
        for token in rows {
            tokens.push(token?);
        }
        Ok(tokens)
    }

    fn load_visits(&self) -> Result<Vec<Visit>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, patient_id, token_number, date, symptoms, diagnosis, prescription, \
             consultation_fee, doctor_name FROM visits ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Visit {
                id: parse_uuid(row.get::<_, String>(0)?, 0)?,
                patient_id: parse_uuid(row.get::<_, String>(1)?, 1)?,
                token_number: row.get(2)?,
                date: parse_timestamp(row.get::<_, String>(3)?, 3)?,
                symptoms: row.get(4)?,
                diagnosis: row.get(5)?,
                prescription: row.get(6)?,
                consultation_fee: row.get(7)?,
                doctor_name: row.get(8)?,
            })
        })?;
        let mut visits = Vec::new();
        for visit in rows {
            visits.push(visit?);
        }
        Ok(visits)
    }

    fn load_logs(&self) -> Result<Vec<ClinicLog>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, timestamp, role, action, details FROM logs ORDER BY seq")?;
        let rows = stmt.query_map([], |row| {
            Ok(ClinicLog {
                id: parse_uuid(row.get::<_, String>(0)?, 0)?,
                timestamp: parse_timestamp(row.get::<_, String>(1)?, 1)?,
                role: match &*row.get::<_, String>(2)? {
                    "receptionist" => UserRole::Receptionist,
                    "doctor" => UserRole::Doctor,
                    _ => {
                        return Err(rusqlite::Error::InvalidColumnType(
                            2,
                            String::from("Invalid role value"),
                            rusqlite::types::Type::Text,
                        ))
                    }
                },
                action: row.get(3)?,
                details: row.get(4)?,
            })
        })?;
        let mut logs = Vec::new();
        for log in rows {
            logs.push(log?);
        }
        Ok(logs)
    }

    fn load_session(&self) -> Result<Session> {
        let role = match self.meta_value("session_role")?.as_deref() {
            Some("receptionist") => Some(UserRole::Receptionist),
            Some("doctor") => Some(UserRole::Doctor),
            _ => None,
        };
        Ok(Session {
            role,
            name: self.meta_value("session_name")?,
        })
    }
}

impl StateStore for SqliteStore {
    fn load(&mut self) -> Result<Option<ClinicSnapshot>> {
        if self.meta_value("initialized")?.is_none() {
            return Ok(None);
        }
        Ok(Some(ClinicSnapshot {
            patients: self.load_patients()?,
            tokens: self.load_tokens()?,
            visits: self.load_visits()?,
            logs: self.load_logs()?,
            session: self.load_session()?,
        }))
    }

    fn save(&mut self, snapshot: &ClinicSnapshot) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .context("Failed to begin snapshot transaction")?;

        tx.execute("DELETE FROM patients", [])?;
        tx.execute("DELETE FROM tokens", [])?;
        tx.execute("DELETE FROM visits", [])?;
        tx.execute("DELETE FROM logs", [])?;
        tx.execute("DELETE FROM meta", [])?;

        for patient in &snapshot.patients {
            tx.execute(
                "INSERT INTO patients (id, name, age, gender, contact) VALUES (?, ?, ?, ?, ?)",
                params![
                    patient.id.to_string(),
                    patient.name,
                    patient.age,
                    patient.gender.to_string(),
                    patient.contact,
                ],
            )?;
        }

        for token in &snapshot.tokens {
            tx.execute(
                "INSERT INTO tokens (id, token_number, patient_id, patient_name, status, \
                 issued_at, consulting_doctor) VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    token.id.to_string(),
                    token.token_number,
                    token.patient_id.to_string(),
                    token.patient_name,
                    token.status.to_string(),
                    token.issued_at.format(&Rfc3339)?,
                    token.consulting_doctor,
                ],
            )?;
        }

        for visit in &snapshot.visits {
            tx.execute(
                "INSERT INTO visits (id, patient_id, token_number, date, symptoms, diagnosis, \
                 prescription, consultation_fee, doctor_name) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    visit.id.to_string(),
                    visit.patient_id.to_string(),
                    visit.token_number,
                    visit.date.format(&Rfc3339)?,
                    visit.symptoms,
                    visit.diagnosis,
                    visit.prescription,
                    visit.consultation_fee,
                    visit.doctor_name,
                ],
            )?;
        }

        // Logs keep their in-memory (newest-first) order via seq.
        for (seq, log) in snapshot.logs.iter().enumerate() {
            tx.execute(
                "INSERT INTO logs (id, seq, timestamp, role, action, details) \
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    log.id.to_string(),
                    seq as i64,
                    log.timestamp.format(&Rfc3339)?,
                    log.role.to_string(),
                    log.action,
                    log.details,
                ],
            )?;
        }

        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('initialized', '1')",
            [],
        )?;
        if let Some(role) = snapshot.session.role {
            tx.execute(
                "INSERT INTO meta (key, value) VALUES ('session_role', ?)",
                params![role.to_string()],
            )?;
        }
        if let Some(name) = &snapshot.session.name {
            tx.execute(
                "INSERT INTO meta (key, value) VALUES ('session_name', ?)",
                params![name],
            )?;
        }

        tx.commit().context("Failed to commit snapshot")
    }
}

fn parse_uuid(text: String, column: usize) -> Result<Uuid, rusqlite::Error> {
    Uuid::parse_str(&text).map_err(|_| {
        rusqlite::Error::InvalidColumnType(
            column,
            format!("Invalid uuid: {text}"),
            rusqlite::types::Type::Text,
        )
    })
}

fn parse_timestamp(text: String, column: usize) -> Result<OffsetDateTime, rusqlite::Error> {
    OffsetDateTime::parse(&text, &Rfc3339).map_err(|_| {
        rusqlite::Error::InvalidColumnType(
            column,
            format!("Invalid timestamp: {text}"),
            rusqlite::types::Type::Text,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample_snapshot() -> ClinicSnapshot {
        let patient_id = Uuid::new_v4();
        ClinicSnapshot {
            patients: vec![Patient {
                id: patient_id,
                name: "John Doe".into(),
                age: 45,
                gender: Gender::Male,
                contact: "123-456-7890".into(),
            }],
            tokens: vec![Token {
                id: Uuid::new_v4(),
                token_number: 1,
                patient_id,
                patient_name: "John Doe".into(),
                status: TokenStatus::InProgress,
                issued_at: datetime!(2026-08-24 09:00 UTC),
                consulting_doctor: Some("Dr. Ben Carter".into()),
            }],
            visits: Vec::new(),
            logs: vec![ClinicLog {
                id: Uuid::new_v4(),
                timestamp: datetime!(2026-08-24 09:00 UTC),
                role: UserRole::Receptionist,
                action: "Token Issued".into(),
                details: "Token #1 issued to John Doe".into(),
            }],
            session: Session {
                role: Some(UserRole::Doctor),
                name: Some("Ben".into()),
            },
        }
    }

    #[test]
    fn fresh_database_loads_nothing() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn snapshot_round_trips_through_sqlite() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let snapshot = sample_snapshot();
        store.save(&snapshot).unwrap();

        let loaded = store.load().unwrap().expect("snapshot saved");
        assert_eq!(loaded.patients.len(), 1);
        assert_eq!(loaded.patients[0].id, snapshot.patients[0].id);
        assert_eq!(loaded.patients[0].gender, Gender::Male);
        assert_eq!(loaded.tokens[0].status, TokenStatus::InProgress);
        assert_eq!(loaded.tokens[0].issued_at, snapshot.tokens[0].issued_at);
        assert_eq!(
            loaded.tokens[0].consulting_doctor.as_deref(),
            Some("Dr. Ben Carter")
        );
        assert_eq!(loaded.logs[0].action, "Token Issued");
        assert_eq!(loaded.session.role, Some(UserRole::Doctor));
        assert_eq!(loaded.session.name.as_deref(), Some("Ben"));
    }

    #[test]
    fn save_replaces_the_previous_snapshot() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.save(&sample_snapshot()).unwrap();

        store.save(&ClinicSnapshot::default()).unwrap();

        let loaded = store.load().unwrap().expect("still initialized");
        assert!(loaded.patients.is_empty());
        assert!(loaded.tokens.is_empty());
        assert!(loaded.logs.is_empty());
        assert_eq!(loaded.session.role, None);
    }
}
