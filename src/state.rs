//! The clinic state machine.
//!
//! [`ClinicState`] owns the four collections (patients, tokens, visits,
//! logs) and the current session, and exposes every mutating operation the
//! front desk and consultation room need. Each operation validates, applies
//! its coordinated updates in one synchronous step, appends the derived
//! audit entry, and re-persists the full snapshot through the injected
//! store before returning.

use crate::error::{ClinicError, ClinicResult};
use crate::models::{
    ClinicLog, Gender, Patient, Session, Token, TokenStatus, UserRole, Visit, VisitRecord,
};
use crate::store::{ClinicSnapshot, StateStore};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};
use uuid::Uuid;

/// Behaviour switches for the state machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateOptions {
    /// When set, starting a consultation on a token that is not waiting
    /// fails with a validation error instead of silently re-stamping it.
    /// Off by default, matching the original front desk where the UI gates
    /// the button.
    pub restart_guard: bool,
}

/// Outcome of a token issuance request.
///
/// Issuing for a patient who already holds an active ticket is not an
/// error: the existing token comes back untouched so the desk can point
/// the patient at it. Callers that want to warn the user must distinguish
/// the two arms.
#[derive(Debug, Clone)]
pub enum TokenIssue {
    /// A fresh token was created and logged.
    Issued(Token),
    /// The patient already held an active token; nothing was created or
    /// logged.
    AlreadyActive(Token),
}

impl TokenIssue {
    /// The token behind either outcome.
    pub fn token(&self) -> &Token {
        match self {
            TokenIssue::Issued(token) | TokenIssue::AlreadyActive(token) => token,
        }
    }

    /// Whether a new ticket was actually created.
    pub fn is_new(&self) -> bool {
        matches!(self, TokenIssue::Issued(_))
    }
}

/// Details captured on the visit form when a consultation completes.
#[derive(Debug, Clone)]
pub struct VisitDetails {
    pub symptoms: String,
    pub diagnosis: String,
    pub prescription: String,
    pub consultation_fee: f64,
}

/// Owner of all clinic state and the operations over it.
///
/// Constructed once per process with an injected [`StateStore`]; loads the
/// persisted snapshot at construction (seeding the starter dataset if the
/// store is empty) and saves after every successful mutation.
pub struct ClinicState {
    patients: Vec<Patient>,
    tokens: Vec<Token>,
    visits: Vec<Visit>,
    /// Newest-first; entries are prepended.
    logs: Vec<ClinicLog>,
    session: Session,
    options: StateOptions,
    store: Box<dyn StateStore>,
}

impl ClinicState {
    /// Opens the clinic with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to load, or fails to save the
    /// seeded starter dataset on first run.
    pub fn open(store: impl StateStore + 'static) -> ClinicResult<Self> {
        Self::open_with_options(store, StateOptions::default())
    }

    /// Opens the clinic with explicit [`StateOptions`].
    pub fn open_with_options(
        store: impl StateStore + 'static,
        options: StateOptions,
    ) -> ClinicResult<Self> {
        let mut store = Box::new(store);
        let (snapshot, seeded) = match store.load()? {
            Some(snapshot) => (snapshot, false),
            None => (seed_snapshot(), true),
        };
        let mut state = Self {
            patients: snapshot.patients,
            tokens: snapshot.tokens,
            visits: snapshot.visits,
            logs: snapshot.logs,
            session: snapshot.session,
            options,
            store,
        };
        if seeded {
            info!("no persisted snapshot; seeding starter dataset");
            state.persist()?;
        }
        Ok(state)
    }

    /// Signs a user in, deriving the display name from the identifier.
    ///
    /// The name is the portion before any `@` domain, first letter
    /// upper-cased: `asha@clinic.example` becomes `Asha`. Appends a
    /// "User Login" log entry attributed to `role`.
    pub fn login(&mut self, role: UserRole, identifier: &str) -> ClinicResult<()> {
        let name = display_name(identifier);
        self.session = Session {
            role: Some(role),
            name: Some(name.clone()),
        };
        info!(%role, name, "user logged in");
        self.record(role, "User Login", format!("{name} ({role}) logged in."));
        self.persist()
    }

    /// Signs the current user out.
    ///
    /// Logs "User Logout" with the pre-clear session values, then clears
    /// the session. With no active session this is a no-op: no log entry,
    /// no save.
    pub fn logout(&mut self) -> ClinicResult<()> {
        let Some(role) = self.session.role else {
            return Ok(());
        };
        let name = self.session.name.clone().unwrap_or_default();
        self.record(role, "User Logout", format!("{name} ({role}) logged out."));
        self.session = Session::default();
        self.persist()
    }

    /// Registers a new patient.
    ///
    /// Input is re-validated defensively even when the form already
    /// checked it: non-empty name, positive age, phone-shaped contact.
    ///
    /// # Errors
    ///
    /// `ClinicError::Validation` when a precondition fails.
    pub fn register_patient(
        &mut self,
        name: &str,
        age: u8,
        gender: Gender,
        contact: &str,
    ) -> ClinicResult<Patient> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClinicError::Validation("patient name is required".into()));
        }
        if age == 0 {
            return Err(ClinicError::Validation(
                "patient age must be a positive number".into(),
            ));
        }
        validate_contact(contact)?;

        let patient = Patient {
            id: Uuid::new_v4(),
            name: name.to_string(),
            age,
            gender,
            contact: contact.trim().to_string(),
        };
        self.patients.push(patient.clone());
        info!(patient = %patient.name, "patient registered");
        self.record(
            UserRole::Receptionist,
            "Patient Registered",
            format!("Registered new patient: {}", patient.name),
        );
        self.persist()?;
        Ok(patient)
    }

    /// Issues a queue token for a patient.
    ///
    /// A patient with an active (waiting or in-progress) token cannot hold
    /// a second one: the existing token is returned unchanged, with no new
    /// ticket, no log entry and no save. Otherwise the next token number is
    /// one past the highest ever issued — numbers are never reused, even
    /// after every token completes.
    ///
    /// # Errors
    ///
    /// `ClinicError::NotFound` for an unknown patient id.
    pub fn issue_token(&mut self, patient_id: Uuid) -> ClinicResult<TokenIssue> {
        let patient = self
            .patients
            .iter()
            .find(|p| p.id == patient_id)
            .ok_or_else(|| ClinicError::NotFound(format!("patient {patient_id}")))?
            .clone();

        if let Some(existing) = self
            .tokens
            .iter()
            .find(|t| t.patient_id == patient_id && t.is_active())
        {
            debug!(
                token = existing.token_number,
                patient = %patient.name,
                "patient already holds an active token"
            );
            return Ok(TokenIssue::AlreadyActive(existing.clone()));
        }

        let token_number = self.next_token_number();
        let token = Token {
            id: Uuid::new_v4(),
            token_number,
            patient_id,
            patient_name: patient.name.clone(),
            status: TokenStatus::Waiting,
            issued_at: OffsetDateTime::now_utc(),
            consulting_doctor: None,
        };
        self.tokens.push(token.clone());
        info!(token = token_number, patient = %patient.name, "token issued");
        self.record(
            UserRole::Receptionist,
            "Token Issued",
            format!("Token #{token_number} issued to {}", patient.name),
        );
        self.persist()?;
        Ok(TokenIssue::Issued(token))
    }

    /// Moves a token to in-progress and stamps the consulting doctor.
    ///
    /// The doctor name is stored and logged with the "Dr." prefix. With
    /// [`StateOptions::restart_guard`] set, a token that is not waiting is
    /// rejected; otherwise re-starting is allowed and simply re-stamps the
    /// doctor, as the original desk behaved.
    ///
    /// # Errors
    ///
    /// `ClinicError::NotFound` for an unknown token id;
    /// `ClinicError::Validation` when the restart guard rejects the token.
    pub fn start_consultation(&mut self, token_id: Uuid, doctor_name: &str) -> ClinicResult<Token> {
        let restart_guard = self.options.restart_guard;
        let token = self
            .tokens
            .iter_mut()
            .find(|t| t.id == token_id)
            .ok_or_else(|| ClinicError::NotFound(format!("token {token_id}")))?;

        if restart_guard && token.status != TokenStatus::Waiting {
            return Err(ClinicError::Validation(format!(
                "token #{} is already {}",
                token.token_number, token.status
            )));
        }

        token.status = TokenStatus::InProgress;
        token.consulting_doctor = Some(format!("Dr. {doctor_name}"));
        let token = token.clone();

        info!(token = token.token_number, doctor = doctor_name, "consultation started");
        self.record(
            UserRole::Doctor,
            "Consultation Started",
            format!(
                "Dr. {doctor_name} started consultation for token #{} ({})",
                token.token_number, token.patient_name
            ),
        );
        self.persist()?;
        Ok(token)
    }

    /// Saves the visit record for a token and completes it.
    ///
    /// Exactly one visit may exist per token number; the read path shows
    /// an existing record in view mode, but this operation guards
    /// independently. The patient name in the log is resolved by id at
    /// completion time, not from the token snapshot. The doctor name
    /// snapshot comes from the signed-in user, falling back to the token's
    /// consulting doctor.
    ///
    /// # Errors
    ///
    /// `ClinicError::Validation` for empty symptoms/diagnosis/prescription,
    /// a negative fee, or no resolvable doctor name;
    /// `ClinicError::DuplicateVisit` when the token already has a visit;
    /// `ClinicError::NotFound` for an unknown token number or patient id.
    pub fn complete_visit(
        &mut self,
        token_number: u32,
        patient_id: Uuid,
        details: VisitDetails,
    ) -> ClinicResult<Visit> {
        if details.symptoms.trim().is_empty() {
            return Err(ClinicError::Validation("symptoms are required".into()));
        }
        if details.diagnosis.trim().is_empty() {
            return Err(ClinicError::Validation("diagnosis is required".into()));
        }
        if details.prescription.trim().is_empty() {
            return Err(ClinicError::Validation("prescription is required".into()));
        }
        if !details.consultation_fee.is_finite() || details.consultation_fee < 0.0 {
            return Err(ClinicError::Validation(
                "consultation fee must be zero or positive".into(),
            ));
        }

        if self.visits.iter().any(|v| v.token_number == token_number) {
            return Err(ClinicError::DuplicateVisit(token_number));
        }

        // Token numbers are unique by construction; assert instead of
        // trusting the convention.
        let matching: Vec<usize> = self
            .tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.token_number == token_number)
            .map(|(i, _)| i)
            .collect();
        if matching.is_empty() {
            return Err(ClinicError::NotFound(format!("token #{token_number}")));
        }
        debug_assert!(matching.len() == 1, "duplicate token number {token_number}");

        let patient_name = self
            .patients
            .iter()
            .find(|p| p.id == patient_id)
            .map(|p| p.name.clone())
            .ok_or_else(|| ClinicError::NotFound(format!("patient {patient_id}")))?;

        let doctor_name = match &self.session.name {
            Some(name) => format!("Dr. {name}"),
            None => self.tokens[matching[0]]
                .consulting_doctor
                .clone()
                .ok_or_else(|| {
                    ClinicError::Validation("no acting doctor for the visit record".into())
                })?,
        };

        let visit = Visit {
            id: Uuid::new_v4(),
            patient_id,
            token_number,
            date: OffsetDateTime::now_utc(),
            symptoms: details.symptoms,
            diagnosis: details.diagnosis,
            prescription: details.prescription,
            consultation_fee: details.consultation_fee,
            doctor_name: doctor_name.clone(),
        };
        self.visits.push(visit.clone());
        for index in matching {
            self.tokens[index].status = TokenStatus::Completed;
        }

        info!(
            token = token_number,
            patient = %patient_name,
            fee = visit.consultation_fee,
            "consultation completed"
        );
        self.record(
            UserRole::Doctor,
            "Consultation Completed",
            format!(
                "Consultation for {patient_name} by {doctor_name} completed. Bill amount: ${}",
                visit.consultation_fee
            ),
        );
        self.persist()?;
        Ok(visit)
    }

    // ---- read-only queries ------------------------------------------------

    /// All registered patients.
    pub fn patients(&self) -> Vec<Patient> {
        self.patients.clone()
    }

    /// Waiting tokens, ascending by token number.
    pub fn waiting_tokens(&self) -> Vec<Token> {
        let mut waiting: Vec<Token> = self
            .tokens
            .iter()
            .filter(|t| t.status == TokenStatus::Waiting)
            .cloned()
            .collect();
        waiting.sort_by_key(|t| t.token_number);
        waiting
    }

    /// Tokens currently in consultation, in insertion order.
    pub fn in_progress_tokens(&self) -> Vec<Token> {
        self.tokens
            .iter()
            .filter(|t| t.status == TokenStatus::InProgress)
            .cloned()
            .collect()
    }

    /// Completed tokens, descending by token number, optionally capped to
    /// the most recent `limit`.
    pub fn completed_tokens(&self, limit: Option<usize>) -> Vec<Token> {
        let mut completed: Vec<Token> = self
            .tokens
            .iter()
            .filter(|t| t.status == TokenStatus::Completed)
            .cloned()
            .collect();
        completed.sort_by(|a, b| b.token_number.cmp(&a.token_number));
        if let Some(limit) = limit {
            completed.truncate(limit);
        }
        completed
    }

    /// The visit recorded for a token number, if one exists. This is the
    /// read-only "view mode" path the visit form consults before offering
    /// a save.
    pub fn visit_for_token(&self, token_number: u32) -> Option<Visit> {
        self.visits
            .iter()
            .find(|v| v.token_number == token_number)
            .cloned()
    }

    /// Visits joined with their patient and token, newest first. Visits
    /// whose patient cannot be resolved are skipped, as the billing view
    /// does.
    pub fn visits_with_context(&self) -> Vec<VisitRecord> {
        let mut records: Vec<VisitRecord> = self
            .visits
            .iter()
            .filter_map(|visit| {
                let patient = self.patients.iter().find(|p| p.id == visit.patient_id)?;
                let token = self
                    .tokens
                    .iter()
                    .find(|t| t.token_number == visit.token_number);
                Some(VisitRecord {
                    visit: visit.clone(),
                    patient: patient.clone(),
                    token: token.cloned(),
                })
            })
            .collect();
        records.sort_by(|a, b| b.visit.date.cmp(&a.visit.date));
        records
    }

    /// Audit log entries, newest first.
    pub fn logs(&self) -> Vec<ClinicLog> {
        self.logs.clone()
    }

    /// Role of the signed-in user, if any.
    pub fn user_role(&self) -> Option<UserRole> {
        self.session.role
    }

    /// Display name of the signed-in user, if any.
    pub fn user_name(&self) -> Option<&str> {
        self.session.name.as_deref()
    }

    /// A full copy of the current state, in the persisted shape.
    pub fn snapshot(&self) -> ClinicSnapshot {
        ClinicSnapshot {
            patients: self.patients.clone(),
            tokens: self.tokens.clone(),
            visits: self.visits.clone(),
            logs: self.logs.clone(),
            session: self.session.clone(),
        }
    }

    // ---- internals --------------------------------------------------------

    fn next_token_number(&self) -> u32 {
        self.tokens
            .iter()
            .map(|t| t.token_number)
            .max()
            .map_or(1, |max| max + 1)
    }

    fn record(&mut self, role: UserRole, action: &str, details: String) {
        let entry = ClinicLog {
            id: Uuid::new_v4(),
            timestamp: OffsetDateTime::now_utc(),
            role,
            action: action.to_string(),
            details,
        };
        self.logs.insert(0, entry);
    }

    fn persist(&mut self) -> ClinicResult<()> {
        let snapshot = self.snapshot();
        self.store.save(&snapshot)?;
        Ok(())
    }
}

/// Derives the display name from a login identifier: the portion before
/// any `@`, first letter upper-cased.
fn display_name(identifier: &str) -> String {
    let name = identifier.trim().split('@').next().unwrap_or("");
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Accepts phone-shaped contacts: digits plus separators, at least seven
/// digits overall.
fn validate_contact(contact: &str) -> ClinicResult<()> {
    let contact = contact.trim();
    if contact.is_empty() {
        return Err(ClinicError::Validation("contact number is required".into()));
    }
    let shape_ok = contact
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | '.' | ' '));
    let digits = contact.chars().filter(char::is_ascii_digit).count();
    if !shape_ok || digits < 7 {
        return Err(ClinicError::Validation(format!(
            "contact {contact:?} is not a phone number"
        )));
    }
    Ok(())
}

/// The starter dataset loaded when the store has never been written: three
/// patients, one token in each queue state, the matching historical visit,
/// and the boot log entry.
fn seed_snapshot() -> ClinicSnapshot {
    let now = OffsetDateTime::now_utc();
    let john = Patient {
        id: Uuid::new_v4(),
        name: "John Doe".into(),
        age: 45,
        gender: Gender::Male,
        contact: "123-456-7890".into(),
    };
    let jane = Patient {
        id: Uuid::new_v4(),
        name: "Jane Smith".into(),
        age: 32,
        gender: Gender::Female,
        contact: "234-567-8901".into(),
    };
    let peter = Patient {
        id: Uuid::new_v4(),
        name: "Peter Jones".into(),
        age: 67,
        gender: Gender::Male,
        contact: "345-678-9012".into(),
    };

    let tokens = vec![
        Token {
            id: Uuid::new_v4(),
            token_number: 1,
            patient_id: john.id,
            patient_name: john.name.clone(),
            status: TokenStatus::Completed,
            issued_at: now - Duration::minutes(20),
            consulting_doctor: Some("Dr. Anya Sharma".into()),
        },
        Token {
            id: Uuid::new_v4(),
            token_number: 2,
            patient_id: jane.id,
            patient_name: jane.name.clone(),
            status: TokenStatus::InProgress,
            issued_at: now - Duration::minutes(10),
            consulting_doctor: Some("Dr. Ben Carter".into()),
        },
        Token {
            id: Uuid::new_v4(),
            token_number: 3,
            patient_id: peter.id,
            patient_name: peter.name.clone(),
            status: TokenStatus::Waiting,
            issued_at: now - Duration::minutes(5),
            consulting_doctor: None,
        },
    ];

    let visits = vec![Visit {
        id: Uuid::new_v4(),
        patient_id: john.id,
        token_number: 1,
        date: now - Duration::minutes(20),
        symptoms: "Fever, cough".into(),
        diagnosis: "Viral Infection".into(),
        prescription: "Rest and fluids".into(),
        consultation_fee: 500.0,
        doctor_name: "Dr. Anya Sharma".into(),
    }];

    let logs = vec![ClinicLog {
        id: Uuid::new_v4(),
        timestamp: now - Duration::minutes(30),
        role: UserRole::Receptionist,
        action: "System Start".into(),
        details: "Application initialized.".into(),
    }];

    ClinicSnapshot {
        patients: vec![john, jane, peter],
        tokens,
        visits,
        logs,
        session: Session::default(),
    }
}
