//! Storage trait definitions for the RSVP engine
//!
//! The engine never talks to a database directly. Everything it needs from
//! persistence goes through [`RegistrationStore`]:
//! - registration lookups by email, event, token and id
//! - the conditional check-in write (update-where-not-yet-checked-in)
//! - inserts guarded by unique constraints
//! - read-only event lookups
//!
//! The trait is async and backend-agnostic. An in-memory implementation lives
//! in the `fakes` module; the SurrealDB one in `surreal_store`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique identifier for a registration row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(pub String);

impl RegistrationId {
    /// Generate a new random RegistrationId
    pub fn new() -> Self {
        RegistrationId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RegistrationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RegistrationId {
    fn from(s: &str) -> Self {
        RegistrationId(s.to_string())
    }
}

/// Opaque check-in token embedded in a guest's QR code.
///
/// Minted once when the registration is created and never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QrToken(String);

impl QrToken {
    pub fn new(value: impl Into<String>) -> Self {
        QrToken(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QrToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Attendance intent
// ---------------------------------------------------------------------------

/// What the guest said when they RSVP'd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attendance {
    Yes,
    No,
    Maybe,
}

impl Attendance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attendance::Yes => "yes",
            Attendance::No => "no",
            Attendance::Maybe => "maybe",
        }
    }
}

impl fmt::Display for Attendance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of `yes`, `no`, `maybe`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown attendance value: {0:?} (expected yes, no or maybe)")]
pub struct ParseAttendanceError(pub String);

impl FromStr for Attendance {
    type Err = ParseAttendanceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(Attendance::Yes),
            "no" => Ok(Attendance::No),
            "maybe" => Ok(Attendance::Maybe),
            _ => Err(ParseAttendanceError(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A guest's RSVP for one event, plus its door check-in state.
///
/// `checked_in_at` is `Some` exactly when `checked_in` is true. Only the
/// store's conditional check-in write may flip the flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: RegistrationId,
    pub event_id: String,
    pub name: String,
    pub email: String,
    pub attendance: Attendance,
    pub meal_preference: Option<String>,
    pub dietary_restrictions: Option<String>,
    pub team_name: Option<String>,
    pub qr_token: QrToken,
    pub checked_in: bool,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Registration {
    /// Create a fresh, not-yet-checked-in registration with a new id.
    pub fn new(
        event_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        attendance: Attendance,
        qr_token: QrToken,
    ) -> Self {
        Self {
            id: RegistrationId::new(),
            event_id: event_id.into(),
            name: name.into(),
            email: email.into(),
            attendance,
            meal_preference: None,
            dietary_restrictions: None,
            team_name: None,
            qr_token,
            checked_in: false,
            checked_in_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_team(mut self, team_name: impl Into<String>) -> Self {
        self.team_name = Some(team_name.into());
        self
    }
}

/// An event as seen by the engine (read-mostly).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub date: DateTime<Utc>,
    pub capacity: u32,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    pub fn new(
        slug: impl Into<String>,
        name: impl Into<String>,
        date: DateTime<Utc>,
        capacity: u32,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            slug: slug.into(),
            name: name.into(),
            date,
            capacity,
            location: None,
            created_at: Utc::now(),
        }
    }
}

/// Result of the conditional check-in write.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckInOutcome {
    /// This call flipped `checked_in` from false to true.
    Transitioned(Registration),
    /// The row was already checked in; it is returned untouched.
    AlreadyCheckedIn(Registration),
}

impl CheckInOutcome {
    pub fn registration(&self) -> &Registration {
        match self {
            CheckInOutcome::Transitioned(r) | CheckInOutcome::AlreadyCheckedIn(r) => r,
        }
    }

    pub fn into_registration(self) -> Registration {
        match self {
            CheckInOutcome::Transitioned(r) | CheckInOutcome::AlreadyCheckedIn(r) => r,
        }
    }

    pub fn is_transition(&self) -> bool {
        matches!(self, CheckInOutcome::Transitioned(_))
    }
}

// ---------------------------------------------------------------------------
// RegistrationStore
// ---------------------------------------------------------------------------

/// Persistence contract for registrations and events.
///
/// Guarantees:
/// - `insert` rejects a second row for the same (event, email) pair, a
///   duplicate QR token, or a duplicate id with `StorageError::UniqueViolation`.
/// - `conditional_check_in` is atomic per row: of any number of concurrent
///   callers on one id, exactly one observes `Transitioned`.
/// - A checked-in row never reverts and its `checked_in_at` never changes.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Insert a new registration.
    async fn insert(&self, registration: Registration) -> StorageResult<Registration>;

    /// Look up a registration by id.
    async fn get_registration(&self, id: &RegistrationId)
        -> StorageResult<Option<Registration>>;

    /// Look up a registration by QR token.
    async fn find_by_token(&self, token: &QrToken) -> StorageResult<Option<Registration>>;

    /// All registrations for an event, oldest first.
    async fn find_by_event(&self, event_id: &str) -> StorageResult<Vec<Registration>>;

    /// All registrations for a guest email, optionally skipping one event.
    async fn find_by_email(
        &self,
        email: &str,
        exclude_event_id: Option<&str>,
    ) -> StorageResult<Vec<Registration>>;

    /// Histories for many emails at once, keyed by email.
    ///
    /// Every requested email is present in the map (possibly with an empty
    /// history). Backends should override this with a single round trip.
    async fn find_histories(
        &self,
        emails: &[String],
        exclude_event_id: Option<&str>,
    ) -> StorageResult<HashMap<String, Vec<Registration>>> {
        let mut histories = HashMap::with_capacity(emails.len());
        for email in emails {
            if histories.contains_key(email) {
                continue;
            }
            let history = self.find_by_email(email, exclude_event_id).await?;
            histories.insert(email.clone(), history);
        }
        Ok(histories)
    }

    /// Set `checked_in = true, checked_in_at = at` only if the row is not yet
    /// checked in. Returns `StorageError::RegistrationNotFound` for unknown ids.
    async fn conditional_check_in(
        &self,
        id: &RegistrationId,
        at: DateTime<Utc>,
    ) -> StorageResult<CheckInOutcome>;

    /// Insert a new event.
    async fn insert_event(&self, event: EventRecord) -> StorageResult<EventRecord>;

    /// Look up an event by id.
    async fn get_event(&self, id: &str) -> StorageResult<Option<EventRecord>>;

    /// All events ordered by date ascending.
    async fn list_events(&self) -> StorageResult<Vec<EventRecord>>;
}
