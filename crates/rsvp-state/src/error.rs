//! Error types for rsvp-state

use std::fmt;

use thiserror::Error;

/// Errors raised while connecting to the database or setting up its schema
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

/// Unique constraints enforced by every registration store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueConstraint {
    /// Primary identity of a registration row.
    RegistrationId,
    /// A QR token may be held by exactly one registration.
    QrToken,
    /// One registration per (event, email) pair.
    EventEmail,
    /// Primary identity of an event row.
    EventId,
}

impl UniqueConstraint {
    /// Name of the backing index in the SurrealDB schema.
    pub fn index_name(&self) -> &'static str {
        match self {
            UniqueConstraint::RegistrationId => "idx_registration_id",
            UniqueConstraint::QrToken => "idx_registration_qr_token",
            UniqueConstraint::EventEmail => "idx_registration_event_email",
            UniqueConstraint::EventId => "idx_event_id",
        }
    }

    pub(crate) fn all() -> [UniqueConstraint; 4] {
        [
            UniqueConstraint::RegistrationId,
            UniqueConstraint::QrToken,
            UniqueConstraint::EventEmail,
            UniqueConstraint::EventId,
        ]
    }
}

impl fmt::Display for UniqueConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UniqueConstraint::RegistrationId => "registration id",
            UniqueConstraint::QrToken => "qr token",
            UniqueConstraint::EventEmail => "event/email pair",
            UniqueConstraint::EventId => "event id",
        };
        f.write_str(label)
    }
}

/// Errors surfaced through the [`crate::RegistrationStore`] contract
#[derive(Error, Debug)]
pub enum StorageError {
    /// No registration exists with the given id
    #[error("registration not found: {id}")]
    RegistrationNotFound { id: String },

    /// No event exists with the given id
    #[error("event not found: {id}")]
    EventNotFound { id: String },

    /// An insert collided with a unique constraint
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: UniqueConstraint },

    /// The backend is unavailable or returned something unexpected
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Classify a raw SurrealDB error, recognising unique index violations.
    pub(crate) fn from_surreal(err: surrealdb::Error) -> Self {
        let message = err.to_string();
        match violated_constraint(&message) {
            Some(constraint) => StorageError::UniqueViolation { constraint },
            None => StorageError::Backend(message),
        }
    }
}

/// Index named by a SurrealDB unique-index error such as
/// ``Database index `idx_registration_qr_token` already contains 'QR_x', ...``.
///
/// Only the backtick-quoted index name is matched; the conflicting values
/// later in the message are user data.
fn violated_constraint(message: &str) -> Option<UniqueConstraint> {
    let (head, _) = message.split_once("already contains")?;
    UniqueConstraint::all()
        .into_iter()
        .find(|c| head.contains(&format!("`{}`", c.index_name())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_display_names_constraint() {
        let err = StorageError::UniqueViolation {
            constraint: UniqueConstraint::QrToken,
        };
        assert_eq!(err.to_string(), "unique constraint violated: qr token");
    }

    #[test]
    fn violated_constraint_reads_quoted_index_name() {
        let msg = "Database index `idx_registration_event_email` already contains \
                   ['evt-1', 'idx_registration_qr_token@x.io'], with record `registrations:abc`";
        assert_eq!(violated_constraint(msg), Some(UniqueConstraint::EventEmail));

        let msg = "Database index `idx_registration_qr_token` already contains 'QR_abc', \
                   with record `registrations:abc`";
        assert_eq!(violated_constraint(msg), Some(UniqueConstraint::QrToken));
    }

    #[test]
    fn unquoted_index_name_in_values_is_not_a_violation() {
        let msg = "Database index `idx_other` already contains 'idx_registration_qr_token'";
        assert_eq!(violated_constraint(msg), None);
        assert_eq!(violated_constraint("connection reset by peer"), None);
    }

    #[test]
    fn index_names_are_distinct() {
        let names: std::collections::HashSet<_> = UniqueConstraint::all()
            .iter()
            .map(|c| c.index_name())
            .collect();
        assert_eq!(names.len(), 4);
    }
}
