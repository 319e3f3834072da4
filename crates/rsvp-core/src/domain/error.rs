//! Domain-level error taxonomy for the RSVP engine.

use rsvp_state::{StorageError, UniqueConstraint};

/// Errors produced by request validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("name must be at least {min} characters")]
    NameTooShort { min: usize },

    #[error("invalid email address: {email}")]
    InvalidEmail { email: String },

    #[error("event id is not a valid UUID: {value}")]
    InvalidEventId { value: String },

    #[error("unknown attendance value: {value} (expected yes, no or maybe)")]
    UnknownAttendance { value: String },

    #[error("capacity must be greater than zero")]
    ZeroCapacity,
}

/// Broad classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Internal,
}

/// RSVP engine errors.
#[derive(Debug, thiserror::Error)]
pub enum RsvpError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RsvpError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RsvpError::NotFound(_) => ErrorKind::NotFound,
            RsvpError::Conflict(_) => ErrorKind::Conflict,
            RsvpError::Validation(_) => ErrorKind::Validation,
            RsvpError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<StorageError> for RsvpError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::RegistrationNotFound { id } => {
                RsvpError::NotFound(format!("registration {id}"))
            }
            StorageError::EventNotFound { id } => RsvpError::NotFound(format!("event {id}")),
            StorageError::UniqueViolation {
                constraint: UniqueConstraint::EventEmail,
            } => RsvpError::Conflict("already registered for this event".to_string()),
            StorageError::UniqueViolation { constraint } => {
                RsvpError::Conflict(format!("duplicate {constraint}"))
            }
            StorageError::Backend(msg) => RsvpError::Internal(msg),
        }
    }
}

/// Result type for RSVP engine operations.
pub type Result<T> = std::result::Result<T, RsvpError>;
