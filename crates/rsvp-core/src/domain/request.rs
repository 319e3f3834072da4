//! Inbound payloads and their validation.
//!
//! Requests arrive loosely typed (strings straight from a form or CLI) and
//! are turned into typed values here, before anything touches the store.

use chrono::{DateTime, Utc};
use rsvp_state::{Attendance, EventRecord};
use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Minimum length of a guest name after trimming.
pub const MIN_NAME_LEN: usize = 2;

/// An RSVP as submitted by a guest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub event_id: String,
    pub name: String,
    pub email: String,
    pub attendance: String,
    #[serde(default)]
    pub meal_preference: Option<String>,
    #[serde(default)]
    pub dietary_restrictions: Option<String>,
    #[serde(default)]
    pub team_name: Option<String>,
}

/// A registration request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRegistration {
    pub event_id: String,
    pub name: String,
    pub email: String,
    pub attendance: Attendance,
    pub meal_preference: Option<String>,
    pub dietary_restrictions: Option<String>,
    pub team_name: Option<String>,
}

impl RegistrationRequest {
    /// Validate and normalise the request.
    ///
    /// Checks (in order): event id present and a UUID, name present and long
    /// enough, email present and address-shaped, attendance one of
    /// yes/no/maybe. Blank optional fields become `None`.
    pub fn validate(&self) -> Result<ValidRegistration, ValidationError> {
        let event_id = required(&self.event_id, "eventId")?;
        uuid::Uuid::parse_str(event_id).map_err(|_| ValidationError::InvalidEventId {
            value: event_id.to_string(),
        })?;

        let name = required(&self.name, "name")?;
        if name.chars().count() < MIN_NAME_LEN {
            return Err(ValidationError::NameTooShort { min: MIN_NAME_LEN });
        }

        let email = required(&self.email, "email")?;
        if !looks_like_email(email) {
            return Err(ValidationError::InvalidEmail {
                email: email.to_string(),
            });
        }

        let attendance_raw = required(&self.attendance, "attendance")?;
        let attendance: Attendance =
            attendance_raw
                .parse()
                .map_err(|_| ValidationError::UnknownAttendance {
                    value: attendance_raw.to_string(),
                })?;

        Ok(ValidRegistration {
            event_id: event_id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            attendance,
            meal_preference: optional(&self.meal_preference),
            dietary_restrictions: optional(&self.dietary_restrictions),
            team_name: optional(&self.team_name),
        })
    }
}

/// A new event as entered by an organizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub slug: String,
    pub name: String,
    pub date: DateTime<Utc>,
    pub capacity: u32,
    #[serde(default)]
    pub location: Option<String>,
}

impl EventRequest {
    pub fn validate(&self) -> Result<EventRecord, ValidationError> {
        let slug = required(&self.slug, "slug")?;
        let name = required(&self.name, "name")?;
        if self.capacity == 0 {
            return Err(ValidationError::ZeroCapacity);
        }
        let mut event = EventRecord::new(slug, name, self.date, self.capacity);
        event.location = optional(&self.location);
        Ok(event)
    }
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(trimmed)
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Shape check only: one `@`, a non-empty local part, and a dotted domain
/// with no empty labels.
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}
