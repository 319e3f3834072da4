//! Row definitions for the RSVP SurrealDB tables
//!
//! Tables:
//! - registrations: one row per (event, guest email) RSVP
//! - events: events guests register for
//!
//! Rows carry their own string identity (`registration_id`, `event_id`)
//! rather than relying on SurrealDB record ids, and are converted to the
//! `storage_traits` types at the boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage_traits::{Attendance, EventRecord, QrToken, Registration, RegistrationId};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Module for serializing optional chrono DateTime to SurrealDB datetime format
mod surreal_datetime_opt {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => {
                let sd = SurrealDatetime::from(*d);
                serde::Serialize::serialize(&Some(sd), serializer)
            }
            None => serde::Serialize::serialize(&None::<SurrealDatetime>, serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = Option::<SurrealDatetime>::deserialize(deserializer)?;
        Ok(sd.map(DateTime::from))
    }
}

/// A row in the `registrations` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RegistrationRow {
    pub registration_id: String,
    pub event_id: String,
    pub name: String,
    pub email: String,
    pub attendance: Attendance,
    #[serde(default)]
    pub meal_preference: Option<String>,
    #[serde(default)]
    pub dietary_restrictions: Option<String>,
    #[serde(default)]
    pub team_name: Option<String>,
    pub qr_token: String,
    pub checked_in: bool,
    #[serde(default, with = "surreal_datetime_opt")]
    pub checked_in_at: Option<DateTime<Utc>>,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl From<Registration> for RegistrationRow {
    fn from(r: Registration) -> Self {
        Self {
            registration_id: r.id.0,
            event_id: r.event_id,
            name: r.name,
            email: r.email,
            attendance: r.attendance,
            meal_preference: r.meal_preference,
            dietary_restrictions: r.dietary_restrictions,
            team_name: r.team_name,
            qr_token: r.qr_token.as_str().to_string(),
            checked_in: r.checked_in,
            checked_in_at: r.checked_in_at,
            created_at: r.created_at,
        }
    }
}

impl From<RegistrationRow> for Registration {
    fn from(row: RegistrationRow) -> Self {
        Self {
            id: RegistrationId(row.registration_id),
            event_id: row.event_id,
            name: row.name,
            email: row.email,
            attendance: row.attendance,
            meal_preference: row.meal_preference,
            dietary_restrictions: row.dietary_restrictions,
            team_name: row.team_name,
            qr_token: QrToken::new(row.qr_token),
            checked_in: row.checked_in,
            checked_in_at: row.checked_in_at,
            created_at: row.created_at,
        }
    }
}

/// A row in the `events` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EventRow {
    pub event_id: String,
    pub slug: String,
    pub name: String,
    #[serde(with = "surreal_datetime")]
    pub date: DateTime<Utc>,
    pub capacity: u32,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl From<EventRecord> for EventRow {
    fn from(e: EventRecord) -> Self {
        Self {
            event_id: e.id,
            slug: e.slug,
            name: e.name,
            date: e.date,
            capacity: e.capacity,
            location: e.location,
            created_at: e.created_at,
        }
    }
}

impl From<EventRow> for EventRecord {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.event_id,
            slug: row.slug,
            name: row.name,
            date: row.date,
            capacity: row.capacity,
            location: row.location,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_row_conversion_preserves_fields() {
        let mut reg = Registration::new(
            "evt-1",
            "Grace",
            "grace@example.edu",
            Attendance::Maybe,
            QrToken::new("QR_ZXCVbnm12345"),
        )
        .with_team("Compilers");
        reg.dietary_restrictions = Some("vegan".to_string());

        let row = RegistrationRow::from(reg.clone());
        assert_eq!(row.registration_id, reg.id.0);
        assert_eq!(row.qr_token, "QR_ZXCVbnm12345");

        let back = Registration::from(row);
        assert_eq!(back, reg);
    }

    #[test]
    fn event_row_keeps_identity_in_event_id() {
        let event = EventRecord::new("hack-night", "Hack Night", Utc::now(), 120);
        let row = EventRow::from(event.clone());
        assert_eq!(row.event_id, event.id);
        assert_eq!(EventRecord::from(row), event);
    }
}
