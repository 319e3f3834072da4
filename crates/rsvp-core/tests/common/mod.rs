//! Fixtures shared by the rsvp-core integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rsvp_core::{
    Attendance, EventRecord, MemoryRegistrationStore, QrToken, Registration, RegistrationStore,
};

pub fn store() -> Arc<MemoryRegistrationStore> {
    Arc::new(MemoryRegistrationStore::new())
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 9, hour, minute, 0).unwrap()
}

pub async fn event(store: &MemoryRegistrationStore, slug: &str, day: u32) -> EventRecord {
    let date = Utc.with_ymd_and_hms(2024, 3, day, 18, 0, 0).unwrap();
    store
        .insert_event(EventRecord::new(slug, slug.replace('-', " "), date, 50))
        .await
        .unwrap()
}

/// Insert a registration with a throwaway token.
pub async fn rsvp(
    store: &MemoryRegistrationStore,
    event_id: &str,
    email: &str,
    attendance: Attendance,
) -> Registration {
    let token = QrToken::new(format!("QR_{}", uuid::Uuid::new_v4().simple()));
    let name = email.split('@').next().unwrap_or(email).to_string();
    store
        .insert(Registration::new(event_id, name, email, attendance, token))
        .await
        .unwrap()
}

pub async fn team_rsvp(
    store: &MemoryRegistrationStore,
    event_id: &str,
    email: &str,
    team: &str,
) -> Registration {
    let token = QrToken::new(format!("QR_{}", uuid::Uuid::new_v4().simple()));
    let name = email.split('@').next().unwrap_or(email).to_string();
    store
        .insert(Registration::new(event_id, name, email, Attendance::Yes, token).with_team(team))
        .await
        .unwrap()
}

pub async fn check_in(store: &MemoryRegistrationStore, reg: &Registration, when: DateTime<Utc>) {
    store.conditional_check_in(&reg.id, when).await.unwrap();
}

/// Give `email` a history of `yes` RSVPs at throwaway events, `attended` of
/// which were checked in.
pub async fn yes_history(store: &MemoryRegistrationStore, email: &str, yes: usize, attended: usize) {
    for i in 0..yes {
        let reg = rsvp(store, &format!("past-{email}-{i}"), email, Attendance::Yes).await;
        if i < attended {
            check_in(store, &reg, at(19, 0)).await;
        }
    }
}
