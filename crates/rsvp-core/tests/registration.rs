mod common;

use chrono::{TimeZone, Utc};
use common::{event, store};
use rsvp_core::{
    Attendance, AttendanceEngine, ErrorKind, EventRequest, Registration, RegistrationRequest,
    RegistrationStore, RsvpError, TokenIssuer, TokenPolicy, ValidationError,
};

fn request(event_id: &str, email: &str) -> RegistrationRequest {
    RegistrationRequest {
        event_id: event_id.to_string(),
        name: "Ada Lovelace".to_string(),
        email: email.to_string(),
        attendance: "Yes".to_string(),
        meal_preference: Some("vegetarian".to_string()),
        dietary_restrictions: Some("".to_string()),
        team_name: None,
    }
}

#[tokio::test]
async fn register_mints_token_and_stores_row() {
    let store = store();
    let evt = event(&store, "demo-day", 9).await;
    let engine = AttendanceEngine::new(store.clone());

    let reg = engine
        .registrations
        .register(request(&evt.id, "ada@example.edu"))
        .await
        .unwrap();

    assert!(reg.qr_token.as_str().starts_with("QR_"));
    assert_eq!(reg.qr_token.as_str().len(), 15);
    assert_eq!(reg.attendance, Attendance::Yes);
    assert_eq!(reg.meal_preference.as_deref(), Some("vegetarian"));
    assert_eq!(reg.dietary_restrictions, None);
    assert!(!reg.checked_in);

    let found = store.find_by_token(&reg.qr_token).await.unwrap().unwrap();
    assert_eq!(found.id, reg.id);
}

#[tokio::test]
async fn duplicate_registration_is_conflict() {
    let store = store();
    let evt = event(&store, "demo-day", 9).await;
    let engine = AttendanceEngine::new(store);

    engine
        .registrations
        .register(request(&evt.id, "ada@example.edu"))
        .await
        .unwrap();
    let err = engine
        .registrations
        .register(request(&evt.id, "ada@example.edu"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn unknown_event_is_not_found() {
    let engine = AttendanceEngine::new(store());
    let err = engine
        .registrations
        .register(request(
            "7f1b8c5e-2a4d-4c9e-9a53-2b8f6f1d0c11",
            "ada@example.edu",
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn malformed_request_is_validation_error() {
    let store = store();
    let evt = event(&store, "demo-day", 9).await;
    let engine = AttendanceEngine::new(store);

    let err = engine
        .registrations
        .register(request(&evt.id, "not-an-email"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RsvpError::Validation(ValidationError::InvalidEmail { .. })
    ));
}

#[tokio::test]
async fn token_collision_is_retried() {
    let store = store();
    let evt = event(&store, "demo-day", 9).await;

    let probe = TokenIssuer::with_seed(TokenPolicy::default(), 7);
    let taken = probe.issue();
    let expected = probe.issue();
    store
        .insert(Registration::new(
            "other",
            "Squatter",
            "squatter@example.edu",
            Attendance::No,
            taken,
        ))
        .await
        .unwrap();

    let engine = AttendanceEngine::with_issuer(
        store,
        TokenIssuer::with_seed(TokenPolicy::default(), 7),
    );
    let reg = engine
        .registrations
        .register(request(&evt.id, "ada@example.edu"))
        .await
        .unwrap();
    assert_eq!(reg.qr_token, expected);
}

#[tokio::test]
async fn exhausted_token_attempts_is_conflict() {
    let store = store();
    let evt = event(&store, "demo-day", 9).await;
    let policy = TokenPolicy {
        max_attempts: 3,
        ..TokenPolicy::default()
    };

    let probe = TokenIssuer::with_seed(policy.clone(), 11);
    for i in 0..3 {
        let email = format!("s{i}@example.edu");
        let squatter = Registration::new("other", "Squatter", email, Attendance::No, probe.issue());
        store.insert(squatter).await.unwrap();
    }

    let engine = AttendanceEngine::with_issuer(store.clone(), TokenIssuer::with_seed(policy, 11));
    let before = store.len();
    let err = engine
        .registrations
        .register(request(&evt.id, "ada@example.edu"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(store.len(), before);
}

#[tokio::test]
async fn create_event_validates_capacity() {
    let engine = AttendanceEngine::new(store());
    let date = Utc.with_ymd_and_hms(2024, 4, 1, 17, 0, 0).unwrap();

    let created = engine
        .registrations
        .create_event(EventRequest {
            slug: "spring-mixer".to_string(),
            name: "Spring Mixer".to_string(),
            date,
            capacity: 120,
            location: Some(" Quad ".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(created.location.as_deref(), Some("Quad"));
    assert_eq!(
        engine.store().get_event(&created.id).await.unwrap(),
        Some(created.clone())
    );

    let err = engine
        .registrations
        .create_event(EventRequest {
            slug: "empty".to_string(),
            name: "Empty".to_string(),
            date,
            capacity: 0,
            location: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
