mod common;

use std::sync::Arc;

use common::{at, check_in, event, rsvp, store, team_rsvp};
use rsvp_core::{
    Attendance, CheckInDesk, ErrorKind, QrToken, Registration, RegistrationId, RegistrationStore,
    SurrealRegistrationStore,
};

#[tokio::test]
async fn first_scan_checks_in_and_second_is_idempotent() {
    let store = store();
    let reg = rsvp(&store, "demo-day", "ada@example.edu", Attendance::Yes).await;
    let desk = CheckInDesk::new(Arc::clone(&store));

    let first = desk.check_in_by_token(reg.qr_token.as_str()).await.unwrap();
    assert!(first.success);
    assert!(!first.already_checked_in);
    assert!(first.registration.checked_in);
    assert_eq!(first.message, "Successfully checked in ada");
    let stamped = first.registration.checked_in_at.unwrap();

    let second = desk.check_in_by_token(reg.qr_token.as_str()).await.unwrap();
    assert!(second.success);
    assert!(second.already_checked_in);
    assert_eq!(second.registration.checked_in_at, Some(stamped));
    assert!(second.message.contains(&stamped.format("%H:%M:%S").to_string()));

    let stored = store.get_registration(&reg.id).await.unwrap().unwrap();
    assert_eq!(stored.checked_in_at, Some(stamped));
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let desk = CheckInDesk::new(store());
    let err = desk.check_in_by_token("QR_doesnotexist").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn concurrent_scans_transition_exactly_once() {
    let store = store();
    let reg = rsvp(&store, "demo-day", "ada@example.edu", Attendance::Yes).await;
    let desk = Arc::new(CheckInDesk::new(Arc::clone(&store)));

    let scans = (0..24).map(|_| {
        let desk = Arc::clone(&desk);
        let token = reg.qr_token.as_str().to_string();
        tokio::spawn(async move { desk.check_in_by_token(&token).await })
    });
    let receipts: Vec<_> = futures::future::join_all(scans)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert!(receipts.iter().all(|r| r.success));
    let transitions = receipts.iter().filter(|r| !r.already_checked_in).count();
    assert_eq!(transitions, 1);

    let winner = receipts.iter().find(|r| !r.already_checked_in).unwrap();
    let stored = store.get_registration(&reg.id).await.unwrap().unwrap();
    assert_eq!(stored.checked_in_at, winner.registration.checked_in_at);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_scans_against_surreal_transition_exactly_once() {
    let store: Arc<dyn RegistrationStore> =
        Arc::new(SurrealRegistrationStore::in_memory().await.unwrap());
    let reg = store
        .insert(Registration::new(
            "demo-day",
            "Ada",
            "ada@example.edu",
            Attendance::Yes,
            QrToken::new("QR_surrealrace"),
        ))
        .await
        .unwrap();
    let desk = Arc::new(CheckInDesk::new(Arc::clone(&store)));

    let gate = Arc::new(tokio::sync::Barrier::new(16));
    let scans = (0..16).map(|_| {
        let desk = Arc::clone(&desk);
        let gate = Arc::clone(&gate);
        tokio::spawn(async move {
            gate.wait().await;
            desk.check_in_by_token("QR_surrealrace").await
        })
    });
    let receipts: Vec<_> = futures::future::join_all(scans)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert!(receipts.iter().all(|r| r.success));
    let winners: Vec<_> = receipts.iter().filter(|r| !r.already_checked_in).collect();
    assert_eq!(winners.len(), 1);

    let stamped = winners[0].registration.checked_in_at;
    assert!(stamped.is_some());
    assert!(receipts
        .iter()
        .all(|r| r.registration.checked_in_at == stamped));

    let stored = store.get_registration(&reg.id).await.unwrap().unwrap();
    assert_eq!(stored.checked_in_at, stamped);
}

#[tokio::test]
async fn batch_skips_pre_checked_member() {
    let store = store();
    let a = team_rsvp(&store, "hack-night", "a@example.edu", "Rustaceans").await;
    let b = team_rsvp(&store, "hack-night", "b@example.edu", "Rustaceans").await;
    let c = team_rsvp(&store, "hack-night", "c@example.edu", "Rustaceans").await;
    check_in(&store, &b, at(17, 45)).await;

    let desk = CheckInDesk::new(Arc::clone(&store));
    let batch = desk
        .check_in_batch(&[a.id.clone(), b.id.clone(), c.id.clone()])
        .await
        .unwrap();

    assert!(batch.success);
    assert_eq!(batch.count, 2);
    let ids: Vec<_> = batch.checked_in.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, vec![a.id.clone(), c.id.clone()]);
    assert_eq!(batch.already_checked_in.len(), 1);
    assert_eq!(
        batch.checked_in[0].checked_in_at,
        batch.checked_in[1].checked_in_at
    );

    let b_now = store.get_registration(&b.id).await.unwrap().unwrap();
    assert_eq!(b_now.checked_in_at, Some(at(17, 45)));
}

#[tokio::test]
async fn batch_skips_unknown_ids() {
    let store = store();
    let a = rsvp(&store, "demo-day", "a@example.edu", Attendance::Yes).await;

    let batch = CheckInDesk::new(store)
        .check_in_batch(&[RegistrationId::from("ghost"), a.id.clone()])
        .await
        .unwrap();
    assert_eq!(batch.count, 1);
    assert_eq!(batch.unknown_ids, vec!["ghost".to_string()]);
}

#[tokio::test]
async fn team_check_in_by_name() {
    let store = store();
    let evt = event(&store, "hack-night", 9).await;
    team_rsvp(&store, &evt.id, "a@example.edu", "Rustaceans").await;
    team_rsvp(&store, &evt.id, "b@example.edu", "Rustaceans").await;
    team_rsvp(&store, &evt.id, "c@example.edu", "Gophers").await;

    let desk = CheckInDesk::new(store);
    let batch = desk.check_in_team(&evt.id, "Rustaceans").await.unwrap();
    assert_eq!(batch.count, 2);

    let err = desk.check_in_team(&evt.id, "Pythonistas").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn store_failure_mid_batch_keeps_earlier_transitions() {
    let store = store();
    let a = rsvp(&store, "demo-day", "a@example.edu", Attendance::Yes).await;
    let b = rsvp(&store, "demo-day", "b@example.edu", Attendance::Yes).await;
    store.fail_check_ins_after(1);

    let err = CheckInDesk::new(Arc::clone(&store))
        .check_in_batch(&[a.id.clone(), b.id.clone()])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    assert!(store.get_registration(&a.id).await.unwrap().unwrap().checked_in);
    assert!(!store.get_registration(&b.id).await.unwrap().unwrap().checked_in);
}

#[tokio::test]
async fn unavailable_store_on_scan_is_internal() {
    let store = store();
    let reg = rsvp(&store, "demo-day", "a@example.edu", Attendance::Yes).await;
    store.set_unavailable(true);

    let err = CheckInDesk::new(store)
        .check_in_by_token(reg.qr_token.as_str())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}
