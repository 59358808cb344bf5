// tests/integration/override_tests.rs
use doorguard::core::identity::DoorState;
use doorguard::core::services::DoorEvent;
use doorguard::utils::error::DoorError;

use crate::common::*;

#[test_log::test(tokio::test)]
async fn test_guest_override_then_manual_close() {
    let mut ctx = TestContext::builder().build();
    let session = ctx.session();
    let mut events = session.subscribe();

    assert_eq!(session.guest_open_request().await.unwrap(), DoorState::Opened);
    assert_eq!(ctx.movements(), 1);

    assert_eq!(session.close_request().await.unwrap(), DoorState::Closed);
    assert_eq!(ctx.movements(), 2);

    let mut messages = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let DoorEvent::Status { message, .. } = event {
            messages.push(message);
        }
    }
    assert_eq!(
        messages,
        vec!["guest access granted (admin override)", "door closed manually"]
    );
}

#[test_log::test(tokio::test)]
async fn test_manual_close_is_idempotent() {
    let mut ctx = TestContext::builder().build();
    let session = ctx.session();

    assert_eq!(session.close_request().await.unwrap(), DoorState::Closed);
    assert_eq!(session.close_request().await.unwrap(), DoorState::Closed);
    assert_eq!(ctx.movements(), 0);
}

#[test_log::test(tokio::test)]
async fn test_guest_override_refused_during_attempt() {
    let mut ctx = TestContext::builder()
        .faces(&[ALICE])
        .speaker(ALICE)
        .gated()
        .build();
    let session = ctx.session();
    let mut events = session.subscribe();

    let attempt = session.open_request().unwrap();
    wait_for_phase(&mut events, "capturing_voice").await;

    assert!(matches!(
        session.guest_open_request().await,
        Err(DoorError::AlreadyInProgress)
    ));
    assert_eq!(ctx.movements(), 0);

    ctx.release_microphone();
    attempt.wait().await.unwrap();
    assert_eq!(session.status().door, DoorState::Opened);
}

#[test_log::test(tokio::test)]
async fn test_manual_close_allowed_during_attempt() {
    let mut ctx = TestContext::builder()
        .faces(&[ALICE])
        .speaker(BOB)
        .gated()
        .build();
    let session = ctx.session();
    let mut events = session.subscribe();

    session.guest_open_request().await.unwrap();
    let attempt = session.open_request().unwrap();
    wait_for_phase(&mut events, "capturing_voice").await;

    assert_eq!(session.close_request().await.unwrap(), DoorState::Closed);

    ctx.release_microphone();
    let settlement = attempt.wait().await.unwrap();
    assert_eq!(settlement.door, DoorState::Closed);
    // open by guest, closed by hand; the rejection found it closed already
    assert_eq!(ctx.movements(), 2);
}
