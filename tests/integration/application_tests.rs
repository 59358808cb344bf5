// tests/integration/application_tests.rs
use std::sync::Arc;

use doorguard::core::identity::{AuthenticationVerdict, DoorState};
use doorguard::storage::JsonCatalogStore;
use doorguard::utils::error::DoorError;
use doorguard::Application;

use crate::common::*;

#[test_log::test(tokio::test)]
async fn test_application_lifecycle() {
    let mut ctx = TestContext::builder()
        .faces(&[ALICE])
        .speaker(ALICE)
        .configure(|config| config.door.status_poll_ms = 5)
        .build();
    let app = Application::new(ctx.config.clone(), ctx.take_collaborators())
        .expect("Failed to create application");

    app.start();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(app.session().status().door, DoorState::Closed);

    let settlement = app.session().open_request().unwrap().wait().await.unwrap();
    assert!(settlement.verdict.is_authenticated());

    app.shutdown().await.expect("Failed to shut down");
    assert!(matches!(
        app.session().open_request(),
        Err(DoorError::ShutDown)
    ));
}

#[test_log::test(tokio::test)]
async fn test_invalid_config_is_rejected() {
    let mut ctx = TestContext::builder()
        .configure(|config| config.voice.recording_ms = 0)
        .build();

    match Application::new(ctx.config.clone(), ctx.take_collaborators()) {
        Err(DoorError::Config(msg)) => assert!(msg.contains("recording_ms")),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("invalid config accepted"),
    }
}

#[test_log::test(tokio::test)]
async fn test_attempt_against_catalog_files() {
    let data = tempfile::tempdir().unwrap();
    let faces = data.path().join("encodings_faces.json");
    let voices = data.path().join("encodings_voices.json");
    std::fs::write(
        &faces,
        r#"{"names": ["Bob", "Alice"], "encodings": [[2.0], [1.0]]}"#,
    )
    .unwrap();
    std::fs::write(&voices, r#"[["Alice", [[1.0]]], ["Bob", [[2.0]]]]"#).unwrap();

    let mut config = doorguard::utils::config::Config::new_test_config();
    config.storage.face_catalog_path = faces;
    config.storage.voice_catalog_path = voices;

    let mut ctx = TestContext::builder()
        .faces(&[ALICE])
        .speaker(ALICE)
        .catalogs(Arc::new(JsonCatalogStore::new(&config.storage)))
        .build();
    let session = ctx.session();

    let settlement = session.open_request().unwrap().wait().await.unwrap();
    assert_eq!(
        settlement.verdict,
        AuthenticationVerdict::Authenticated {
            identity: "Alice".into()
        }
    );
}

#[test_log::test(tokio::test)]
async fn test_missing_catalog_files_reject_everyone() {
    let data = tempfile::tempdir().unwrap();
    let mut config = doorguard::utils::config::Config::new_test_config();
    config.storage.face_catalog_path = data.path().join("absent_faces.json");
    config.storage.voice_catalog_path = data.path().join("absent_voices.json");

    let mut ctx = TestContext::builder()
        .faces(&[ALICE])
        .speaker(ALICE)
        .catalogs(Arc::new(JsonCatalogStore::new(&config.storage)))
        .build();
    let session = ctx.session();

    let settlement = session.open_request().unwrap().wait().await.unwrap();
    assert_eq!(settlement.verdict, AuthenticationVerdict::RejectedNoFace);
    assert_eq!(settlement.door, DoorState::Closed);
    assert_eq!(ctx.movements(), 0);
}
