//! Outbound writer tests: carrier naming and collision handling.

use corvid_core::Message;

use super::harness::TestHarness;
use crate::error::AgentError;

#[tokio::test]
async fn carrier_is_named_by_id_and_decodes_to_the_message() {
    let harness = TestHarness::new();
    let message = Message::response(b"finding".to_vec());

    let path = harness.outbound().write(&message).await.unwrap();

    assert_eq!(path.parent().unwrap(), harness.config.outbox_dir());
    assert_eq!(
        path.file_name().unwrap().to_string_lossy(),
        format!("{}.mp4", message.id)
    );
    let roundtripped = Message::decode(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(roundtripped, message);
}

#[tokio::test]
async fn intermediate_artifact_is_written_beside_the_carrier() {
    let harness = TestHarness::new();
    let message = Message::response(b"finding".to_vec());

    harness.outbound().write(&message).await.unwrap();

    let intermediate = harness
        .config
        .decoded_dir()
        .join(format!("{}.data", message.id));
    assert_eq!(
        std::fs::read(&intermediate).unwrap(),
        message.encode().unwrap()
    );
}

#[tokio::test]
async fn occupied_target_path_is_an_integrity_fault() {
    let harness = TestHarness::new();
    let message = Message::response(b"finding".to_vec());
    let target = harness
        .config
        .outbox_dir()
        .join(format!("{}.mp4", message.id));
    std::fs::write(&target, b"squatter").unwrap();

    match harness.outbound().write(&message).await {
        Err(AgentError::DuplicatePath(path)) => assert_eq!(path, target),
        other => panic!("expected DuplicatePath, got {other:?}"),
    }
    // The occupant is untouched.
    assert_eq!(std::fs::read(&target).unwrap(), b"squatter");
}
