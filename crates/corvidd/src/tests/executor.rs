//! Executor tests: directive extraction, output capture, timeout.

use std::time::Duration;

use corvid_store::AgentStore;

use super::harness::TestHarness;
use crate::error::AgentError;

#[tokio::test]
async fn echo_command_records_output_and_signals_completion() {
    let harness = TestHarness::new();
    let message = TestHarness::request(b"command: echo hi");

    let id = harness.executor().execute(&message).unwrap();
    let record = harness.wait_for_execution_record(id).await;

    assert_eq!(record.command_text, "echo hi");
    assert_eq!(record.stdout, "hi\n");
    assert_eq!(record.stderr, "");
    assert_eq!(record.exit_code, Some(0));
    assert!(!record.timed_out);
    assert!(record.end_time > record.start_time);
    harness.wait_for_completion_signal(id).await;
    assert_eq!(harness.completed_ids().await, vec![id.to_string()]);
}

#[tokio::test]
async fn nonzero_exit_still_produces_a_record() {
    let harness = TestHarness::new();
    let message = TestHarness::request(b"command: exit 7");

    let id = harness.executor().execute(&message).unwrap();
    let record = harness.wait_for_execution_record(id).await;
    assert_eq!(record.exit_code, Some(7));
    assert!(!record.timed_out);
}

#[tokio::test]
async fn missing_directive_is_rejected_before_any_store_write() {
    let harness = TestHarness::new();

    let plain = TestHarness::request(b"hello");
    assert!(matches!(
        harness.executor().execute(&plain),
        Err(AgentError::MalformedCommand(_))
    ));

    let empty = TestHarness::request(b"command:   ");
    assert!(matches!(
        harness.executor().execute(&empty),
        Err(AgentError::MalformedCommand(_))
    ));

    let mut payloadless = TestHarness::request(b"x");
    payloadless.payload = None;
    assert!(matches!(
        harness.executor().execute(&payloadless),
        Err(AgentError::MalformedCommand(_))
    ));

    // No record, no signal.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(harness.completed_ids().await.is_empty());
    assert!(harness
        .store
        .scan_prefix(corvid_core::keys::EXECUTION_PREFIX)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn timed_out_command_yields_one_record_with_discarded_output() {
    let harness = TestHarness::new();
    let message = TestHarness::request(b"command: echo partial; sleep 30");

    let executor = harness.executor_with_timeout(Duration::from_millis(100));
    let id = executor.execute(&message).unwrap();
    let record = harness.wait_for_execution_record(id).await;

    assert!(record.timed_out);
    assert_eq!(record.stdout, "");
    assert_eq!(record.stderr, "");
    assert_eq!(record.exit_code, None);
    assert!(record.end_time > record.start_time);

    // No retry: still exactly one signal after a settle period.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(harness.completed_ids().await, vec![id.to_string()]);
}

#[tokio::test]
async fn completion_publish_survives_a_store_outage() {
    let harness = TestHarness::new();
    let message = TestHarness::request(b"command: echo resilient");

    harness.store.set_offline(true);
    let id = harness.executor().execute(&message).unwrap();

    // Give the command time to finish and hit the unavailable store.
    tokio::time::sleep(Duration::from_millis(200)).await;
    harness.store.set_offline(false);

    let record = harness.wait_for_execution_record(id).await;
    assert_eq!(record.stdout, "resilient\n");
    harness.wait_for_completion_signal(id).await;
    assert_eq!(harness.completed_ids().await, vec![id.to_string()]);
}
