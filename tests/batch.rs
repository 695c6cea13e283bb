//! Batch coordinator behavior through scripted transports.

mod common;

use beekeepy::{BatchError, Error, FaultKind};
use common::*;
use serde_json::{json, Value};

fn reply(items: Vec<String>) -> Reply {
    let items: Vec<Value> = items
        .iter()
        .map(|s| serde_json::from_str(s).unwrap())
        .collect();
    body(Value::Array(items).to_string())
}

#[tokio::test]
async fn test_batch_is_sent_once_and_matched_by_id() {
    let transport = ScriptedTransport::new(vec![reply(vec![
        ok(2, json!("c")),
        ok(0, json!("a")),
        ok(1, json!("b")),
    ])]);
    let client = client(&transport, 3);

    let mut batch = client.batch();
    let a = batch.call::<String, _>("database_api.get_config", &json!({})).unwrap();
    let b = batch.call::<String, _>("database_api.get_version", &json!({})).unwrap();
    let c = batch.call::<String, _>("database_api.find_accounts", &json!({"accounts": []})).unwrap();
    assert!(!a.is_ready());
    batch.send().await.unwrap();

    assert_eq!(transport.send_count(), 1);
    let sent = &transport.sent()[0];
    let ids: Vec<u64> = sent
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(sent[1]["method"], "database_api.get_version");
    assert_eq!(a.get().unwrap(), "a");
    assert_eq!(b.get().unwrap(), "b");
    assert_eq!(c.get().unwrap(), "c");
}

#[tokio::test]
async fn test_empty_batch() {
    let transport = ScriptedTransport::new(vec![]);
    let client = client(&transport, 3);

    let err = client.batch().send().await.unwrap_err();

    assert!(matches!(err, Error::Batch(BatchError::NothingToSend)));
    assert_eq!(transport.send_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_delayed_errors_fault_only_the_failing_item() {
    let transport = ScriptedTransport::new(vec![reply(vec![
        ok(0, json!(10)),
        err(1, "missing authority"),
        ok(2, json!(12)),
    ])]);
    let client = client(&transport, 2);

    let mut batch = client.batch_with_delayed_errors();
    let first = batch.call::<u32, _>("database_api.get_config", &()).unwrap();
    let second = batch.call::<u32, _>("database_api.get_config", &()).unwrap();
    let third = batch.call::<u32, _>("database_api.get_config", &()).unwrap();
    batch.send().await.unwrap();

    // The finite tier retried the whole batch before surrendering.
    assert_eq!(transport.send_count(), 3);
    assert_eq!(first.get().unwrap(), 10);
    assert_eq!(third.get().unwrap(), 12);
    let err = second.get().unwrap_err();
    assert!(matches!(err, Error::Deferred(_)));
    assert_eq!(err.fault_kind(), Some(FaultKind::ErrorPresent));
    assert_eq!(err.fault().unwrap().request_id, Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_eager_batch_raises_on_send() {
    let transport = ScriptedTransport::new(vec![reply(vec![
        ok(0, json!(10)),
        err(1, "missing authority"),
    ])]);
    let client = client(&transport, 0);

    let mut batch = client.batch();
    let first = batch.call::<u32, _>("database_api.get_config", &()).unwrap();
    let second = batch.call::<u32, _>("database_api.get_config", &()).unwrap();
    let err = batch.send().await.unwrap_err();

    assert_eq!(err.fault_kind(), Some(FaultKind::ErrorPresent));
    assert_eq!(first.get().unwrap(), 10);
    assert!(matches!(
        second.get().unwrap_err(),
        Error::Batch(BatchError::NotReady { id: 1, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_whole_batch_error_is_broadcast() {
    // One top-level error object answers all three calls.
    let transport = ScriptedTransport::new(vec![body(err(0, "Bad Cast: Invalid cast from string"))]);
    let client = client(&transport, 1);

    let mut batch = client.batch_with_delayed_errors();
    let results: Vec<_> = (0..3)
        .map(|_| batch.call::<Value, _>("database_api.get_config", &()).unwrap())
        .collect();
    batch.send().await.unwrap();

    assert_eq!(transport.send_count(), 2);
    for result in &results {
        let err = result.get().unwrap_err();
        assert_eq!(err.fault_kind(), Some(FaultKind::ErrorPresent));
        assert_eq!(err.fault().unwrap().request_id, None);
    }
}

#[tokio::test(start_paused = true)]
async fn test_count_mismatch_is_broadcast() {
    let transport = ScriptedTransport::new(vec![reply(vec![ok(0, json!(1))])]);
    let client = client(&transport, 1);

    let mut batch = client.batch_with_delayed_errors();
    let a = batch.call::<u32, _>("database_api.get_config", &()).unwrap();
    let b = batch.call::<u32, _>("database_api.get_config", &()).unwrap();
    batch.send().await.unwrap();

    assert_eq!(a.get().unwrap_err().fault_kind(), Some(FaultKind::CountMismatch));
    assert_eq!(b.get().unwrap_err().fault_kind(), Some(FaultKind::CountMismatch));
}

#[tokio::test(start_paused = true)]
async fn test_short_batch_exhausts_budget_in_both_modes() {
    // Three calls, two answers, every time.
    let short = || reply(vec![ok(0, json!(1)), ok(1, json!(2))]);

    let transport = ScriptedTransport::new(vec![short()]);
    let eager = client(&transport, 2);
    let mut batch = eager.batch();
    for _ in 0..3 {
        batch.call::<u32, _>("database_api.get_config", &()).unwrap();
    }
    let err = batch.send().await.unwrap_err();
    assert_eq!(err.fault_kind(), Some(FaultKind::CountMismatch));
    assert_eq!(transport.send_count(), 3);

    let transport = ScriptedTransport::new(vec![short()]);
    let delayed = client(&transport, 2);
    let mut batch = delayed.batch_with_delayed_errors();
    let results: Vec<_> = (0..3)
        .map(|_| batch.call::<u32, _>("database_api.get_config", &()).unwrap())
        .collect();
    batch.send().await.unwrap();
    assert_eq!(transport.send_count(), 3);
    for result in &results {
        assert_eq!(result.get().unwrap_err().fault_kind(), Some(FaultKind::CountMismatch));
    }
}

#[tokio::test(start_paused = true)]
async fn test_array_of_non_objects_is_unparsable() {
    let transport = ScriptedTransport::new(vec![body("[1,2]")]);
    let client = client(&transport, 3);

    let mut batch = client.batch();
    batch.call::<u32, _>("database_api.get_config", &()).unwrap();
    batch.call::<u32, _>("database_api.get_config", &()).unwrap();
    let err = batch.send().await.unwrap_err();

    // Preliminary tier: no retry.
    assert_eq!(transport.send_count(), 1);
    assert_eq!(err.fault_kind(), Some(FaultKind::UnparsableResponse));
    assert_eq!(err.fault().unwrap().raw_response.as_deref(), Some("[1,2]"));
}

#[test]
fn test_blocking_batch() {
    let transport = ScriptedTransport::new(vec![reply(vec![ok(1, json!(true)), ok(0, json!(false))])]);
    let client = blocking_client(&transport, 1);

    let mut batch = client.batch();
    let a = batch.call::<bool, _>("database_api.get_config", &()).unwrap();
    let b = batch.call::<bool, _>("database_api.get_config", &()).unwrap();
    assert_eq!(batch.len(), 2);
    batch.send().unwrap();

    assert!(!a.get().unwrap());
    assert!(b.get().unwrap());
}
