//! End-to-end overseer behavior through scripted transports.

mod common;

use beekeepy::overseer::Tier;
use beekeepy::telemetry::OverseerEvent;
use beekeepy::transport::TransportError;
use beekeepy::{Error, FaultKind};
use common::*;
use serde_json::{json, Value};

const NULL_RESULT: &str = r#"{"jsonrpc":"2.0","id":0,"result":null}"#;
const DB_LOCK: &str = "Unable to acquire database lock";

#[tokio::test(start_paused = true)]
async fn test_null_result_surrenders_after_budget() {
    // A regular method answering `null` forever: max_retries + 1 sends, then give up.
    let transport = ScriptedTransport::new(vec![body(NULL_RESULT)]);
    let (client, sink) = client_with_sink(&transport, 3);

    let err = client
        .invoke::<Value, _>("database_api.get_config", &json!({}))
        .await
        .unwrap_err();

    assert_eq!(err.fault_kind(), Some(FaultKind::NullResult));
    assert_eq!(transport.send_count(), 4);
    assert_eq!(
        sink.count(|e| matches!(e, OverseerEvent::Retrying { tier: Tier::FinitelyRepeatable, .. })),
        3
    );
    assert_eq!(sink.count(|e| matches!(e, OverseerEvent::Surrendered { .. })), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unparsable_body_surrenders_without_retry() {
    let transport = ScriptedTransport::new(vec![body("404: Not Found")]);
    let client = client(&transport, 5);

    let err = client
        .invoke::<Value, _>("database_api.get_config", &json!({}))
        .await
        .unwrap_err();

    let fault = err.fault().unwrap();
    assert_eq!(fault.kind, FaultKind::UnparsableResponse);
    assert_eq!(fault.raw_response.as_deref(), Some("404: Not Found"));
    assert_eq!(transport.send_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_database_lock_never_consumes_budget() {
    let mut replies: Vec<Reply> = (0..20).map(|_| body(err(0, DB_LOCK))).collect();
    replies.push(body(ok(0, json!({"head_block_number": 5}))));
    let transport = ScriptedTransport::new(replies);
    let client = client(&transport, 1);

    let value: Value = client
        .invoke("database_api.get_config", &json!({}))
        .await
        .unwrap();

    assert_eq!(value, json!({"head_block_number": 5}));
    assert_eq!(transport.send_count(), 21);
}

#[tokio::test(start_paused = true)]
async fn test_database_lock_resets_budget() {
    let transport = ScriptedTransport::new(vec![
        body(NULL_RESULT),
        body(NULL_RESULT),
        body(err(0, DB_LOCK)),
        body(NULL_RESULT),
        body(NULL_RESULT),
        body(NULL_RESULT),
    ]);
    let client = client(&transport, 2);

    let err = client
        .invoke::<Value, _>("database_api.get_config", &json!({}))
        .await
        .unwrap_err();

    // Two finite faults, a reset, then max + 1 finite faults.
    assert_eq!(err.fault_kind(), Some(FaultKind::NullResult));
    assert_eq!(transport.send_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_preliminary_wins_over_finite_tier() {
    // The error member would also trip the finite tier; the API rule is checked first.
    let transport = ScriptedTransport::new(vec![body(err(0, "Could not find API nope_api"))]);
    let client = client(&transport, 5);

    let err = client
        .invoke::<Value, _>("nope_api.call", &json!({}))
        .await
        .unwrap_err();

    assert_eq!(err.fault_kind(), Some(FaultKind::ApiNotFound));
    assert_eq!(transport.send_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_waits_period_between_sends() {
    let transport = ScriptedTransport::new(vec![body(NULL_RESULT), body(ok(0, json!(1)))]);
    let client = client(&transport, 5);

    let value: u32 = client.invoke("database_api.get_config", &json!({})).await.unwrap();

    assert_eq!(value, 1);
    let times = transport.sent_at();
    assert!(times[1] - times[0] >= std::time::Duration::from_millis(10));
}

#[tokio::test]
async fn test_transport_failure_is_not_classified() {
    let transport = ScriptedTransport::new(vec![Reply::Refused]);
    let (client, sink) = client_with_sink(&transport, 5);

    let err = client
        .invoke::<Value, _>("database_api.get_config", &json!({}))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(TransportError::ConnectionRefused { .. })));
    assert_eq!(transport.send_count(), 1);
    assert_eq!(sink.count(|e| matches!(e, OverseerEvent::TransportFailed { .. })), 1);
}

#[tokio::test]
async fn test_request_shape() {
    let transport = ScriptedTransport::new(vec![body(ok(0, json!({})))]);
    let client = client(&transport, 0);

    let _: Value = client
        .invoke("database_api.find_accounts", &json!({"accounts": ["alice"]}))
        .await
        .unwrap();

    assert_eq!(
        transport.sent()[0],
        json!({
            "id": 0,
            "jsonrpc": "2.0",
            "method": "database_api.find_accounts",
            "params": {"accounts": ["alice"]}
        })
    );
}

#[tokio::test]
async fn test_close_reaches_transport() {
    let transport = ScriptedTransport::new(vec![]);
    let client = client(&transport, 1);
    client.close().await;
    client.close().await;
    assert_eq!(transport.close_count(), 2);
}

#[test]
fn test_blocking_driver_has_same_semantics() {
    let transport = ScriptedTransport::new(vec![
        body(err(0, DB_LOCK)),
        body(NULL_RESULT),
        body(NULL_RESULT),
    ]);
    let client = blocking_client(&transport, 1);

    let err = client
        .invoke::<Value, _>("database_api.get_config", &json!({}))
        .unwrap_err();

    assert_eq!(err.fault_kind(), Some(FaultKind::NullResult));
    assert_eq!(transport.send_count(), 3);
}

#[test]
fn test_blocking_success() {
    let transport = ScriptedTransport::new(vec![body(ok(0, json!({"chain_id": "beeab0de"})))]);
    let client = blocking_client(&transport, 1);

    let value: Value = client.invoke("database_api.get_version", &()).unwrap();

    assert_eq!(value["chain_id"], "beeab0de");
}

#[tokio::test]
async fn test_concurrent_calls_share_one_client() {
    let transport = ScriptedTransport::new(vec![body(ok(0, json!({"ok": true})))]);
    let client = client(&transport, 2);

    let calls = (0..8).map(|_| {
        let client = client.clone();
        async move { client.invoke::<Value, _>("database_api.get_config", &json!({})).await }
    });
    let results = futures::future::join_all(calls).await;

    assert_eq!(results.len(), 8);
    for result in results {
        assert_eq!(tokio_test::assert_ok!(result)["ok"], true);
    }
    assert_eq!(transport.send_count(), 8);
}

#[tokio::test(start_paused = true)]
async fn test_array_answer_to_single_call_is_retried_then_rejected() {
    let transport = ScriptedTransport::new(vec![body(format!("[{}]", ok(0, json!({}))))]);
    let client = client(&transport, 1);

    let err = client
        .invoke::<Value, _>("database_api.get_config", &json!({}))
        .await
        .unwrap_err();

    assert_eq!(err.fault_kind(), Some(FaultKind::ProxyResponse));
    assert_eq!(transport.send_count(), 2);
}
