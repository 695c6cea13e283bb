//! Scripted in-memory transports shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use beekeepy::overseer::{BlockingOverseer, Overseer, OverseerConfig};
use beekeepy::telemetry::InMemoryEventSink;
use beekeepy::transport::{AsyncTransport, BlockingTransport, TransportError};
use beekeepy::{BlockingJsonRpcClient, JsonRpcClient};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

pub const URL: &str = "http://127.0.0.1:8090/";

/// One canned transport outcome.
pub enum Reply {
    Body(String),
    Refused,
}

pub fn body(text: impl Into<String>) -> Reply {
    Reply::Body(text.into())
}

/// Returns scripted replies in order, repeating the last one when the script
/// runs dry, and records what was sent and when.
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<String>>,
    sent: Mutex<Vec<(Instant, Value)>>,
    closed: Mutex<u32>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            closed: Mutex::new(0),
        })
    }

    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().unwrap().iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn sent_at(&self) -> Vec<Instant> {
        self.sent.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn close_count(&self) -> u32 {
        *self.closed.lock().unwrap()
    }

    fn next(&self, url: &Url, body: &str) -> Result<String, TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push((Instant::now(), serde_json::from_str(body).unwrap()));
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Body(text)) => {
                *self.last.lock().unwrap() = Some(text.clone());
                Ok(text)
            }
            Some(Reply::Refused) => Err(TransportError::ConnectionRefused {
                url: url.to_string(),
                message: "connection refused".into(),
            }),
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| TransportError::Other("script exhausted".into())),
        }
    }
}

#[async_trait]
impl AsyncTransport for ScriptedTransport {
    async fn send(&self, url: &Url, body: &str) -> Result<String, TransportError> {
        self.next(url, body)
    }

    async fn close(&self) {
        *self.closed.lock().unwrap() += 1;
    }
}

impl BlockingTransport for ScriptedTransport {
    fn send(&self, url: &Url, body: &str) -> Result<String, TransportError> {
        self.next(url, body)
    }

    fn close(&self) {
        *self.closed.lock().unwrap() += 1;
    }
}

pub fn config(max_retries: u32) -> OverseerConfig {
    OverseerConfig::default()
        .with_max_retries(max_retries)
        .with_period_between_retries(Duration::from_millis(10))
}

pub fn client(transport: &Arc<ScriptedTransport>, max_retries: u32) -> JsonRpcClient {
    let overseer = Overseer::new(transport.clone(), config(max_retries));
    JsonRpcClient::new(Url::parse(URL).unwrap(), overseer)
}

pub fn client_with_sink(
    transport: &Arc<ScriptedTransport>,
    max_retries: u32,
) -> (JsonRpcClient, Arc<InMemoryEventSink>) {
    let sink = Arc::new(InMemoryEventSink::new(1_000));
    let overseer = Overseer::new(transport.clone(), config(max_retries)).with_event_sink(sink.clone());
    (JsonRpcClient::new(Url::parse(URL).unwrap(), overseer), sink)
}

pub fn blocking_client(transport: &Arc<ScriptedTransport>, max_retries: u32) -> BlockingJsonRpcClient {
    let overseer = BlockingOverseer::new(transport.clone(), config(max_retries));
    BlockingJsonRpcClient::new(Url::parse(URL).unwrap(), overseer)
}

pub fn ok(id: u64, result: Value) -> String {
    serde_json::json!({"jsonrpc": "2.0", "id": id, "result": result}).to_string()
}

pub fn err(id: u64, message: &str) -> String {
    serde_json::json!({"jsonrpc": "2.0", "id": id, "error": {"code": -32000, "message": message}})
        .to_string()
}
