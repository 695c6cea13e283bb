use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// One JSON-RPC 2.0 call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub id: u64,
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// What goes on the wire for one overseer call: a single request or a batch
/// whose ids run `0..N` in registration order.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestPayload {
    Single(JsonRpcRequest),
    Batch(Vec<JsonRpcRequest>),
}

impl RequestPayload {
    /// A single request with id 0.
    pub fn single(method: impl Into<String>, params: Value) -> Self {
        RequestPayload::Single(JsonRpcRequest::new(0, method, params))
    }

    /// A batch from `(method, params)` pairs, numbered sequentially from 0.
    pub fn batch<I, M>(calls: I) -> Self
    where
        I: IntoIterator<Item = (M, Value)>,
        M: Into<String>,
    {
        RequestPayload::Batch(
            calls
                .into_iter()
                .enumerate()
                .map(|(id, (method, params))| JsonRpcRequest::new(id as u64, method, params))
                .collect(),
        )
    }

    pub fn requests(&self) -> &[JsonRpcRequest] {
        match self {
            RequestPayload::Single(request) => std::slice::from_ref(request),
            RequestPayload::Batch(requests) => requests,
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, RequestPayload::Batch(_))
    }

    pub fn len(&self) -> usize {
        self.requests().len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests().is_empty()
    }

    pub fn contains_id(&self, id: u64) -> bool {
        self.requests().iter().any(|r| r.id == id)
    }

    /// Method of the request carrying `id`. A single request answers for any
    /// id, since the server echoes whatever it was given.
    pub fn method_for(&self, id: Option<u64>) -> Option<&str> {
        match (self, id) {
            (RequestPayload::Single(request), _) => Some(request.method.as_str()),
            (RequestPayload::Batch(requests), Some(id)) => requests
                .iter()
                .find(|r| r.id == id)
                .map(|r| r.method.as_str()),
            (RequestPayload::Batch(_), None) => None,
        }
    }

    /// Serialized body: an object for a single call, an array for a batch.
    pub fn to_body(&self) -> serde_json::Result<String> {
        match self {
            RequestPayload::Single(request) => serde_json::to_string(request),
            RequestPayload::Batch(requests) => serde_json::to_string(requests),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RequestPayload::Single(request) => serde_json::to_value(request).unwrap_or(Value::Null),
            RequestPayload::Batch(requests) => serde_json::to_value(requests).unwrap_or(Value::Null),
        }
    }
}
