use serde_json::{Map, Value};

/// A response body after JSON decoding. Exactly one shape is populated.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    Single(Map<String, Value>),
    Batch(Vec<Value>),
    /// The body was not a JSON-RPC envelope; the raw text is kept for the
    /// fault that reports it.
    Failure { raw: String, message: String },
}

/// Decode a raw body. Valid JSON that is neither an object nor an array of
/// objects counts as a failure as well.
pub fn parse_response(raw: &str) -> ParsedResponse {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => ParsedResponse::Single(map),
        Ok(Value::Array(items)) => match items.iter().position(|item| !item.is_object()) {
            None => ParsedResponse::Batch(items),
            Some(index) => ParsedResponse::Failure {
                raw: raw.to_string(),
                message: format!("batch item {} is not an object: `{}`", index, items[index]),
            },
        },
        Ok(other) => ParsedResponse::Failure {
            raw: raw.to_string(),
            message: format!("expected a JSON-RPC object or array, got `{}`", other),
        },
        Err(e) => ParsedResponse::Failure {
            raw: raw.to_string(),
            message: e.to_string(),
        },
    }
}

impl ParsedResponse {
    pub fn is_failure(&self) -> bool {
        matches!(self, ParsedResponse::Failure { .. })
    }

    /// JSON form of the response; `None` for a decode failure.
    pub fn as_json(&self) -> Option<Value> {
        match self {
            ParsedResponse::Single(map) => Some(Value::Object(map.clone())),
            ParsedResponse::Batch(items) => Some(Value::Array(items.clone())),
            ParsedResponse::Failure { .. } => None,
        }
    }

    /// Consume into the value handed back on success. A failure becomes `{}`.
    pub fn into_value(self) -> Value {
        match self {
            ParsedResponse::Single(map) => Value::Object(map),
            ParsedResponse::Batch(items) => Value::Array(items),
            ParsedResponse::Failure { .. } => Value::Object(Map::new()),
        }
    }
}

/// `error.message` of a response item, if any.
pub fn error_message(item: &Map<String, Value>) -> Option<&str> {
    item.get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
}

/// The numeric `id` of a response item.
pub fn item_id(item: &Map<String, Value>) -> Option<u64> {
    item.get("id").and_then(Value::as_u64)
}
