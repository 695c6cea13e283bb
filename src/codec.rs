//! Typed decoding of JSON-RPC result envelopes.
//!
//! The overseer only guarantees the envelope shape; this is where the
//! `result` member meets a concrete Rust type.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode the `result` member of `envelope` into `T`.
pub fn decode_result<T: DeserializeOwned>(method: &str, envelope: Value) -> Result<T> {
    let result = match envelope {
        Value::Object(mut map) => match map.remove("result") {
            Some(result) => result,
            None => {
                return Err(Error::Decode {
                    method: method.to_string(),
                    message: "response has no `result` member".to_string(),
                })
            }
        },
        other => {
            return Err(Error::Decode {
                method: method.to_string(),
                message: format!("expected a response object, got `{}`", other),
            })
        }
    };
    serde_json::from_value(result).map_err(|e| Error::Decode {
        method: method.to_string(),
        message: e.to_string(),
    })
}

/// Serialize call parameters, turning `()` into an empty object.
pub fn encode_params<P: serde::Serialize + ?Sized>(params: &P) -> Result<Value> {
    let value = serde_json::to_value(params)?;
    Ok(match value {
        Value::Null => Value::Object(Default::default()),
        other => other,
    })
}
