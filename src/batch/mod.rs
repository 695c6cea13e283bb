//! 批处理模块：把多个调用合并为一个 JSON-RPC 批量请求。
//!
//! # Request Batching Module
//!
//! Calls registered on a batch are numbered `0..N`, sent as one JSON-RPC
//! array through the overseer and routed back to their [`DeferredResult`]
//! by request id, so the server may answer in any order.
//!
//! ## Fault delivery
//!
//! | Mode | Per-item fault | Whole-batch fault |
//! |------|----------------|-------------------|
//! | [`BatchMode::Eager`] | returned from `send`, later items stay pending | returned from `send` |
//! | [`BatchMode::DelayErrors`] | stored on the item | stored on every item |
//!
//! ## Example
//!
//! ```rust,no_run
//! use beekeepy::client::JsonRpcClient;
//! use serde_json::{json, Value};
//!
//! # async fn run(client: JsonRpcClient) -> beekeepy::Result<()> {
//! let mut batch = client.batch();
//! let props = batch.call::<Value, _>("database_api.get_dynamic_global_properties", &json!({}))?;
//! let version = batch.call::<Value, _>("database_api.get_version", &json!({}))?;
//! batch.send().await?;
//! println!("{} {}", props.get()?, version.get()?);
//! # Ok(())
//! # }
//! ```

mod coordinator;
mod deferred;
mod scope;

pub use coordinator::BatchMode;
pub use deferred::DeferredResult;
pub use scope::{Batch, BlockingBatch};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("batch is empty, nothing to send")]
    NothingToSend,

    #[error("result of request {id} (`{method}`) is not available yet")]
    NotReady { id: u64, method: String },

    #[error("batch response has no item for request {id}")]
    MissingResponse { id: u64 },
}
