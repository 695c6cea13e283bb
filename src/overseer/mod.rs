//! 请求监督模块：发送、分类响应、决定重试或放弃。
//!
//! # Request Overseeing Module
//!
//! Sends one JSON-RPC payload, classifies the raw response against a
//! [`RuleSet`] and decides whether to succeed, retry or surrender.
//!
//! ## Tiers
//!
//! | Tier | Example | Control flow |
//! |------|---------|--------------|
//! | preliminary | unparsable body, unknown API | surrender with the first fault |
//! | infinitely repeatable | database lock contention | retry, budget reset to `max_retries` |
//! | finitely repeatable | error member, null result, batch size mismatch | retry while budget lasts |
//!
//! Tiers are evaluated in that order and the first rule that reports anything
//! decides the pass.
//!
//! ## Drivers
//!
//! [`OverseerMachine`] holds the whole decision logic and never blocks.
//! [`Overseer`] and [`BlockingOverseer`] wrap it with a transport and the
//! matching sleep primitive.
//!
//! ```rust,no_run
//! use beekeepy::overseer::{Overseer, OverseerConfig, RequestPayload, RuleSet};
//! use beekeepy::transport::{HttpTransport, TransportConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> beekeepy::Result<()> {
//! let transport = Arc::new(HttpTransport::new(TransportConfig::default()));
//! let overseer = Overseer::new(transport, OverseerConfig::default());
//! let url = url::Url::parse("http://127.0.0.1:8090")?;
//! let request = RequestPayload::single("database_api.get_config", serde_json::json!({}));
//! let envelope = overseer.send(&url, request, &RuleSet::standard()).await?;
//! # Ok(())
//! # }
//! ```

mod driver;
mod fault;
mod machine;
mod request;
mod response;
mod rule_set;
pub mod rules;

pub use driver::{BlockingOverseer, Overseer, OverseerConfig};
pub use fault::{Fault, FaultKind, GroupedFault};
pub use machine::{decide, Decision, OverseerMachine, OverseerState, RetryBudget};
pub use request::{JsonRpcRequest, RequestPayload, JSONRPC_VERSION};
pub use response::{error_message, item_id, parse_response, ParsedResponse};
pub use rule_set::{Classification, InstantiatedRuleSet, RuleSet, Tier};
pub use rules::{Rule, RuleContext, RuleFactory};
