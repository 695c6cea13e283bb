//! # beekeepy
//!
//! 面向 beekeeper 钱包服务与 hived 节点的 JSON-RPC 客户端，负责响应监督、批处理与重试控制。
//!
//! JSON-RPC client for the beekeeper wallet service and hived nodes.
//!
//! ## Overview
//!
//! Every call goes through an overseer that classifies the raw response
//! against a tiered rule set and decides whether to accept it, retry it or
//! give up. Batches share the same path and route results back to
//! per-call [`batch::DeferredResult`] cells by request id.
//!
//! ## Key Features
//!
//! - **Overseer**: one pure decision core ([`overseer::OverseerMachine`]) with
//!   async and blocking drivers
//! - **Rules**: preliminary, infinitely repeatable and finitely repeatable tiers
//! - **Batching**: single network round trip, eager or delayed fault delivery
//! - **Wallet facade**: sessions, wallets and keys with typed wallet errors
//! - **Delay guard**: cooldown between rejected wallet unlocks
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use beekeepy::{hived::HivedClient, Settings};
//!
//! #[tokio::main]
//! async fn main() -> beekeepy::Result<()> {
//!     beekeepy::telemetry::init_tracing();
//!     let settings = Settings::default()
//!         .with_http_endpoint("https://api.hive.blog".parse()?)
//!         .with_env_overrides();
//!     let node = HivedClient::from_settings(&settings)?;
//!     let props = node.get_dynamic_global_properties().await?;
//!     println!("head block {}", props.head_block_number);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`transport`] | HTTP transports with bounded attempts |
//! | [`overseer`] | Rules, classification and the retry state machine |
//! | [`client`] | Typed JSON-RPC clients and builder |
//! | [`batch`] | Batch coordinator and deferred results |
//! | [`delay_guard`] | Cooldown guard for settling operations |
//! | [`beekeeper`] | Session and wallet facade |
//! | [`hived`] | Node `database_api` facade |
//! | [`process`] / [`notification`] | Launching a local service and discovering its endpoint |
//! | [`telemetry`] | Overseer events and tracing setup |

pub mod api;
pub mod batch;
pub mod beekeeper;
pub mod client;
pub mod codec;
pub mod delay_guard;
pub mod error;
pub mod hived;
pub mod notification;
pub mod overseer;
pub mod process;
pub mod settings;
pub mod telemetry;
pub mod transport;

pub use batch::{Batch, BatchError, BatchMode, BlockingBatch, DeferredResult};
pub use beekeeper::{Beekeeper, Session, UnlockedWallet, Wallet, WalletError};
pub use client::{BlockingJsonRpcClient, ClientBuilder, JsonRpcClient};
pub use delay_guard::DelayGuard;
pub use error::{Error, ErrorContext};
pub use overseer::{Fault, FaultKind, GroupedFault, RuleSet};
pub use settings::Settings;

/// Result type alias for the library.
pub type Result<T> = std::result::Result<T, Error>;
