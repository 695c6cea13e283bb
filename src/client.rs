//! JSON-RPC clients: typed calls and batches on top of the overseer.
//!
//! Implementation details are split into submodules under `src/client/`.

pub mod blocking;
pub mod builder;
pub mod core;

pub use blocking::BlockingJsonRpcClient;
pub use builder::ClientBuilder;
pub use core::JsonRpcClient;
