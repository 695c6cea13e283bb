use super::coordinator::{BatchCore, BatchMode};
use super::deferred::DeferredResult;
use crate::client::{BlockingJsonRpcClient, JsonRpcClient};
use crate::overseer::RuleSet;
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Batch bound to an async client. Consumed by [`Batch::send`].
pub struct Batch<'c> {
    client: &'c JsonRpcClient,
    rules: RuleSet,
    core: BatchCore,
}

impl<'c> Batch<'c> {
    pub(crate) fn new(client: &'c JsonRpcClient, rules: RuleSet, mode: BatchMode) -> Self {
        Self {
            client,
            rules,
            core: BatchCore::new(mode),
        }
    }

    /// Register a call; its result becomes readable once the batch was sent.
    pub fn call<T, P>(&mut self, method: &str, params: &P) -> Result<DeferredResult<T>>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.core.register(method, params)
    }

    pub fn len(&self) -> usize {
        self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.len() == 0
    }

    pub fn mode(&self) -> BatchMode {
        self.core.mode()
    }

    pub async fn send(self) -> Result<()> {
        let payload = self.core.payload()?;
        debug!(url = %self.client.url(), calls = payload.len(), "sending batch");
        let outcome = self.client.send(payload, &self.rules).await;
        self.core.distribute(outcome)
    }
}

/// Batch bound to a blocking client.
pub struct BlockingBatch<'c> {
    client: &'c BlockingJsonRpcClient,
    rules: RuleSet,
    core: BatchCore,
}

impl<'c> BlockingBatch<'c> {
    pub(crate) fn new(client: &'c BlockingJsonRpcClient, rules: RuleSet, mode: BatchMode) -> Self {
        Self {
            client,
            rules,
            core: BatchCore::new(mode),
        }
    }

    pub fn call<T, P>(&mut self, method: &str, params: &P) -> Result<DeferredResult<T>>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.core.register(method, params)
    }

    pub fn len(&self) -> usize {
        self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.len() == 0
    }

    pub fn send(self) -> Result<()> {
        let payload = self.core.payload()?;
        debug!(url = %self.client.url(), calls = payload.len(), "sending batch");
        let outcome = self.client.send(payload, &self.rules);
        self.core.distribute(outcome)
    }
}
