use crate::batch::{Batch, BatchMode};
use crate::codec::{decode_result, encode_params};
use crate::overseer::{Overseer, OverseerConfig, RequestPayload, RuleSet};
use crate::transport::{HttpTransport, TransportConfig};
use crate::{Result, Settings};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Async JSON-RPC client bound to one endpoint.
///
/// Cloning is cheap; clones share the overseer and its transport.
#[derive(Clone)]
pub struct JsonRpcClient {
    url: Url,
    overseer: Arc<Overseer>,
    rules: RuleSet,
}

impl JsonRpcClient {
    pub fn new(url: Url, overseer: Overseer) -> Self {
        Self {
            url,
            overseer: Arc::new(overseer),
            rules: RuleSet::standard(),
        }
    }

    /// HTTP client for the endpoint named in `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(TransportConfig::from_settings(settings)));
        let overseer = Overseer::new(transport, OverseerConfig::from_settings(settings));
        Ok(Self::new(settings.endpoint()?.clone(), overseer))
    }

    /// Replace the rule set used for every call made through this client.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn overseer(&self) -> &Overseer {
        &self.overseer
    }

    /// Call `method` and decode its `result` member.
    pub async fn invoke<T, P>(&self, method: &str, params: &P) -> Result<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.invoke_with_rules(method, params, &RuleSet::new()).await
    }

    /// Like [`invoke`](Self::invoke) with `extra` rules appended to each tier.
    pub async fn invoke_with_rules<T, P>(&self, method: &str, params: &P, extra: &RuleSet) -> Result<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let params = encode_params(params)?;
        debug!(url = %self.url, method, "invoking");
        let rules = self.rules.clone().extended_with(extra);
        let envelope = self.send(RequestPayload::single(method, params), &rules).await?;
        decode_result(method, envelope)
    }

    /// Send a prepared payload and return the accepted envelope untouched.
    pub async fn send(&self, request: RequestPayload, rules: &RuleSet) -> Result<Value> {
        self.overseer.send(&self.url, request, rules).await
    }

    /// Start a batch whose first fault is returned from `send`.
    pub fn batch(&self) -> Batch<'_> {
        self.batch_with(BatchMode::Eager, &RuleSet::new())
    }

    /// Start a batch that stores faults on the items they belong to.
    pub fn batch_with_delayed_errors(&self) -> Batch<'_> {
        self.batch_with(BatchMode::DelayErrors, &RuleSet::new())
    }

    pub fn batch_with(&self, mode: BatchMode, extra: &RuleSet) -> Batch<'_> {
        Batch::new(self, self.rules.clone().extended_with(extra), mode)
    }

    /// Release the underlying connection. Safe to call repeatedly.
    pub async fn close(&self) {
        self.overseer.close().await;
    }
}

impl std::fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcClient")
            .field("url", &self.url.as_str())
            .field("config", self.overseer.config())
            .finish()
    }
}
