use crate::batch::{BatchMode, BlockingBatch};
use crate::codec::{decode_result, encode_params};
use crate::overseer::{BlockingOverseer, OverseerConfig, RequestPayload, RuleSet};
use crate::transport::{BlockingHttpTransport, TransportConfig};
use crate::{Result, Settings};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Thread-blocking twin of [`JsonRpcClient`](super::JsonRpcClient).
///
/// Must not be used from inside an async runtime; the underlying HTTP
/// client blocks the calling thread.
#[derive(Clone)]
pub struct BlockingJsonRpcClient {
    url: Url,
    overseer: Arc<BlockingOverseer>,
    rules: RuleSet,
}

impl BlockingJsonRpcClient {
    pub fn new(url: Url, overseer: BlockingOverseer) -> Self {
        Self {
            url,
            overseer: Arc::new(overseer),
            rules: RuleSet::standard(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let transport = Arc::new(BlockingHttpTransport::new(TransportConfig::from_settings(settings)));
        let overseer = BlockingOverseer::new(transport, OverseerConfig::from_settings(settings));
        Ok(Self::new(settings.endpoint()?.clone(), overseer))
    }

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

    pub fn invoke<T, P>(&self, method: &str, params: &P) -> Result<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.invoke_with_rules(method, params, &RuleSet::new())
    }

    pub fn invoke_with_rules<T, P>(&self, method: &str, params: &P, extra: &RuleSet) -> Result<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let params = encode_params(params)?;
        debug!(url = %self.url, method, "invoking");
        let rules = self.rules.clone().extended_with(extra);
        let envelope = self.send(RequestPayload::single(method, params), &rules)?;
        decode_result(method, envelope)
    }

    pub fn send(&self, request: RequestPayload, rules: &RuleSet) -> Result<Value> {
        self.overseer.send(&self.url, request, rules)
    }

    pub fn batch(&self) -> BlockingBatch<'_> {
        self.batch_with(BatchMode::Eager, &RuleSet::new())
    }

    pub fn batch_with_delayed_errors(&self) -> BlockingBatch<'_> {
        self.batch_with(BatchMode::DelayErrors, &RuleSet::new())
    }

    pub fn batch_with(&self, mode: BatchMode, extra: &RuleSet) -> BlockingBatch<'_> {
        BlockingBatch::new(self, self.rules.clone().extended_with(extra), mode)
    }

    pub fn close(&self) {
        self.overseer.close();
    }
}

impl std::fmt::Debug for BlockingJsonRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingJsonRpcClient")
            .field("url", &self.url.as_str())
            .field("config", self.overseer.config())
            .finish()
    }
}
