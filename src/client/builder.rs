use crate::client::{BlockingJsonRpcClient, JsonRpcClient};
use crate::overseer::{BlockingOverseer, Overseer, OverseerConfig, RuleSet};
use crate::telemetry::EventSink;
use crate::transport::{AsyncTransport, BlockingHttpTransport, BlockingTransport, HttpTransport, TransportConfig};
use crate::{Result, Settings};
use std::sync::Arc;
use url::Url;

/// Builder for clients with custom configuration.
///
/// Keep this surface area small and predictable.
pub struct ClientBuilder {
    settings: Settings,
    endpoint: Option<Url>,
    rules: RuleSet,
    sink: Arc<dyn EventSink>,
    transport: Option<Arc<dyn AsyncTransport>>,
    blocking_transport: Option<Arc<dyn BlockingTransport>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
            endpoint: None,
            rules: RuleSet::standard(),
            sink: crate::telemetry::noop_sink(),
            transport: None,
            blocking_transport: None,
        }
    }

    /// Start from explicit settings instead of the defaults.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Apply `BEEKEEPY_*` environment overrides on top of the current settings.
    pub fn from_env(mut self) -> Self {
        self.settings = self.settings.with_env_overrides();
        self
    }

    /// Override the endpoint from the settings.
    pub fn endpoint(mut self, url: Url) -> Self {
        self.endpoint = Some(url);
        self
    }

    pub fn rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Inject an event sink. Default is a no-op sink.
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Use a custom async transport (primarily for testing).
    pub fn transport(mut self, transport: Arc<dyn AsyncTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn blocking_transport(mut self, transport: Arc<dyn BlockingTransport>) -> Self {
        self.blocking_transport = Some(transport);
        self
    }

    fn resolve_endpoint(&self) -> Result<Url> {
        match &self.endpoint {
            Some(url) => Ok(url.clone()),
            None => self.settings.endpoint().cloned(),
        }
    }

    pub fn build(self) -> Result<JsonRpcClient> {
        let url = self.resolve_endpoint()?;
        let transport: Arc<dyn AsyncTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(TransportConfig::from_settings(&self.settings))),
        };
        let overseer = Overseer::new(transport, OverseerConfig::from_settings(&self.settings))
            .with_event_sink(self.sink);
        Ok(JsonRpcClient::new(url, overseer).with_rules(self.rules))
    }

    pub fn build_blocking(self) -> Result<BlockingJsonRpcClient> {
        let url = self.resolve_endpoint()?;
        let transport: Arc<dyn BlockingTransport> = match self.blocking_transport {
            Some(transport) => transport,
            None => Arc::new(BlockingHttpTransport::new(TransportConfig::from_settings(
                &self.settings,
            ))),
        };
        let overseer = BlockingOverseer::new(transport, OverseerConfig::from_settings(&self.settings))
            .with_event_sink(self.sink);
        Ok(BlockingJsonRpcClient::new(url, overseer).with_rules(self.rules))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
