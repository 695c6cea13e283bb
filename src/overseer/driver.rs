use super::machine::{Decision, OverseerMachine};
use super::request::RequestPayload;
use super::rule_set::RuleSet;
use crate::telemetry::{noop_sink, EventSink, OverseerEvent};
use crate::transport::{AsyncTransport, BlockingTransport, TransportError};
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverseerConfig {
    /// Retry budget of the finitely repeatable tier.
    pub max_retries: u32,
    pub period_between_retries: Duration,
}

impl Default for OverseerConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            period_between_retries: Duration::from_secs(1),
        }
    }
}

impl OverseerConfig {
    pub fn from_settings(settings: &crate::Settings) -> Self {
        Self {
            max_retries: settings.max_retries,
            period_between_retries: settings.period_between_retries(),
        }
    }

    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn with_period_between_retries(mut self, period: Duration) -> Self {
        self.period_between_retries = period;
        self
    }
}

fn prepare(url: &Url, request: RequestPayload, rules: &RuleSet, max_retries: u32) -> Result<(String, OverseerMachine)> {
    let body = request.to_body()?;
    let machine = OverseerMachine::new(rules.instantiate(url, Arc::new(request)), max_retries);
    Ok((body, machine))
}

fn report(sink: &dyn EventSink, url: &Url, machine: &OverseerMachine, decision: &Decision) {
    let url_str = url.to_string();
    match decision {
        Decision::Succeed(_) => {
            debug!(url = %url, attempts = machine.attempts(), "response accepted");
            sink.emit(OverseerEvent::Succeeded {
                url: url_str,
                attempts: machine.attempts(),
            });
        }
        Decision::Retry {
            tier,
            remaining,
            fault,
        } => {
            debug!(url = %url, tier = %tier, fault = %fault, remaining, "retrying request");
            sink.emit(OverseerEvent::Retrying {
                url: url_str,
                tier: *tier,
                fault: *fault,
                remaining: *remaining,
            });
        }
        Decision::Surrender(group) => {
            info!(
                url = %url,
                attempts = machine.attempts(),
                fault = %group.primary().kind,
                faults = group.faults().len(),
                "giving up on request"
            );
            sink.emit(OverseerEvent::Surrendered {
                url: url_str,
                fault: group.primary().kind,
                attempts: machine.attempts(),
            });
        }
    }
}

fn transport_failed(sink: &dyn EventSink, url: &Url, machine: &mut OverseerMachine, err: &TransportError) {
    machine.abort();
    warn!(url = %url, error = %err, "transport failed");
    sink.emit(OverseerEvent::TransportFailed {
        url: url.to_string(),
        message: err.to_string(),
    });
}

/// Send/classify/retry loop for the cooperatively scheduled flavor.
pub struct Overseer {
    transport: Arc<dyn AsyncTransport>,
    config: OverseerConfig,
    sink: Arc<dyn EventSink>,
}

impl Overseer {
    pub fn new(transport: Arc<dyn AsyncTransport>, config: OverseerConfig) -> Self {
        Self {
            transport,
            config,
            sink: noop_sink(),
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &OverseerConfig {
        &self.config
    }

    /// Send `request` until `rules` accept the response or give up.
    pub async fn send(&self, url: &Url, request: RequestPayload, rules: &RuleSet) -> Result<Value> {
        let (body, mut machine) = prepare(url, request, rules, self.config.max_retries)?;
        loop {
            let attempt = machine.begin_send()?;
            self.sink.emit(OverseerEvent::Sent {
                url: url.to_string(),
                attempt,
            });
            let raw = match self.transport.send(url, &body).await {
                Ok(raw) => raw,
                Err(err) => {
                    transport_failed(self.sink.as_ref(), url, &mut machine, &err);
                    return Err(err.into());
                }
            };
            let decision = machine.on_response(&raw)?;
            report(self.sink.as_ref(), url, &machine, &decision);
            match decision {
                Decision::Succeed(value) => return Ok(value),
                Decision::Surrender(group) => return Err(group.into()),
                Decision::Retry { .. } => tokio::time::sleep(self.config.period_between_retries).await,
            }
        }
    }

    pub async fn close(&self) {
        self.transport.close().await;
    }
}

/// Thread-blocking twin of [`Overseer`].
pub struct BlockingOverseer {
    transport: Arc<dyn BlockingTransport>,
    config: OverseerConfig,
    sink: Arc<dyn EventSink>,
}

impl BlockingOverseer {
    pub fn new(transport: Arc<dyn BlockingTransport>, config: OverseerConfig) -> Self {
        Self {
            transport,
            config,
            sink: noop_sink(),
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &OverseerConfig {
        &self.config
    }

    pub fn send(&self, url: &Url, request: RequestPayload, rules: &RuleSet) -> Result<Value> {
        let (body, mut machine) = prepare(url, request, rules, self.config.max_retries)?;
        loop {
            let attempt = machine.begin_send()?;
            self.sink.emit(OverseerEvent::Sent {
                url: url.to_string(),
                attempt,
            });
            let raw = match self.transport.send(url, &body) {
                Ok(raw) => raw,
                Err(err) => {
                    transport_failed(self.sink.as_ref(), url, &mut machine, &err);
                    return Err(err.into());
                }
            };
            let decision = machine.on_response(&raw)?;
            report(self.sink.as_ref(), url, &machine, &decision);
            match decision {
                Decision::Succeed(value) => return Ok(value),
                Decision::Surrender(group) => return Err(group.into()),
                Decision::Retry { .. } => std::thread::sleep(self.config.period_between_retries),
            }
        }
    }

    pub fn close(&self) {
        self.transport.close();
    }
}
