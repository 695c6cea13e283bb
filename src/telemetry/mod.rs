//! 遥测模块：监督者事件与日志初始化。
//!
//! Telemetry Module.
//!
//! ## Overview
//!
//! The overseer reports every decision it takes to an [`EventSink`]. Sinks are
//! synchronous so the blocking and the async drivers can share them. Nothing
//! is collected unless the application installs a sink.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`OverseerEvent`] | Typed event enum |
//! | [`EventSink`] | Trait for event destinations |
//! | [`NoopEventSink`] | Default no-op sink |
//! | [`InMemoryEventSink`] | In-memory sink for testing |
//! | [`init_tracing`] | Installs a `tracing` subscriber filtered by `BEEKEEPY_LOG` |

use crate::overseer::{FaultKind, Tier};
use std::sync::{Arc, RwLock};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq)]
pub enum OverseerEvent {
    Sent {
        url: String,
        attempt: u32,
    },
    Retrying {
        url: String,
        tier: Tier,
        fault: FaultKind,
        remaining: i64,
    },
    Surrendered {
        url: String,
        fault: FaultKind,
        attempts: u32,
    },
    Succeeded {
        url: String,
        attempts: u32,
    },
    TransportFailed {
        url: String,
        message: String,
    },
}

impl OverseerEvent {
    pub fn url(&self) -> &str {
        match self {
            OverseerEvent::Sent { url, .. }
            | OverseerEvent::Retrying { url, .. }
            | OverseerEvent::Surrendered { url, .. }
            | OverseerEvent::Succeeded { url, .. }
            | OverseerEvent::TransportFailed { url, .. } => url,
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: OverseerEvent);
}

/// Drops every event.
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: OverseerEvent) {}
}

pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoopEventSink)
}

/// In-memory sink for testing.
pub struct InMemoryEventSink {
    events: RwLock<Vec<OverseerEvent>>,
    max_events: usize,
}

impl InMemoryEventSink {
    pub fn new(max: usize) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            max_events: max,
        }
    }

    pub fn events(&self) -> Vec<OverseerEvent> {
        self.events.read().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn count(&self, predicate: impl Fn(&OverseerEvent) -> bool) -> usize {
        self.events
            .read()
            .map(|e| e.iter().filter(|ev| predicate(ev)).count())
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.write() {
            events.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.events.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for InMemoryEventSink {
    fn emit(&self, event: OverseerEvent) {
        if let Ok(mut events) = self.events.write() {
            events.push(event);
            if events.len() > self.max_events {
                events.remove(0);
            }
        }
    }
}

/// Install a fmt subscriber. The filter comes from `BEEKEEPY_LOG`, then
/// `RUST_LOG`, then defaults to `info`. Safe to call more than once.
pub fn init_tracing() {
    let filter = std::env::var("BEEKEEPY_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
