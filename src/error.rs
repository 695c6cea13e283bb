use crate::batch::BatchError;
use crate::beekeeper::WalletError;
use crate::overseer::{Fault, FaultKind, GroupedFault};
use crate::transport::TransportError;
use std::sync::Arc;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Endpoint the failing call was addressed to.
    pub url: Option<String>,
    /// JSON-RPC method (e.g., "beekeeper_api.unlock").
    pub method: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "overseer", "batch")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            url: None,
            method: None,
            details: None,
            source: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the client.
///
/// Transport and classification failures arrive here untouched; the wallet
/// facade narrows the ones it recognizes into [`WalletError`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The overseer surrendered. Displays the primary fault; all faults of
    /// the final classification pass are kept for batch correlation.
    #[error("{0}")]
    Fault(Box<GroupedFault>),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Failed to decode result of `{method}`: {message}")]
    Decode { method: String, message: String },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    /// The local service could not be started or did not announce itself.
    #[error("Launch error: {message}{}", format_context(.context))]
    Launch {
        message: String,
        context: ErrorContext,
    },

    /// A defect in the client itself. Never retried and not meant to be
    /// handled by calling code.
    #[error("Invariant violated: {message}{}", format_context(.context))]
    Invariant {
        message: String,
        context: ErrorContext,
    },

    /// An error stored on a deferred batch item and raised on access.
    #[error("{0}")]
    Deferred(Arc<Error>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref url) = ctx.url {
        parts.push(format!("url: {}", url));
    }
    if let Some(ref method) = ctx.method {
        parts.push(format!("method: {}", method));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl From<GroupedFault> for Error {
    fn from(group: GroupedFault) -> Self {
        Error::Fault(Box::new(group))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn launch_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Launch {
            message: msg.into(),
            context,
        }
    }

    /// Create a new invariant error with structured context
    pub fn invariant_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Invariant {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. }
            | Error::Launch { context, .. }
            | Error::Invariant { context, .. } => Some(context),
            Error::Deferred(inner) => inner.context(),
            _ => None,
        }
    }

    /// The grouped faults of a surrendered overseer call, if this is one.
    pub fn grouped_fault(&self) -> Option<&GroupedFault> {
        match self {
            Error::Fault(group) => Some(group),
            Error::Deferred(inner) => inner.grouped_fault(),
            _ => None,
        }
    }

    /// The primary fault of a surrendered overseer call.
    pub fn fault(&self) -> Option<&Fault> {
        self.grouped_fault().map(GroupedFault::primary)
    }

    pub fn fault_kind(&self) -> Option<FaultKind> {
        self.fault().map(|f| f.kind)
    }

    /// Whether this error reports a defect in the client rather than a
    /// condition of the remote side.
    pub fn is_invariant(&self) -> bool {
        match self {
            Error::Invariant { .. } => true,
            Error::Transport(TransportError::NoAttempts { .. }) => true,
            Error::Deferred(inner) => inner.is_invariant(),
            _ => false,
        }
    }
}
