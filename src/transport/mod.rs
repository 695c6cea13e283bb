//! 传输层：阻塞与异步两种执行模式下的 HTTP 请求发送。
//!
//! # Transport Module
//!
//! Sends a serialized JSON-RPC payload to a URL and returns the raw response
//! text. Two flavors exist with identical semantics:
//!
//! | Trait | Implementation | Suspension |
//! |-------|----------------|------------|
//! | [`AsyncTransport`] | [`HttpTransport`] | `tokio::time::sleep` between attempts |
//! | [`BlockingTransport`] | [`BlockingHttpTransport`] | `std::thread::sleep` between attempts |
//!
//! Both drive the same [`AttemptTracker`], so the attempt accounting, the
//! timeout/refused split and the final error are shared:
//!
//! - timeouts and generic HTTP failures are retried up to `max_retries` attempts
//! - connection refused and out-of-range status codes surface immediately
//! - a tracker that never ran an attempt yields [`TransportError::NoAttempts`]

pub mod http;

pub use http::{BlockingHttpTransport, HttpTransport};

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Knobs shared by both transport flavors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub max_retries: u32,
    pub timeout: Duration,
    pub period_between_retries: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            timeout: Duration::from_secs(5),
            period_between_retries: Duration::from_secs(1),
        }
    }
}

impl TransportConfig {
    pub fn from_settings(settings: &crate::Settings) -> Self {
        Self {
            max_retries: settings.max_retries,
            timeout: settings.timeout(),
            period_between_retries: settings.period_between_retries(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection refused by {url}: {message}")]
    ConnectionRefused { url: String, message: String },

    #[error("Request to {url} timed out after {elapsed:?} (attempt {attempt})")]
    Timeout {
        url: String,
        elapsed: Duration,
        attempt: u32,
    },

    #[error("{url} answered with HTTP {status}; sent: {sent}; received: {received}")]
    Status {
        url: String,
        status: u16,
        sent: String,
        received: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The retry loop finished without recording any outcome, which only
    /// happens when `max_retries` is zero.
    #[error("No attempt was made to reach {url} (max_retries = {max_retries})")]
    NoAttempts { url: String, max_retries: u32 },

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether the attempt loop may try again after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Timeout { .. } | TransportError::Http(_) | TransportError::Other(_)
        )
    }

    /// Map a reqwest failure onto the transport taxonomy.
    pub(crate) fn from_reqwest(err: reqwest::Error, url: &Url, elapsed: Duration, attempt: u32) -> Self {
        if err.is_timeout() {
            return TransportError::Timeout {
                url: url.to_string(),
                elapsed,
                attempt,
            };
        }
        if is_connection_refused(&err) {
            return TransportError::ConnectionRefused {
                url: url.to_string(),
                message: err.to_string(),
            };
        }
        TransportError::Http(err)
    }
}

fn is_connection_refused(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        current = e.source();
    }
    false
}

/// Reject responses outside `200..=299`, keeping both payloads for diagnostics.
pub(crate) fn check_status(
    url: &Url,
    status: u16,
    sent: &str,
    received: String,
) -> Result<String, TransportError> {
    if (200..=299).contains(&status) {
        Ok(received)
    } else {
        Err(TransportError::Status {
            url: url.to_string(),
            status,
            sent: sent.to_string(),
            received,
        })
    }
}

/// Attempt accounting shared by both transport flavors.
#[derive(Debug)]
pub struct AttemptTracker {
    url: String,
    max_retries: u32,
    attempts: u32,
    started: Instant,
    last_error: Option<TransportError>,
}

impl AttemptTracker {
    pub fn new(url: &Url, max_retries: u32) -> Self {
        Self {
            url: url.to_string(),
            max_retries,
            attempts: 0,
            started: Instant::now(),
            last_error: None,
        }
    }

    /// Start the next attempt, returning its 1-based number, or `None` once
    /// the budget is spent.
    pub fn begin(&mut self) -> Option<u32> {
        self.attempts += 1;
        if self.attempts > self.max_retries {
            return None;
        }
        self.started = Instant::now();
        debug!(url = %self.url, attempt = self.attempts, "sending request");
        Some(self.attempts)
    }

    /// Wall-clock time spent in the current attempt.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Record a failed attempt. Non-retryable failures are handed back so the
    /// caller can surface them immediately.
    pub fn record(&mut self, failure: TransportError) -> Result<(), TransportError> {
        if !failure.is_retryable() {
            return Err(failure);
        }
        warn!(
            url = %self.url,
            attempt = self.attempts,
            max_retries = self.max_retries,
            error = %failure,
            "transport attempt failed"
        );
        self.last_error = Some(failure);
        Ok(())
    }

    /// Whether another attempt will follow the current one.
    pub fn has_more(&self) -> bool {
        self.attempts < self.max_retries
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The error to raise once the loop ends without a response.
    pub fn into_error(self) -> TransportError {
        match self.last_error {
            Some(err) => err,
            None => TransportError::NoAttempts {
                url: self.url,
                max_retries: self.max_retries,
            },
        }
    }
}

/// Cooperatively scheduled transport.
#[async_trait]
pub trait AsyncTransport: Send + Sync {
    async fn send(&self, url: &Url, body: &str) -> Result<String, TransportError>;

    /// Release underlying connections. Must be idempotent.
    async fn close(&self) {}
}

/// Thread-blocking transport.
pub trait BlockingTransport: Send + Sync {
    fn send(&self, url: &Url, body: &str) -> Result<String, TransportError>;

    /// Release underlying connections. Must be idempotent.
    fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("http://127.0.0.1:8090").unwrap()
    }

    #[test]
    fn test_tracker_runs_max_retries_attempts() {
        let mut tracker = AttemptTracker::new(&url(), 3);
        let mut seen = Vec::new();
        while let Some(n) = tracker.begin() {
            seen.push(n);
            tracker.record(TransportError::Other("boom".into())).unwrap();
        }
        assert_eq!(seen, vec![1, 2, 3]);
        assert!(matches!(tracker.into_error(), TransportError::Other(m) if m == "boom"));
    }

    #[test]
    fn test_tracker_zero_retries_is_invariant() {
        let mut tracker = AttemptTracker::new(&url(), 0);
        assert!(tracker.begin().is_none());
        assert!(matches!(
            tracker.into_error(),
            TransportError::NoAttempts { max_retries: 0, .. }
        ));
    }

    #[test]
    fn test_refused_is_not_recorded() {
        let mut tracker = AttemptTracker::new(&url(), 5);
        tracker.begin();
        let refused = TransportError::ConnectionRefused {
            url: url().to_string(),
            message: "refused".into(),
        };
        assert!(tracker.record(refused).is_err());
        assert!(tracker.has_more());
    }

    #[test]
    fn test_timeout_is_retryable() {
        let timeout = TransportError::Timeout {
            url: url().to_string(),
            elapsed: Duration::from_millis(1500),
            attempt: 1,
        };
        assert!(timeout.is_retryable());
        assert!(timeout.to_string().contains("timed out"));
    }

    #[test]
    fn test_check_status_range() {
        assert_eq!(check_status(&url(), 200, "{}", "ok".into()).unwrap(), "ok");
        assert_eq!(check_status(&url(), 299, "{}", "ok".into()).unwrap(), "ok");
        let err = check_status(&url(), 502, "{\"id\":0}", "bad gateway".into()).unwrap_err();
        match err {
            TransportError::Status {
                status,
                sent,
                received,
                ..
            } => {
                assert_eq!(status, 502);
                assert_eq!(sent, "{\"id\":0}");
                assert_eq!(received, "bad gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_connection_refused_detected_in_source_chain() {
        #[derive(Debug)]
        struct Wrapper(std::io::Error);
        impl std::fmt::Display for Wrapper {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "connect error")
            }
        }
        impl std::error::Error for Wrapper {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }
        let err = Wrapper(std::io::Error::from(std::io::ErrorKind::ConnectionRefused));
        assert!(is_connection_refused(&err));
        let other = Wrapper(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(!is_connection_refused(&other));
    }
}
