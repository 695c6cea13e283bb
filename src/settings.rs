//! Structured settings shared by transports, overseers and facades.
//!
//! Values come from defaults, an optional YAML document and `BEEKEEPY_*`
//! environment overrides, applied in that order.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Endpoint of the service; discovered at launch when not set.
    pub http_endpoint: Option<Url>,
    /// Attempts per transport send, and the overseer's finite retry budget.
    pub max_retries: u32,
    /// Per-attempt HTTP timeout.
    pub timeout_ms: u64,
    pub period_between_retries_ms: u64,
    /// Cooldown applied by the delay guard after a not-yet-accessible answer.
    pub unlock_cooldown_ms: u64,
    pub guard_poll_interval_ms: u64,
    /// How long to wait for the service to announce its endpoint.
    pub notification_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            http_endpoint: None,
            max_retries: 5,
            timeout_ms: 5_000,
            period_between_retries_ms: 1_000,
            unlock_cooldown_ms: 600,
            guard_poll_interval_ms: 100,
            notification_timeout_ms: 10_000,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid settings document: {}", e),
                ErrorContext::new().with_source("settings"),
            )
        })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text).map_err(|e| match e {
            Error::Configuration { message, context } => Error::Configuration {
                message,
                context: context.with_details(path.display().to_string()),
            },
            other => other,
        })
    }

    /// Apply `BEEKEEPY_*` environment overrides. Unparsable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = env_parse::<Url>("BEEKEEPY_HTTP_ENDPOINT") {
            self.http_endpoint = Some(url);
        }
        if let Some(n) = env_parse("BEEKEEPY_MAX_RETRIES") {
            self.max_retries = n;
        }
        if let Some(ms) = env_parse("BEEKEEPY_TIMEOUT_MS") {
            self.timeout_ms = ms;
        }
        if let Some(ms) = env_parse("BEEKEEPY_PERIOD_BETWEEN_RETRIES_MS") {
            self.period_between_retries_ms = ms;
        }
        self
    }

    pub fn with_http_endpoint(mut self, url: Url) -> Self {
        self.http_endpoint = Some(url);
        self
    }

    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_period_between_retries(mut self, period: Duration) -> Self {
        self.period_between_retries_ms = period.as_millis() as u64;
        self
    }

    pub fn with_unlock_cooldown(mut self, cooldown: Duration) -> Self {
        self.unlock_cooldown_ms = cooldown.as_millis() as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn period_between_retries(&self) -> Duration {
        Duration::from_millis(self.period_between_retries_ms)
    }

    pub fn unlock_cooldown(&self) -> Duration {
        Duration::from_millis(self.unlock_cooldown_ms)
    }

    pub fn guard_poll_interval(&self) -> Duration {
        Duration::from_millis(self.guard_poll_interval_ms)
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_timeout_ms)
    }

    /// The configured endpoint, or a configuration error when none is set.
    pub fn endpoint(&self) -> Result<&Url> {
        self.http_endpoint.as_ref().ok_or_else(|| {
            Error::configuration_with_context(
                "no http endpoint configured",
                ErrorContext::new().with_source("settings"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.period_between_retries(), Duration::from_secs(1));
        assert_eq!(settings.unlock_cooldown(), Duration::from_millis(600));
        assert_eq!(settings.guard_poll_interval(), Duration::from_millis(100));
        assert!(settings.http_endpoint.is_none());
    }

    #[test]
    fn test_yaml_partial_document() {
        let settings = Settings::from_yaml_str(
            "http_endpoint: http://127.0.0.1:8090/\nmax_retries: 2\n",
        )
        .unwrap();
        assert_eq!(settings.max_retries, 2);
        assert_eq!(settings.timeout_ms, 5_000);
        assert_eq!(
            settings.endpoint().unwrap().as_str(),
            "http://127.0.0.1:8090/"
        );
    }

    #[test]
    fn test_yaml_invalid_document() {
        let err = Settings::from_yaml_str("max_retries: lots").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_missing_endpoint_is_configuration_error() {
        let err = Settings::default().endpoint().unwrap_err();
        assert!(err.to_string().contains("no http endpoint"));
    }

    #[test]
    fn test_builder_setters() {
        let settings = Settings::new()
            .with_max_retries(0)
            .with_timeout(Duration::from_millis(250))
            .with_period_between_retries(Duration::ZERO);
        assert_eq!(settings.max_retries, 0);
        assert_eq!(settings.timeout(), Duration::from_millis(250));
        assert_eq!(settings.period_between_retries(), Duration::ZERO);
    }
}
