use super::{check_status, AsyncTransport, AttemptTracker, BlockingTransport, TransportConfig, TransportError};
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Build the client on first use, keeping whichever instance won a race.
fn lazily<C>(slot: &ArcSwapOption<C>, build: impl FnOnce() -> Result<C, TransportError>) -> Result<Arc<C>, TransportError> {
    if let Some(client) = slot.load_full() {
        return Ok(client);
    }
    let built = Arc::new(build()?);
    let previous = slot.rcu(|current| match current {
        Some(existing) => Some(Arc::clone(existing)),
        None => Some(Arc::clone(&built)),
    });
    Ok(previous.unwrap_or(built))
}

/// JSON-RPC over HTTP POST using `reqwest::Client`.
pub struct HttpTransport {
    config: TransportConfig,
    client: ArcSwapOption<reqwest::Client>,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            client: ArcSwapOption::empty(),
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Whether the underlying connection pool currently exists.
    pub fn is_connected(&self) -> bool {
        self.client.load().is_some()
    }

    fn client(&self) -> Result<Arc<reqwest::Client>, TransportError> {
        lazily(&self.client, || {
            reqwest::Client::builder()
                .timeout(self.config.timeout)
                .build()
                .map_err(|e| TransportError::Other(e.to_string()))
        })
    }

    async fn attempt(
        &self,
        client: &reqwest::Client,
        url: &Url,
        body: &str,
        tracker: &AttemptTracker,
    ) -> Result<String, TransportError> {
        let attempt = tracker.attempts();
        let response = client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_owned())
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(e, url, tracker.elapsed(), attempt))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(e, url, tracker.elapsed(), attempt))?;
        check_status(url, status, body, text)
    }
}

#[async_trait]
impl AsyncTransport for HttpTransport {
    async fn send(&self, url: &Url, body: &str) -> Result<String, TransportError> {
        let client = self.client()?;
        let mut tracker = AttemptTracker::new(url, self.config.max_retries);
        while tracker.begin().is_some() {
            match self.attempt(&client, url, body, &tracker).await {
                Ok(text) => return Ok(text),
                Err(failure) => tracker.record(failure)?,
            }
            if tracker.has_more() {
                tokio::time::sleep(self.config.period_between_retries).await;
            }
        }
        Err(tracker.into_error())
    }

    async fn close(&self) {
        if self.client.swap(None).is_some() {
            debug!("http transport closed");
        }
    }
}

/// Blocking twin of [`HttpTransport`] built on `reqwest::blocking::Client`.
///
/// The blocking client owns its own runtime; create, use and drop it outside
/// of an async context.
pub struct BlockingHttpTransport {
    config: TransportConfig,
    client: ArcSwapOption<reqwest::blocking::Client>,
}

impl BlockingHttpTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            client: ArcSwapOption::empty(),
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.client.load().is_some()
    }

    fn client(&self) -> Result<Arc<reqwest::blocking::Client>, TransportError> {
        lazily(&self.client, || {
            reqwest::blocking::Client::builder()
                .timeout(self.config.timeout)
                .build()
                .map_err(|e| TransportError::Other(e.to_string()))
        })
    }

    fn attempt(
        &self,
        client: &reqwest::blocking::Client,
        url: &Url,
        body: &str,
        tracker: &AttemptTracker,
    ) -> Result<String, TransportError> {
        let attempt = tracker.attempts();
        let response = client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_owned())
            .send()
            .map_err(|e| TransportError::from_reqwest(e, url, tracker.elapsed(), attempt))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .map_err(|e| TransportError::from_reqwest(e, url, tracker.elapsed(), attempt))?;
        check_status(url, status, body, text)
    }
}

impl BlockingTransport for BlockingHttpTransport {
    fn send(&self, url: &Url, body: &str) -> Result<String, TransportError> {
        let client = self.client()?;
        let mut tracker = AttemptTracker::new(url, self.config.max_retries);
        while tracker.begin().is_some() {
            match self.attempt(&client, url, body, &tracker) {
                Ok(text) => return Ok(text),
                Err(failure) => tracker.record(failure)?,
            }
            if tracker.has_more() {
                std::thread::sleep(self.config.period_between_retries);
            }
        }
        Err(tracker.into_error())
    }

    fn close(&self) {
        if self.client.swap(None).is_some() {
            debug!("blocking http transport closed");
        }
    }
}
