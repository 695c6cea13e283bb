//! Out-of-band notifications a locally started service sends about itself.
//!
//! Only used to discover the HTTP endpoint before the first call; never part
//! of the request path.

use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use futures::{future, stream, Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};
use url::Url;

/// Event name announcing the HTTP listener.
pub const HTTP_LISTENING: &str = "webserver http listening";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Notification {
    pub name: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub value: Value,
}

#[derive(Deserialize)]
struct NotifyCall {
    method: String,
    params: Notification,
}

impl Notification {
    /// Parse the body of a JSON-RPC `notify` call.
    pub fn from_jsonrpc(body: &str) -> Result<Self> {
        let call: NotifyCall = serde_json::from_str(body)?;
        if call.method != "notify" {
            return Err(Error::Decode {
                method: call.method,
                message: "not a notification".to_string(),
            });
        }
        Ok(call.params)
    }

    /// The announced endpoint, for `webserver http listening` events.
    pub fn http_endpoint(&self) -> Option<Url> {
        if self.name != HTTP_LISTENING {
            return None;
        }
        let kind = self.value.get("type").and_then(Value::as_str).unwrap_or("HTTP");
        if !kind.eq_ignore_ascii_case("http") {
            return None;
        }
        let port = self.value.get("port").and_then(Value::as_u64)?;
        let address = match self.value.get("address").and_then(Value::as_str) {
            None | Some("0.0.0.0") => "127.0.0.1",
            Some(address) => address,
        };
        Url::parse(&format!("http://{}:{}", address, port)).ok()
    }
}

#[async_trait]
pub trait NotificationSource: Send {
    /// The next notification, or `None` once the source is exhausted.
    async fn next(&mut self) -> Option<Notification>;

    /// Where the service should send its notifications, if this source listens.
    fn endpoint(&self) -> Option<Url> {
        None
    }
}

/// Feeds a [`ChannelNotificationSource`], e.g. from an HTTP handler or a test.
#[derive(Debug, Clone)]
pub struct NotificationSender {
    tx: mpsc::Sender<Notification>,
}

impl NotificationSender {
    pub async fn send(&self, notification: Notification) -> bool {
        self.tx.send(notification).await.is_ok()
    }

    /// Parse and forward a raw `notify` call body.
    pub async fn send_raw(&self, body: &str) -> Result<bool> {
        let notification = Notification::from_jsonrpc(body)?;
        Ok(self.send(notification).await)
    }
}

pub struct ChannelNotificationSource {
    rx: mpsc::Receiver<Notification>,
    endpoint: Option<Url>,
}

impl ChannelNotificationSource {
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }
}

pub fn channel(capacity: usize) -> (NotificationSender, ChannelNotificationSource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        NotificationSender { tx },
        ChannelNotificationSource { rx, endpoint: None },
    )
}

#[async_trait]
impl NotificationSource for ChannelNotificationSource {
    async fn next(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    fn endpoint(&self) -> Option<Url> {
        self.endpoint.clone()
    }
}

/// Adapt a source into a stream that ends when the source does.
pub fn notifications<'a>(
    source: &'a mut dyn NotificationSource,
) -> impl Stream<Item = Notification> + 'a {
    stream::unfold(source, |source| async move {
        let notification = NotificationSource::next(&mut *source).await?;
        Some((notification, source))
    })
}

/// Wait until the service announces its HTTP listener.
pub async fn wait_for_http_endpoint(
    source: &mut dyn NotificationSource,
    timeout: Duration,
) -> Result<Url> {
    let endpoints = notifications(source).filter_map(|notification| {
        debug!(name = %notification.name, "notification received");
        future::ready(notification.http_endpoint())
    });
    futures::pin_mut!(endpoints);
    match tokio::time::timeout(timeout, endpoints.next()).await {
        Ok(Some(url)) => {
            info!(url = %url, "service is listening");
            Ok(url)
        }
        Ok(None) => Err(Error::launch_with_context(
            "notification source closed before the endpoint was announced",
            ErrorContext::new().with_source("notification"),
        )),
        Err(_) => Err(Error::launch_with_context(
            format!("endpoint not announced within {:?}", timeout),
            ErrorContext::new().with_source("notification"),
        )),
    }
}
