//! 钱包服务门面：会话、钱包与密钥操作。
//!
//! # Wallet Service Facade
//!
//! Typed access to `beekeeper_api` on top of [`JsonRpcClient`]. Every call is
//! made with the wallet rules added to the preliminary tier, so callers see
//! a [`WalletError`] such as "already unlocked" instead of a raw fault.
//!
//! | Type | Role |
//! |------|------|
//! | [`Beekeeper`] | connection to a running (or locally launched) service |
//! | [`Session`] | token-bound session, wallet listing, batch status |
//! | [`Wallet`] | open/close/lock/unlock of one wallet |
//! | [`UnlockedWallet`] | key import, signing, encryption |
//!
//! ```rust,no_run
//! use beekeepy::beekeeper::Beekeeper;
//! use beekeepy::Settings;
//!
//! # async fn run() -> beekeepy::Result<()> {
//! let settings = Settings::default().with_http_endpoint("http://127.0.0.1:8090".parse()?);
//! let beekeeper = Beekeeper::connect(&settings)?;
//! let session = beekeeper.create_session().await?;
//! let (wallet, password) = session.create_wallet("alice", None).await?;
//! let public_key = wallet.import_key("5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3").await?;
//! println!("{} {}", password, public_key);
//! # Ok(())
//! # }
//! ```

mod rules;
mod session;
mod types;
mod wallet;

pub use rules::{
    cannot_open_wallet, invalid_password, not_yet_accessible, translate, wallet_already_unlocked,
    wallet_rules, WalletError,
};
pub use session::Session;
pub use types::{SessionInfo, SessionStatus, WalletDetails};
pub use wallet::{UnlockedWallet, Wallet};

use crate::api::BEEKEEPER_API;
use crate::client::JsonRpcClient;
use crate::delay_guard::{DelayGuard, DelayGuardConfig};
use crate::notification::{wait_for_http_endpoint, NotificationSource};
use crate::process::ProcessController;
use crate::{Result, Settings};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use types::{CreateSessionParams, CreateSessionResult};
use url::Url;

/// Connection to a wallet service.
pub struct Beekeeper {
    client: JsonRpcClient,
    settings: Settings,
    guard: Arc<DelayGuard>,
    notifications_endpoint: Option<Url>,
    process: Option<Box<dyn ProcessController>>,
}

impl Beekeeper {
    pub fn new(client: JsonRpcClient, settings: Settings) -> Self {
        let guard = Arc::new(DelayGuard::new(DelayGuardConfig::from_settings(&settings)));
        Self {
            client,
            settings,
            guard,
            notifications_endpoint: None,
            process: None,
        }
    }

    /// Connect to an already running service at the configured endpoint.
    pub fn connect(settings: &Settings) -> Result<Self> {
        Ok(Self::new(JsonRpcClient::from_settings(settings)?, settings.clone()))
    }

    /// Start a local service and connect once it announces its endpoint.
    pub async fn launch(
        mut controller: Box<dyn ProcessController>,
        source: &mut dyn NotificationSource,
        args: &[String],
        settings: Settings,
    ) -> Result<Self> {
        let notifications_endpoint = source.endpoint();
        let mut args = args.to_vec();
        if let Some(endpoint) = &notifications_endpoint {
            args.push(format!("--notifications-endpoint={}", endpoint_address(endpoint)));
        }
        controller.run(&args, &HashMap::new()).await?;
        let url = match wait_for_http_endpoint(source, settings.notification_timeout()).await {
            Ok(url) => url,
            Err(err) => {
                if let Err(close_err) = controller.close(settings.timeout()).await {
                    warn!(error = %close_err, "failed to stop wallet service after launch error");
                }
                return Err(err);
            }
        };
        info!(url = %url, "wallet service launched");
        let settings = settings.with_http_endpoint(url);
        let mut beekeeper = Self::connect(&settings)?;
        beekeeper.notifications_endpoint = notifications_endpoint;
        beekeeper.process = Some(controller);
        Ok(beekeeper)
    }

    pub fn client(&self) -> &JsonRpcClient {
        &self.client
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn url(&self) -> &Url {
        self.client.url()
    }

    /// Create a session with a random salt.
    pub async fn create_session(&self) -> Result<Session> {
        let salt = uuid::Uuid::new_v4().simple().to_string();
        self.create_session_with_salt(&salt).await
    }

    pub async fn create_session_with_salt(&self, salt: &str) -> Result<Session> {
        let endpoint = self.notifications_endpoint.as_ref().map(endpoint_address);
        let params = CreateSessionParams {
            salt,
            notifications_endpoint: endpoint.as_deref(),
        };
        let created: CreateSessionResult = self
            .client
            .invoke(&BEEKEEPER_API.qualified("create_session"), &params)
            .await?;
        info!(url = %self.url(), "session created");
        Ok(self.session(created.token))
    }

    /// Attach to an existing session token.
    pub fn session(&self, token: impl Into<String>) -> Session {
        Session::new(self.client.clone(), token.into(), Arc::clone(&self.guard))
    }

    /// Release the connection and stop the service if this instance started it.
    pub async fn close(mut self) -> Result<()> {
        self.client.close().await;
        if let Some(mut process) = self.process.take() {
            process.close(self.settings.timeout()).await?;
        }
        Ok(())
    }

    /// Leave a launched service running. Returns its pid.
    pub fn detach(mut self) -> Option<u32> {
        self.process.take().and_then(|mut p| p.detach())
    }
}

fn endpoint_address(url: &Url) -> String {
    match (url.host_str(), url.port_or_known_default()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        _ => url.to_string(),
    }
}

impl std::fmt::Debug for Beekeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Beekeeper")
            .field("url", &self.url().as_str())
            .field("launched", &self.process.is_some())
            .finish()
    }
}
