use super::rules::{translate, wallet_rules};
use super::types::*;
use super::wallet::{UnlockedWallet, Wallet};
use crate::api::BEEKEEPER_API;
use crate::batch::BatchMode;
use crate::client::JsonRpcClient;
use crate::delay_guard::DelayGuard;
use crate::overseer::RuleSet;
use crate::Result;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// An authenticated session on the wallet service.
///
/// Clones share the token, the client and the unlock guard.
#[derive(Debug, Clone)]
pub struct Session {
    client: JsonRpcClient,
    token: Arc<str>,
    guard: Arc<DelayGuard>,
    rules: RuleSet,
}

impl Session {
    pub(crate) fn new(client: JsonRpcClient, token: String, guard: Arc<DelayGuard>) -> Self {
        Self {
            client,
            token: token.into(),
            guard,
            rules: wallet_rules(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn client(&self) -> &JsonRpcClient {
        &self.client
    }

    pub(crate) fn guard(&self) -> &DelayGuard {
        &self.guard
    }

    /// Call `beekeeper_api.<method>`; wallet faults are reported against `wallet`.
    pub(crate) async fn call<T, P>(&self, method: &str, params: &P, wallet: &str) -> Result<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let method = BEEKEEPER_API.qualified(method);
        self.client
            .invoke_with_rules(&method, params, &self.rules)
            .await
            .map_err(|e| translate(e, wallet))
    }

    fn token_params(&self) -> TokenParams<'_> {
        TokenParams { token: &self.token }
    }

    pub async fn get_info(&self) -> Result<SessionInfo> {
        self.call("get_info", &self.token_params(), "").await
    }

    /// Seconds of inactivity after which the service locks every wallet.
    pub async fn set_timeout(&self, seconds: u64) -> Result<()> {
        let params = SetTimeoutParams {
            token: &self.token,
            seconds,
        };
        self.call::<IgnoredAny, _>("set_timeout", &params, "").await?;
        Ok(())
    }

    /// Wallets opened in this session.
    pub async fn list_wallets(&self) -> Result<Vec<WalletDetails>> {
        let list: WalletList = self.call("list_wallets", &self.token_params(), "").await?;
        Ok(list.wallets)
    }

    /// Every wallet file known to the service.
    pub async fn list_created_wallets(&self) -> Result<Vec<WalletDetails>> {
        let list: WalletList = self
            .call("list_created_wallets", &self.token_params(), "")
            .await?;
        Ok(list.wallets)
    }

    /// Create a wallet. Without `password` the service generates one; the
    /// password in effect is returned alongside the unlocked wallet.
    pub async fn create_wallet(&self, name: &str, password: Option<&str>) -> Result<(UnlockedWallet, String)> {
        let params = CreateParams {
            token: &self.token,
            wallet_name: name,
            password,
        };
        let created: CreateResult = self.call("create", &params, name).await?;
        debug!(wallet = name, "wallet created");
        Ok((UnlockedWallet::new(self.wallet(name)), created.password))
    }

    /// Open an existing wallet file.
    pub async fn open_wallet(&self, name: &str) -> Result<Wallet> {
        let wallet = self.wallet(name);
        wallet.open().await?;
        Ok(wallet)
    }

    /// Handle to a wallet by name, without contacting the service.
    pub fn wallet(&self, name: &str) -> Wallet {
        Wallet::new(self.clone(), name.to_string())
    }

    pub async fn lock_all(&self) -> Result<()> {
        self.call::<IgnoredAny, _>("lock_all", &self.token_params(), "")
            .await?;
        Ok(())
    }

    /// Public keys of every unlocked wallet in the session.
    pub async fn public_keys(&self) -> Result<Vec<String>> {
        let params = PublicKeysParams {
            token: &self.token,
            wallet_name: None,
        };
        let keys: PublicKeys = self.call("get_public_keys", &params, "").await?;
        Ok(keys.keys.into_iter().map(|k| k.public_key).collect())
    }

    /// Sign with whichever unlocked wallet holds `public_key`.
    pub async fn sign_digest(&self, sig_digest: &str, public_key: &str) -> Result<String> {
        let params = SignDigestParams {
            token: &self.token,
            sig_digest,
            public_key,
            wallet_name: None,
        };
        let signed: SignatureResult = self.call("sign_digest", &params, "").await?;
        Ok(signed.signature)
    }

    /// Session info and opened wallets, fetched in a single batch.
    pub async fn status(&self) -> Result<SessionStatus> {
        let mut batch = self.client.batch_with(BatchMode::Eager, &self.rules);
        let token = self.token_params();
        let info = batch.call::<SessionInfo, _>(&BEEKEEPER_API.qualified("get_info"), &token)?;
        let wallets = batch.call::<WalletList, _>(&BEEKEEPER_API.qualified("list_wallets"), &token)?;
        batch.send().await.map_err(|e| translate(e, ""))?;
        Ok(SessionStatus {
            info: info.get()?,
            wallets: wallets.get()?.wallets,
        })
    }

    /// End the session on the service side.
    pub async fn close(self) -> Result<()> {
        self.call::<IgnoredAny, _>("close_session", &self.token_params(), "")
            .await?;
        debug!("session closed");
        Ok(())
    }
}
